use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use shellforge_domain::{ActionCooldownRecord, CooldownPolicy};

use super::ports::RateLimitStore;

/// Outcome of one cooldown-gate check.
#[derive(Debug, Clone)]
pub struct GateDecision {
    /// Whether the action may proceed.
    pub allowed: bool,
    /// Milliseconds until the cooldown elapses; zero when allowed.
    pub wait_time_ms: i64,
    /// When the identifier last performed the action, if a record existed.
    pub previous_action_at: Option<DateTime<Utc>>,
}

/// One-shot-per-cooldown gate keyed by resource and caller fingerprint.
///
/// A fingerprint that differs from the stored one is treated as a fresh
/// caller and overwrites the record. That makes the gate spoofable by
/// anyone who can vary their signals; the behavior is kept as documented
/// rather than silently hardened.
#[derive(Clone)]
pub struct CooldownGate {
    policy: CooldownPolicy,
    store: Arc<dyn RateLimitStore>,
}

impl CooldownGate {
    /// Creates a gate for one policy over the given store.
    #[must_use]
    pub fn new(policy: CooldownPolicy, store: Arc<dyn RateLimitStore>) -> Self {
        Self { policy, store }
    }

    /// Returns the policy this gate enforces.
    #[must_use]
    pub fn policy(&self) -> &CooldownPolicy {
        &self.policy
    }

    /// Checks whether `identifier` may perform the action on `resource`.
    pub async fn check(&self, resource: &str, identifier: &str) -> GateDecision {
        self.check_at(resource, identifier, Utc::now()).await
    }

    pub(super) async fn check_at(
        &self,
        resource: &str,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> GateDecision {
        let loaded = match self.store.load_cooldown(resource).await {
            Ok(record) => record,
            Err(error) => {
                warn!(resource, %error, "cooldown store read failed; treating as fresh resource");
                None
            }
        };

        let Some(record) = loaded else {
            self.persist(resource, identifier, now).await;
            return Self::allow(None);
        };

        if record.identifier != identifier {
            // Fresh caller as far as the fingerprint can tell.
            self.persist(resource, identifier, now).await;
            return Self::allow(Some(record.last_action_at));
        }

        if let Some(wait_time_ms) = record.remaining_ms(now, self.policy.cooldown()) {
            return GateDecision {
                allowed: false,
                wait_time_ms,
                previous_action_at: Some(record.last_action_at),
            };
        }

        self.persist(resource, identifier, now).await;
        Self::allow(Some(record.last_action_at))
    }

    fn allow(previous_action_at: Option<DateTime<Utc>>) -> GateDecision {
        GateDecision {
            allowed: true,
            wait_time_ms: 0,
            previous_action_at,
        }
    }

    async fn persist(&self, resource: &str, identifier: &str, now: DateTime<Utc>) {
        let record = ActionCooldownRecord {
            identifier: identifier.to_owned(),
            last_action_at: now,
        };

        if let Err(error) = self.store.save_cooldown(resource, &record).await {
            warn!(resource, %error, "cooldown store write failed; verdict stands");
        }
    }
}
