use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use shellforge_core::AppResult;
use shellforge_domain::{AttemptRecord, RateLimitPolicy};

use super::ports::RateLimitStore;

/// Outcome of one attempt-ledger check, with the window snapshot the
/// decision was made from (used for event recording on deny).
#[derive(Debug, Clone)]
pub struct LedgerDecision {
    /// Whether the attempt may proceed.
    pub allowed: bool,
    /// Milliseconds until the caller may retry; zero when allowed.
    pub wait_time_ms: i64,
    /// Attempts counted in the window at decision time.
    pub attempt_count: i32,
    /// Window start at decision time.
    pub window_started_at: DateTime<Utc>,
    /// Lockout expiry, when the scope is or just became locked.
    pub locked_until: Option<DateTime<Utc>>,
    /// Mean gap between consecutive attempts, when known.
    pub time_between_attempts_ms: Option<i64>,
}

/// Sliding-window attempt counter with lockout.
///
/// A scope is OPEN while attempts stay under the policy maximum and LOCKED
/// from the check that exhausts the window until `locked_until` elapses.
/// Checks while locked never increment the counter. An expired lock reopens
/// with a fresh window, so the first post-lockout attempt counts as one.
#[derive(Clone)]
pub struct AttemptLedger {
    policy: RateLimitPolicy,
    store: Arc<dyn RateLimitStore>,
}

impl AttemptLedger {
    /// Creates a ledger for one policy over the given store.
    #[must_use]
    pub fn new(policy: RateLimitPolicy, store: Arc<dyn RateLimitStore>) -> Self {
        Self { policy, store }
    }

    /// Returns the policy this ledger enforces.
    #[must_use]
    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Checks and counts one attempt for the scope key.
    pub async fn check(&self, scope_key: &str) -> LedgerDecision {
        self.check_at(scope_key, Utc::now()).await
    }

    /// Forces the scope back to OPEN with zero attempts. Privileged callers
    /// only; the API wires this behind the admin guard.
    pub async fn reset(&self, scope_key: &str) -> AppResult<()> {
        self.store.delete_attempts(scope_key).await
    }

    pub(super) async fn check_at(&self, scope_key: &str, now: DateTime<Utc>) -> LedgerDecision {
        let loaded = match self.store.load_attempts(scope_key).await {
            Ok(record) => record,
            Err(error) => {
                // Fail open: an unreadable store must not lock users out.
                warn!(scope_key, %error, "attempt store read failed; treating as first attempt");
                None
            }
        };

        let Some(mut record) = loaded else {
            let record = AttemptRecord::first(now);
            self.persist(scope_key, &record).await;
            return Self::allow(&record);
        };

        if let Some(wait_time_ms) = record.lock_remaining_ms(now) {
            return Self::deny(&record, wait_time_ms);
        }

        if record.locked_until.is_some() || record.window_expired(now, self.policy.window()) {
            record.restart_window(now);
        }

        if record.attempts >= self.policy.max_attempts() {
            let lockout = self.policy.lockout();
            record.locked_until = Some(now + lockout);
            self.persist(scope_key, &record).await;
            return Self::deny(&record, lockout.num_milliseconds());
        }

        record.register_attempt(now, self.timestamp_history_cap());
        self.persist(scope_key, &record).await;
        Self::allow(&record)
    }

    fn timestamp_history_cap(&self) -> usize {
        usize::try_from(self.policy.max_attempts()).unwrap_or(1) + 1
    }

    fn allow(record: &AttemptRecord) -> LedgerDecision {
        LedgerDecision {
            allowed: true,
            wait_time_ms: 0,
            attempt_count: record.attempts,
            window_started_at: record.window_started_at,
            locked_until: None,
            time_between_attempts_ms: record.mean_attempt_gap_ms(),
        }
    }

    fn deny(record: &AttemptRecord, wait_time_ms: i64) -> LedgerDecision {
        LedgerDecision {
            allowed: false,
            wait_time_ms,
            attempt_count: record.attempts,
            window_started_at: record.window_started_at,
            locked_until: record.locked_until,
            time_between_attempts_ms: record.mean_attempt_gap_ms(),
        }
    }

    async fn persist(&self, scope_key: &str, record: &AttemptRecord) {
        // A failed write never overturns the verdict already computed.
        if let Err(error) = self.store.save_attempts(scope_key, record).await {
            warn!(scope_key, %error, "attempt store write failed; verdict stands");
        }
    }
}
