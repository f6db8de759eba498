//! Rate-limiting data model: attempt windows, cooldowns, and the
//! append-only decision event log.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shellforge_core::{AppError, AppResult};
use uuid::Uuid;

/// Identity a rate limit is keyed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitScope {
    /// Keyed by authenticated user id or email.
    User,
    /// Keyed by caller IP address.
    Ip,
    /// Keyed by browser fingerprint.
    Device,
}

impl LimitScope {
    /// Returns the stable label used in keys and event rows.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ip => "ip",
            Self::Device => "device",
        }
    }
}

/// Statically validated configuration for a sliding-window attempt ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    category: String,
    scope: LimitScope,
    max_attempts: i32,
    window_minutes: i64,
    lockout_minutes: i64,
}

impl RateLimitPolicy {
    /// Creates a validated policy. All numeric parameters must be positive.
    pub fn new(
        category: impl Into<String>,
        scope: LimitScope,
        max_attempts: i32,
        window_minutes: i64,
        lockout_minutes: i64,
    ) -> AppResult<Self> {
        let category = category.into();
        if category.trim().is_empty() {
            return Err(AppError::Validation(
                "rate limit category must not be empty".to_owned(),
            ));
        }
        if max_attempts <= 0 {
            return Err(AppError::Validation(
                "max_attempts must be greater than zero".to_owned(),
            ));
        }
        if window_minutes <= 0 || lockout_minutes <= 0 {
            return Err(AppError::Validation(
                "window_minutes and lockout_minutes must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            category,
            scope,
            max_attempts,
            window_minutes,
            lockout_minutes,
        })
    }

    /// Returns the limit category (e.g. "auth").
    #[must_use]
    pub fn category(&self) -> &str {
        self.category.as_str()
    }

    /// Returns the scope this policy keys against.
    #[must_use]
    pub fn scope(&self) -> LimitScope {
        self.scope
    }

    /// Returns the maximum attempts allowed inside one window.
    #[must_use]
    pub fn max_attempts(&self) -> i32 {
        self.max_attempts
    }

    /// Returns the sliding window duration.
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::minutes(self.window_minutes)
    }

    /// Returns the lockout duration applied once the window is exhausted.
    #[must_use]
    pub fn lockout(&self) -> Duration {
        Duration::minutes(self.lockout_minutes)
    }
}

/// Statically validated configuration for a one-shot cooldown gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownPolicy {
    category: String,
    scope: LimitScope,
    cooldown_days: i64,
}

impl CooldownPolicy {
    /// Creates a validated policy. `cooldown_days` must be positive.
    pub fn new(
        category: impl Into<String>,
        scope: LimitScope,
        cooldown_days: i64,
    ) -> AppResult<Self> {
        let category = category.into();
        if category.trim().is_empty() {
            return Err(AppError::Validation(
                "cooldown category must not be empty".to_owned(),
            ));
        }
        if cooldown_days <= 0 {
            return Err(AppError::Validation(
                "cooldown_days must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            category,
            scope,
            cooldown_days,
        })
    }

    /// Returns the limit category (e.g. "like-button").
    #[must_use]
    pub fn category(&self) -> &str {
        self.category.as_str()
    }

    /// Returns the scope this policy keys against.
    #[must_use]
    pub fn scope(&self) -> LimitScope {
        self.scope
    }

    /// Returns the cooldown duration.
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::days(self.cooldown_days)
    }
}

/// Sliding-window attempt state for one rate-limited scope key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Attempts counted within the current window.
    pub attempts: i32,
    /// Timestamp of the most recent counted attempt.
    pub last_attempt_at: DateTime<Utc>,
    /// When the current window started.
    pub window_started_at: DateTime<Utc>,
    /// Set once attempts exhaust the window; denies until elapsed.
    pub locked_until: Option<DateTime<Utc>>,
    /// Recent attempt times, oldest first, used for inter-attempt timing.
    pub attempt_timestamps: Vec<DateTime<Utc>>,
}

impl AttemptRecord {
    /// Creates the record for the first attempt in a fresh window.
    #[must_use]
    pub fn first(now: DateTime<Utc>) -> Self {
        Self {
            attempts: 1,
            last_attempt_at: now,
            window_started_at: now,
            locked_until: None,
            attempt_timestamps: vec![now],
        }
    }

    /// Returns whether the window has gone stale relative to the last attempt.
    #[must_use]
    pub fn window_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now - self.last_attempt_at > window
    }

    /// Resets the window: zero attempts, cleared lock and timing history.
    pub fn restart_window(&mut self, now: DateTime<Utc>) {
        self.attempts = 0;
        self.window_started_at = now;
        self.locked_until = None;
        self.attempt_timestamps.clear();
    }

    /// Counts one attempt, keeping at most `keep` recent timestamps.
    pub fn register_attempt(&mut self, now: DateTime<Utc>, keep: usize) {
        self.attempts += 1;
        self.last_attempt_at = now;
        self.attempt_timestamps.push(now);
        if self.attempt_timestamps.len() > keep {
            let excess = self.attempt_timestamps.len() - keep;
            self.attempt_timestamps.drain(..excess);
        }
    }

    /// Milliseconds remaining on an active lock, if any.
    #[must_use]
    pub fn lock_remaining_ms(&self, now: DateTime<Utc>) -> Option<i64> {
        self.locked_until
            .filter(|until| *until > now)
            .map(|until| (until - now).num_milliseconds())
    }

    /// Mean gap between consecutive attempts in milliseconds.
    ///
    /// `None` until at least two attempts have been observed.
    #[must_use]
    pub fn mean_attempt_gap_ms(&self) -> Option<i64> {
        if self.attempt_timestamps.len() < 2 {
            return None;
        }

        let gaps: Vec<i64> = self
            .attempt_timestamps
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).num_milliseconds())
            .collect();

        let total: i64 = gaps.iter().sum();
        Some(total / gaps.len() as i64)
    }
}

/// One-shot cooldown state for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCooldownRecord {
    /// Fingerprint of the caller that last performed the action.
    pub identifier: String,
    /// When the action was last performed.
    pub last_action_at: DateTime<Utc>,
}

impl ActionCooldownRecord {
    /// Milliseconds until the cooldown elapses, or `None` once it has.
    #[must_use]
    pub fn remaining_ms(&self, now: DateTime<Utc>, cooldown: Duration) -> Option<i64> {
        let free_at = self.last_action_at + cooldown;
        (free_at > now).then(|| (free_at - now).num_milliseconds())
    }
}

/// Classification label for a recorded rate-limit decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitEventKind {
    /// Login attempt throttling.
    Login,
    /// One-shot action cooldown (likes, feedback).
    Action,
}

impl RateLimitEventKind {
    /// Returns the stable label stored in event rows.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Action => "action",
        }
    }
}

/// Append-only record of one rate-limit decision with enrichment.
///
/// Immutable once written. `automation_score` is always within `[0, 100]`
/// and `seems_automated` holds exactly when the score exceeds 70.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitEvent {
    /// Generated identity.
    pub id: Uuid,
    /// When the decision was recorded.
    pub created_at: DateTime<Utc>,
    /// Decision classification ("login" or "action").
    pub event_type: String,
    /// Authenticated user id, when known.
    pub user_id: Option<String>,
    /// Authenticated user email, when known.
    pub user_email: Option<String>,
    /// Fingerprint or scope key the decision applied to.
    pub identifier: String,
    /// Attempts counted in the window at decision time.
    pub attempt_count: i32,
    /// Window start at decision time.
    pub window_started_at: DateTime<Utc>,
    /// Lockout expiry, when the decision locked or found a locked scope.
    pub locked_until: Option<DateTime<Utc>>,
    /// Whether the lock is still active (derived at read time).
    pub is_still_locked: bool,
    /// Caller IP address, when known.
    pub ip_address: Option<String>,
    /// Raw user-agent string.
    pub user_agent: Option<String>,
    /// Parsed device category (pc, smartphone, ...).
    pub device_type: Option<String>,
    /// Parsed device summary line.
    pub device_info: Option<String>,
    /// Parsed operating system name.
    pub operating_system: Option<String>,
    /// Parsed browser name.
    pub browser: Option<String>,
    /// Parsed browser version.
    pub browser_version: Option<String>,
    /// Best-effort geo country.
    pub country: Option<String>,
    /// Best-effort geo city.
    pub city: Option<String>,
    /// Best-effort geo latitude.
    pub latitude: Option<f64>,
    /// Best-effort geo longitude.
    pub longitude: Option<f64>,
    /// How long the client session had been open, in milliseconds.
    pub session_duration_ms: Option<i64>,
    /// Mean gap between consecutive attempts, in milliseconds.
    pub time_between_attempts_ms: Option<i64>,
    /// Whether the automation score crossed the automated threshold.
    pub seems_automated: bool,
    /// Heuristic 0-100 estimate of scripted origin.
    pub automation_score: i32,
    /// Resource the throttled action targeted.
    pub target_resource: Option<String>,
    /// Free-form context captured by the caller.
    pub additional_data: Option<Value>,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{ActionCooldownRecord, AttemptRecord, CooldownPolicy, LimitScope, RateLimitPolicy};

    fn at(seconds: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).single().unwrap_or_default()
    }

    #[test]
    fn policy_rejects_non_positive_values() {
        assert!(RateLimitPolicy::new("auth", LimitScope::User, 0, 15, 15).is_err());
        assert!(RateLimitPolicy::new("auth", LimitScope::User, 5, 0, 15).is_err());
        assert!(RateLimitPolicy::new("auth", LimitScope::User, 5, 15, -1).is_err());
        assert!(RateLimitPolicy::new("  ", LimitScope::User, 5, 15, 15).is_err());
        assert!(CooldownPolicy::new("like-button", LimitScope::Device, 0).is_err());
    }

    #[test]
    fn window_expiry_compares_against_last_attempt() {
        let mut record = AttemptRecord::first(at(0));
        record.register_attempt(at(30), 6);

        let window = Duration::minutes(15);
        assert!(!record.window_expired(at(60), window));
        assert!(record.window_expired(at(30 + 15 * 60 + 1), window));
    }

    #[test]
    fn restart_clears_lock_and_timing_history() {
        let mut record = AttemptRecord::first(at(0));
        record.register_attempt(at(5), 6);
        record.locked_until = Some(at(900));

        record.restart_window(at(1000));

        assert_eq!(record.attempts, 0);
        assert_eq!(record.window_started_at, at(1000));
        assert!(record.locked_until.is_none());
        assert!(record.attempt_timestamps.is_empty());
    }

    #[test]
    fn register_attempt_caps_timestamp_history() {
        let mut record = AttemptRecord::first(at(0));
        for step in 1..10 {
            record.register_attempt(at(step), 4);
        }

        assert_eq!(record.attempts, 10);
        assert_eq!(record.attempt_timestamps.len(), 4);
        assert_eq!(record.attempt_timestamps[0], at(6));
    }

    #[test]
    fn mean_attempt_gap_averages_consecutive_differences() {
        let mut record = AttemptRecord::first(at(0));
        record.register_attempt(at(2), 6);
        record.register_attempt(at(6), 6);

        // Gaps of 2000ms and 4000ms average to 3000ms.
        assert_eq!(record.mean_attempt_gap_ms(), Some(3000));
    }

    #[test]
    fn mean_attempt_gap_requires_two_attempts() {
        let record = AttemptRecord::first(at(0));
        assert_eq!(record.mean_attempt_gap_ms(), None);
    }

    #[test]
    fn cooldown_remaining_counts_down_and_clears() {
        let record = ActionCooldownRecord {
            identifier: "fp-1".to_owned(),
            last_action_at: at(0),
        };
        let cooldown = Duration::days(1);

        assert_eq!(
            record.remaining_ms(at(60), cooldown),
            Some((86_400 - 60) * 1000)
        );
        assert_eq!(record.remaining_ms(at(86_400), cooldown), None);
    }
}
