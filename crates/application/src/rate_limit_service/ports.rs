use async_trait::async_trait;
use chrono::{DateTime, Utc};

use shellforge_core::AppResult;
use shellforge_domain::{ActionCooldownRecord, AttemptRecord};

/// Storage port shared by the attempt ledger and the cooldown gate.
///
/// Implementations back the port with durable storage (Postgres, Redis) or
/// memory (tests, single-process dev). Within one scope key the
/// read-modify-write is assumed effectively atomic per caller; lost updates
/// under same-scope contention are an accepted tradeoff.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Loads the attempt record for a scope key, if one exists.
    async fn load_attempts(&self, key: &str) -> AppResult<Option<AttemptRecord>>;

    /// Creates or overwrites the attempt record for a scope key.
    async fn save_attempts(&self, key: &str, record: &AttemptRecord) -> AppResult<()>;

    /// Removes the attempt record for a scope key (admin reset).
    async fn delete_attempts(&self, key: &str) -> AppResult<()>;

    /// Loads the cooldown record for a resource, if one exists.
    async fn load_cooldown(&self, resource: &str) -> AppResult<Option<ActionCooldownRecord>>;

    /// Creates or overwrites the cooldown record for a resource.
    async fn save_cooldown(&self, resource: &str, record: &ActionCooldownRecord) -> AppResult<()>;

    /// Removes attempt and cooldown rows stale since before the cutoff.
    /// Returns the number of rows removed.
    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64>;
}
