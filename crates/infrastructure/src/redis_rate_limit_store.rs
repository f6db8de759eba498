//! Redis-backed rate limit store.
//!
//! Records are stored as JSON values under prefixed keys. Expiry is handled
//! with per-key TTLs set at write time, so `cleanup_expired` has nothing to
//! do for this backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::Serialize;
use serde::de::DeserializeOwned;

use shellforge_application::RateLimitStore;
use shellforge_core::{AppError, AppResult};
use shellforge_domain::{ActionCooldownRecord, AttemptRecord};

/// Redis implementation of the rate limit store port.
#[derive(Clone)]
pub struct RedisRateLimitStore {
    client: redis::Client,
    key_prefix: String,
    attempt_ttl_seconds: u64,
    cooldown_ttl_seconds: u64,
}

impl RedisRateLimitStore {
    /// Creates a store with a configured client, key prefix, and TTLs.
    ///
    /// TTLs should cover the longest window-plus-lockout and cooldown the
    /// composed policies can produce; an early expiry only means a caller
    /// is treated as fresh sooner than the policy intended.
    #[must_use]
    pub fn new(
        client: redis::Client,
        key_prefix: impl Into<String>,
        attempt_ttl_seconds: u64,
        cooldown_ttl_seconds: u64,
    ) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
            attempt_ttl_seconds,
            cooldown_ttl_seconds,
        }
    }

    fn attempt_key(&self, key: &str) -> String {
        format!("{}:attempts:{key}", self.key_prefix)
    }

    fn cooldown_key(&self, resource: &str) -> String {
        format!("{}:cooldown:{resource}", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }

    async fn load_json<T: DeserializeOwned>(&self, redis_key: &str) -> AppResult<Option<T>> {
        let mut connection = self.connection().await?;
        let payload: Option<String> = connection
            .get(redis_key)
            .await
            .map_err(|error| AppError::Internal(format!("failed to read redis key: {error}")))?;

        payload
            .map(|payload| {
                serde_json::from_str(&payload).map_err(|error| {
                    AppError::Internal(format!("failed to decode redis record: {error}"))
                })
            })
            .transpose()
    }

    async fn save_json<T: Serialize>(
        &self,
        redis_key: &str,
        record: &T,
        ttl_seconds: u64,
    ) -> AppResult<()> {
        let payload = serde_json::to_string(record).map_err(|error| {
            AppError::Internal(format!("failed to encode redis record: {error}"))
        })?;

        let mut connection = self.connection().await?;
        let _: () = connection
            .set_ex(redis_key, payload, ttl_seconds)
            .await
            .map_err(|error| AppError::Internal(format!("failed to write redis key: {error}")))?;

        Ok(())
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn load_attempts(&self, key: &str) -> AppResult<Option<AttemptRecord>> {
        self.load_json(&self.attempt_key(key)).await
    }

    async fn save_attempts(&self, key: &str, record: &AttemptRecord) -> AppResult<()> {
        self.save_json(&self.attempt_key(key), record, self.attempt_ttl_seconds)
            .await
    }

    async fn delete_attempts(&self, key: &str) -> AppResult<()> {
        let mut connection = self.connection().await?;
        let _: () = connection
            .del(self.attempt_key(key))
            .await
            .map_err(|error| AppError::Internal(format!("failed to delete redis key: {error}")))?;

        Ok(())
    }

    async fn load_cooldown(&self, resource: &str) -> AppResult<Option<ActionCooldownRecord>> {
        self.load_json(&self.cooldown_key(resource)).await
    }

    async fn save_cooldown(&self, resource: &str, record: &ActionCooldownRecord) -> AppResult<()> {
        self.save_json(
            &self.cooldown_key(resource),
            record,
            self.cooldown_ttl_seconds,
        )
        .await
    }

    async fn cleanup_expired(&self, _before: DateTime<Utc>) -> AppResult<u64> {
        // Keys expire via TTL.
        Ok(0)
    }
}
