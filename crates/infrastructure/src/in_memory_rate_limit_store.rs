//! In-memory rate limit store for development without external services.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use shellforge_application::RateLimitStore;
use shellforge_core::AppResult;
use shellforge_domain::{ActionCooldownRecord, AttemptRecord};

/// In-memory rate limit store implementation.
///
/// State is process-local and lost on restart; use the Postgres or Redis
/// backend anywhere that matters.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    attempts: RwLock<HashMap<String, AttemptRecord>>,
    cooldowns: RwLock<HashMap<String, ActionCooldownRecord>>,
}

impl InMemoryRateLimitStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn load_attempts(&self, key: &str) -> AppResult<Option<AttemptRecord>> {
        Ok(self.attempts.read().await.get(key).cloned())
    }

    async fn save_attempts(&self, key: &str, record: &AttemptRecord) -> AppResult<()> {
        self.attempts
            .write()
            .await
            .insert(key.to_owned(), record.clone());
        Ok(())
    }

    async fn delete_attempts(&self, key: &str) -> AppResult<()> {
        self.attempts.write().await.remove(key);
        Ok(())
    }

    async fn load_cooldown(&self, resource: &str) -> AppResult<Option<ActionCooldownRecord>> {
        Ok(self.cooldowns.read().await.get(resource).cloned())
    }

    async fn save_cooldown(&self, resource: &str, record: &ActionCooldownRecord) -> AppResult<()> {
        self.cooldowns
            .write()
            .await
            .insert(resource.to_owned(), record.clone());
        Ok(())
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut removed = 0_u64;

        {
            let mut attempts = self.attempts.write().await;
            let stale: Vec<String> = attempts
                .iter()
                .filter(|(_, record)| {
                    record.last_attempt_at < before
                        && record.locked_until.is_none_or(|until| until < before)
                })
                .map(|(key, _)| key.clone())
                .collect();
            removed += stale.len() as u64;
            for key in stale {
                attempts.remove(&key);
            }
        }

        {
            let mut cooldowns = self.cooldowns.write().await;
            let stale: Vec<String> = cooldowns
                .iter()
                .filter(|(_, record)| record.last_action_at < before)
                .map(|(resource, _)| resource.clone())
                .collect();
            removed += stale.len() as u64;
            for resource in stale {
                cooldowns.remove(&resource);
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use shellforge_application::RateLimitStore;
    use shellforge_core::AppResult;
    use shellforge_domain::{ActionCooldownRecord, AttemptRecord};

    use super::InMemoryRateLimitStore;

    #[tokio::test]
    async fn round_trips_and_deletes_attempt_records() -> AppResult<()> {
        let store = InMemoryRateLimitStore::new();
        let record = AttemptRecord::first(Utc::now());

        store.save_attempts("auth:alice", &record).await?;
        assert_eq!(store.load_attempts("auth:alice").await?, Some(record));
        assert_eq!(store.load_attempts("auth:bob").await?, None);

        store.delete_attempts("auth:alice").await?;
        assert_eq!(store.load_attempts("auth:alice").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn cleanup_removes_only_stale_rows() -> AppResult<()> {
        let store = InMemoryRateLimitStore::new();
        let now = Utc::now();

        store
            .save_attempts("auth:old", &AttemptRecord::first(now - Duration::days(2)))
            .await?;
        store
            .save_attempts("auth:fresh", &AttemptRecord::first(now))
            .await?;

        // Stale attempt time but an active lock keeps the row.
        let mut locked = AttemptRecord::first(now - Duration::days(2));
        locked.locked_until = Some(now + Duration::minutes(10));
        store.save_attempts("auth:locked", &locked).await?;

        store
            .save_cooldown(
                "like:snippet-1",
                &ActionCooldownRecord {
                    identifier: "fp-1".to_owned(),
                    last_action_at: now - Duration::days(2),
                },
            )
            .await?;

        let removed = store.cleanup_expired(now - Duration::days(1)).await?;

        assert_eq!(removed, 2);
        assert_eq!(store.load_attempts("auth:old").await?, None);
        assert!(store.load_attempts("auth:fresh").await?.is_some());
        assert!(store.load_attempts("auth:locked").await?.is_some());
        assert_eq!(store.load_cooldown("like:snippet-1").await?, None);
        Ok(())
    }
}
