//! PostgreSQL-backed rate limit store over the `rate_limit_attempts` and
//! `action_cooldowns` tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use shellforge_application::RateLimitStore;
use shellforge_core::{AppError, AppResult};
use shellforge_domain::{ActionCooldownRecord, AttemptRecord};

/// PostgreSQL implementation of the rate limit store port.
#[derive(Clone)]
pub struct PostgresRateLimitStore {
    pool: PgPool,
}

impl PostgresRateLimitStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AttemptRow {
    attempts: i32,
    last_attempt_at: DateTime<Utc>,
    window_started_at: DateTime<Utc>,
    locked_until: Option<DateTime<Utc>>,
    attempt_timestamps: Vec<DateTime<Utc>>,
}

impl From<AttemptRow> for AttemptRecord {
    fn from(row: AttemptRow) -> Self {
        Self {
            attempts: row.attempts,
            last_attempt_at: row.last_attempt_at,
            window_started_at: row.window_started_at,
            locked_until: row.locked_until,
            attempt_timestamps: row.attempt_timestamps,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CooldownRow {
    identifier: String,
    last_action_at: DateTime<Utc>,
}

impl From<CooldownRow> for ActionCooldownRecord {
    fn from(row: CooldownRow) -> Self {
        Self {
            identifier: row.identifier,
            last_action_at: row.last_action_at,
        }
    }
}

#[async_trait]
impl RateLimitStore for PostgresRateLimitStore {
    async fn load_attempts(&self, key: &str) -> AppResult<Option<AttemptRecord>> {
        let row = sqlx::query_as::<_, AttemptRow>(
            r#"
            SELECT attempts, last_attempt_at, window_started_at, locked_until, attempt_timestamps
            FROM rate_limit_attempts
            WHERE scope_key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load attempt record: {error}")))?;

        Ok(row.map(AttemptRecord::from))
    }

    async fn save_attempts(&self, key: &str, record: &AttemptRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rate_limit_attempts (
                scope_key,
                attempts,
                last_attempt_at,
                window_started_at,
                locked_until,
                attempt_timestamps
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (scope_key) DO UPDATE
            SET
                attempts = EXCLUDED.attempts,
                last_attempt_at = EXCLUDED.last_attempt_at,
                window_started_at = EXCLUDED.window_started_at,
                locked_until = EXCLUDED.locked_until,
                attempt_timestamps = EXCLUDED.attempt_timestamps
            "#,
        )
        .bind(key)
        .bind(record.attempts)
        .bind(record.last_attempt_at)
        .bind(record.window_started_at)
        .bind(record.locked_until)
        .bind(&record.attempt_timestamps)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to save attempt record: {error}")))?;

        Ok(())
    }

    async fn delete_attempts(&self, key: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM rate_limit_attempts WHERE scope_key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to delete attempt record: {error}"))
            })?;

        Ok(())
    }

    async fn load_cooldown(&self, resource: &str) -> AppResult<Option<ActionCooldownRecord>> {
        let row = sqlx::query_as::<_, CooldownRow>(
            r#"
            SELECT identifier, last_action_at
            FROM action_cooldowns
            WHERE resource = $1
            "#,
        )
        .bind(resource)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load cooldown record: {error}")))?;

        Ok(row.map(ActionCooldownRecord::from))
    }

    async fn save_cooldown(&self, resource: &str, record: &ActionCooldownRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO action_cooldowns (resource, identifier, last_action_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (resource) DO UPDATE
            SET
                identifier = EXCLUDED.identifier,
                last_action_at = EXCLUDED.last_action_at
            "#,
        )
        .bind(resource)
        .bind(&record.identifier)
        .bind(record.last_action_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to save cooldown record: {error}")))?;

        Ok(())
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let attempts = sqlx::query(
            r#"
            DELETE FROM rate_limit_attempts
            WHERE last_attempt_at < $1
              AND (locked_until IS NULL OR locked_until < $1)
            "#,
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to cleanup expired attempts: {error}"))
        })?;

        let cooldowns = sqlx::query("DELETE FROM action_cooldowns WHERE last_action_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to cleanup expired cooldowns: {error}"))
            })?;

        Ok(attempts.rows_affected() + cooldowns.rows_affected())
    }
}
