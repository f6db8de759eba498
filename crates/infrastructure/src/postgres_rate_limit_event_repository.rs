//! PostgreSQL-backed repository for rate limit decision events.
//!
//! Rows in `rate_limit_events` are append-only; the listing queries never
//! mutate them. `is_still_locked` is recomputed against `now()` at read time
//! so the stored flag only reflects the moment of the decision.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use shellforge_application::RateLimitEventRepository;
use shellforge_core::{AppError, AppResult};
use shellforge_domain::RateLimitEvent;

/// PostgreSQL implementation of the rate limit event repository port.
#[derive(Clone)]
pub struct PostgresRateLimitEventRepository {
    pool: PgPool,
}

impl PostgresRateLimitEventRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    event_type: String,
    user_id: Option<String>,
    user_email: Option<String>,
    identifier: String,
    attempt_count: i32,
    window_started_at: DateTime<Utc>,
    locked_until: Option<DateTime<Utc>>,
    is_still_locked: bool,
    ip_address: Option<String>,
    user_agent: Option<String>,
    device_type: Option<String>,
    device_info: Option<String>,
    operating_system: Option<String>,
    browser: Option<String>,
    browser_version: Option<String>,
    country: Option<String>,
    city: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    session_duration_ms: Option<i64>,
    time_between_attempts_ms: Option<i64>,
    seems_automated: bool,
    automation_score: i32,
    target_resource: Option<String>,
    additional_data: Option<serde_json::Value>,
}

impl From<EventRow> for RateLimitEvent {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            event_type: row.event_type,
            user_id: row.user_id,
            user_email: row.user_email,
            identifier: row.identifier,
            attempt_count: row.attempt_count,
            window_started_at: row.window_started_at,
            locked_until: row.locked_until,
            is_still_locked: row.is_still_locked,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            device_type: row.device_type,
            device_info: row.device_info,
            operating_system: row.operating_system,
            browser: row.browser,
            browser_version: row.browser_version,
            country: row.country,
            city: row.city,
            latitude: row.latitude,
            longitude: row.longitude,
            session_duration_ms: row.session_duration_ms,
            time_between_attempts_ms: row.time_between_attempts_ms,
            seems_automated: row.seems_automated,
            automation_score: row.automation_score,
            target_resource: row.target_resource,
            additional_data: row.additional_data,
        }
    }
}

const SELECT_COLUMNS: &str = r#"
    id,
    created_at,
    event_type,
    user_id,
    user_email,
    identifier,
    attempt_count,
    window_started_at,
    locked_until,
    (locked_until IS NOT NULL AND locked_until > now()) AS is_still_locked,
    ip_address,
    user_agent,
    device_type,
    device_info,
    operating_system,
    browser,
    browser_version,
    country,
    city,
    latitude,
    longitude,
    session_duration_ms,
    time_between_attempts_ms,
    seems_automated,
    automation_score,
    target_resource,
    additional_data
"#;

#[async_trait]
impl RateLimitEventRepository for PostgresRateLimitEventRepository {
    async fn append_event(&self, event: RateLimitEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rate_limit_events (
                id,
                created_at,
                event_type,
                user_id,
                user_email,
                identifier,
                attempt_count,
                window_started_at,
                locked_until,
                ip_address,
                user_agent,
                device_type,
                device_info,
                operating_system,
                browser,
                browser_version,
                country,
                city,
                latitude,
                longitude,
                session_duration_ms,
                time_between_attempts_ms,
                seems_automated,
                automation_score,
                target_resource,
                additional_data
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26
            )
            "#,
        )
        .bind(event.id)
        .bind(event.created_at)
        .bind(event.event_type)
        .bind(event.user_id)
        .bind(event.user_email)
        .bind(event.identifier)
        .bind(event.attempt_count)
        .bind(event.window_started_at)
        .bind(event.locked_until)
        .bind(event.ip_address)
        .bind(event.user_agent)
        .bind(event.device_type)
        .bind(event.device_info)
        .bind(event.operating_system)
        .bind(event.browser)
        .bind(event.browser_version)
        .bind(event.country)
        .bind(event.city)
        .bind(event.latitude)
        .bind(event.longitude)
        .bind(event.session_duration_ms)
        .bind(event.time_between_attempts_ms)
        .bind(event.seems_automated)
        .bind(event.automation_score)
        .bind(event.target_resource)
        .bind(event.additional_data)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to append rate limit event: {error}"))
        })?;

        Ok(())
    }

    async fn list_active(&self) -> AppResult<Vec<RateLimitEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM rate_limit_events
            WHERE locked_until IS NOT NULL AND locked_until > now()
            ORDER BY created_at DESC
            "#
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list active rate limits: {error}"))
        })?;

        Ok(rows.into_iter().map(RateLimitEvent::from).collect())
    }

    async fn list_history(&self, limit: i64) -> AppResult<Vec<RateLimitEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM rate_limit_events
            ORDER BY created_at DESC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list rate limit history: {error}"))
        })?;

        Ok(rows.into_iter().map(RateLimitEvent::from).collect())
    }

    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<RateLimitEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM rate_limit_events
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list user rate limit events: {error}"))
        })?;

        Ok(rows.into_iter().map(RateLimitEvent::from).collect())
    }
}
