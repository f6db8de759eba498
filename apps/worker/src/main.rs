//! Shellforge cleanup worker.
//!
//! Periodically deletes rate-limit attempt and cooldown rows that have been
//! stale longer than the retention window. Only the Postgres backend needs
//! this; Redis-backed deployments expire keys via TTL and can skip the
//! worker entirely.

#![forbid(unsafe_code)]

use std::env;
use std::time::Duration;

use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use shellforge_application::RateLimitStore;
use shellforge_core::AppError;
use shellforge_infrastructure::PostgresRateLimitStore;

#[derive(Debug, Clone)]
struct WorkerConfig {
    database_url: String,
    /// Hours a stale row survives before cleanup.
    retention_hours: i64,
    /// Minutes between cleanup passes.
    interval_minutes: u64,
}

impl WorkerConfig {
    fn load() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| AppError::Validation("DATABASE_URL must be set".to_owned()))?;

        let retention_hours = env::var("RATE_LIMIT_RETENTION_HOURS")
            .ok()
            .and_then(|value| value.parse::<i64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(72);

        let interval_minutes = env::var("CLEANUP_INTERVAL_MINUTES")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(60);

        Ok(Self {
            database_url,
            retention_hours,
            interval_minutes,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    let store = PostgresRateLimitStore::new(pool);

    info!(
        retention_hours = config.retention_hours,
        interval_minutes = config.interval_minutes,
        "shellforge-worker started"
    );

    loop {
        let cutoff = Utc::now() - chrono::Duration::hours(config.retention_hours);

        match store.cleanup_expired(cutoff).await {
            Ok(removed) if removed > 0 => {
                info!(removed, %cutoff, "removed expired rate limit rows");
            }
            Ok(_) => {}
            Err(error) => {
                warn!(%error, "rate limit cleanup pass failed");
            }
        }

        tokio::time::sleep(Duration::from_secs(config.interval_minutes * 60)).await;
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
