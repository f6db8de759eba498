//! Shellforge API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration as CookieDuration;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;
use tracing::info;

use shellforge_application::{
    AttemptLedger, CooldownGate, GeoLocation, GeoLookup, RateLimitEventRecorder, RateLimitService,
    RateLimitStore, UserService,
};
use shellforge_core::{AppError, AppResult};
use shellforge_domain::{CooldownPolicy, LimitScope, RateLimitPolicy};
use shellforge_infrastructure::{
    Argon2PasswordHasher, HttpGeoLookup, PostgresRateLimitEventRepository, PostgresRateLimitStore,
    PostgresUserRepository, RedisRateLimitStore,
};

use crate::api_config::{ApiConfig, init_tracing};
use crate::state::AppState;

/// Login attempts allowed per window.
const LOGIN_MAX_ATTEMPTS: i32 = 5;
/// Login attempt window, in minutes.
const LOGIN_WINDOW_MINUTES: i64 = 15;
/// Lockout once the window is exhausted, in minutes.
const LOGIN_LOCKOUT_MINUTES: i64 = 15;
/// Days a fingerprint must wait between likes on one snippet.
const LIKE_COOLDOWN_DAYS: i64 = 1;

// Redis TTLs comfortably outlive the longest window/lockout and cooldown.
const REDIS_ATTEMPT_TTL_SECONDS: u64 = 60 * 60;
const REDIS_COOLDOWN_TTL_SECONDS: u64 = 60 * 60 * 24 * 2;

/// Geo lookup used when no endpoint is configured.
struct DisabledGeoLookup;

#[async_trait]
impl GeoLookup for DisabledGeoLookup {
    async fn locate(&self, _ip_address: &str) -> AppResult<GeoLocation> {
        Ok(GeoLocation::default())
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let session_store = PostgresStore::new(pool.clone())
        .with_table_name("tower_sessions")
        .map_err(|error| {
            AppError::Validation(format!("invalid session table name configuration: {error}"))
        })?;
    session_store.migrate().await.map_err(|error| {
        AppError::Internal(format!("failed to initialize session store: {error}"))
    })?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_same_site(SameSite::Lax)
        .with_secure(config.cookie_secure)
        .with_expiry(Expiry::OnInactivity(CookieDuration::days(7)));

    let rate_limit_store: Arc<dyn RateLimitStore> = match &config.redis_url {
        Some(redis_url) => {
            let client = redis::Client::open(redis_url.as_str()).map_err(|error| {
                AppError::Internal(format!("invalid REDIS_URL: {error}"))
            })?;
            info!("rate limit state backed by redis");
            Arc::new(RedisRateLimitStore::new(
                client,
                "shellforge:rate-limit",
                REDIS_ATTEMPT_TTL_SECONDS,
                REDIS_COOLDOWN_TTL_SECONDS,
            ))
        }
        None => {
            info!("rate limit state backed by postgres");
            Arc::new(PostgresRateLimitStore::new(pool.clone()))
        }
    };

    let geo_lookup: Arc<dyn GeoLookup> = match &config.geo_api_url {
        Some(geo_api_url) => {
            let http_client = reqwest::Client::builder()
                .timeout(Duration::from_secs(2))
                .build()
                .map_err(|error| {
                    AppError::Internal(format!("failed to build HTTP client: {error}"))
                })?;
            Arc::new(HttpGeoLookup::new(http_client, geo_api_url.clone()))
        }
        None => Arc::new(DisabledGeoLookup),
    };

    let login_policy = RateLimitPolicy::new(
        "auth",
        LimitScope::User,
        LOGIN_MAX_ATTEMPTS,
        LOGIN_WINDOW_MINUTES,
        LOGIN_LOCKOUT_MINUTES,
    )?;
    let like_policy = CooldownPolicy::new("like-button", LimitScope::Device, LIKE_COOLDOWN_DAYS)?;

    let event_repository = Arc::new(PostgresRateLimitEventRepository::new(pool.clone()));
    let recorder = RateLimitEventRecorder::new(event_repository, geo_lookup);
    let rate_limit_service = RateLimitService::new(
        AttemptLedger::new(login_policy, rate_limit_store.clone()),
        CooldownGate::new(like_policy, rate_limit_store),
        recorder,
    );

    let user_service = UserService::new(
        Arc::new(PostgresUserRepository::new(pool.clone())),
        Arc::new(Argon2PasswordHasher::new()),
    );

    let app_state = AppState {
        user_service,
        rate_limit_service,
        pool,
        frontend_url: config.frontend_url.clone(),
    };

    let router = api_router::build_router(app_state, &config.frontend_url, session_layer)?;

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind {address}: {error}")))?;

    info!(%address, "shellforge-api listening");

    axum::serve(listener, router)
        .await
        .map_err(|error| AppError::Internal(format!("server error: {error}")))?;

    Ok(())
}
