//! Append-only event log for rate-limit decisions, with device, geo, and
//! behavioral enrichment.
//!
//! Enrichment is strictly best-effort: a failed or slow geo lookup and an
//! unparseable user-agent both degrade to `None` fields. Only the final
//! repository append can fail, and callers on the request path warn-log
//! that instead of propagating it into the verdict.

mod enrichment;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use shellforge_core::AppResult;
use shellforge_domain::{RateLimitEvent, RateLimitEventKind};

pub use enrichment::automation_score;
use enrichment::{AUTOMATED_SCORE_THRESHOLD, parse_device};

/// How long a geo lookup may hold up event recording.
const GEO_LOOKUP_TIMEOUT: Duration = Duration::from_millis(1500);

/// Best-effort location attributes for an IP address.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoLocation {
    /// Country name.
    pub country: Option<String>,
    /// City name.
    pub city: Option<String>,
    /// Latitude in degrees.
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    pub longitude: Option<f64>,
}

/// Port for reverse-geocoding an IP address.
#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// Resolves best-effort location attributes for the given IP.
    async fn locate(&self, ip_address: &str) -> AppResult<GeoLocation>;
}

/// Repository port for the rate-limit event log.
#[async_trait]
pub trait RateLimitEventRepository: Send + Sync {
    /// Appends an event. Events are immutable once written.
    async fn append_event(&self, event: RateLimitEvent) -> AppResult<()>;

    /// Returns events whose lockout is still active, newest first.
    async fn list_active(&self) -> AppResult<Vec<RateLimitEvent>>;

    /// Returns the most recent events, newest first.
    async fn list_history(&self, limit: i64) -> AppResult<Vec<RateLimitEvent>>;

    /// Returns events for one user, newest first.
    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<RateLimitEvent>>;
}

/// Un-enriched facts about one rate-limit decision.
#[derive(Debug, Clone)]
pub struct RateLimitEventInput {
    /// Decision classification.
    pub kind: RateLimitEventKind,
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
    /// Lockout expiry, when applicable.
    pub locked_until: Option<DateTime<Utc>>,
    /// Caller IP address.
    pub ip_address: Option<String>,
    /// Raw user-agent string.
    pub user_agent: Option<String>,
    /// How long the client session had been open.
    pub session_duration_ms: Option<i64>,
    /// Mean gap between consecutive attempts.
    pub time_between_attempts_ms: Option<i64>,
    /// Resource the throttled action targeted.
    pub target_resource: Option<String>,
    /// Free-form context captured by the caller.
    pub additional_data: Option<Value>,
}

/// Application service that enriches and persists rate-limit decisions.
#[derive(Clone)]
pub struct RateLimitEventRecorder {
    repository: Arc<dyn RateLimitEventRepository>,
    geo_lookup: Arc<dyn GeoLookup>,
}

impl RateLimitEventRecorder {
    /// Creates a recorder from repository and geo-lookup implementations.
    #[must_use]
    pub fn new(repository: Arc<dyn RateLimitEventRepository>, geo_lookup: Arc<dyn GeoLookup>) -> Self {
        Self {
            repository,
            geo_lookup,
        }
    }

    /// Enriches and appends one decision event.
    ///
    /// Per-scope events are appended in the order they were decided; no
    /// ordering is guaranteed across scopes.
    pub async fn record(&self, input: RateLimitEventInput) -> AppResult<()> {
        let now = Utc::now();

        let device = parse_device(input.user_agent.as_deref());
        let location = self.locate(input.ip_address.as_deref()).await;
        let score = automation_score(
            input.attempt_count,
            input.time_between_attempts_ms,
            input.session_duration_ms,
        );

        let event = RateLimitEvent {
            id: Uuid::new_v4(),
            created_at: now,
            event_type: input.kind.as_str().to_owned(),
            user_id: input.user_id,
            user_email: input.user_email,
            identifier: input.identifier,
            attempt_count: input.attempt_count,
            window_started_at: input.window_started_at,
            locked_until: input.locked_until,
            is_still_locked: input.locked_until.is_some_and(|until| until > now),
            ip_address: input.ip_address,
            user_agent: input.user_agent,
            device_type: device.device_type,
            device_info: device.device_info,
            operating_system: device.operating_system,
            browser: device.browser,
            browser_version: device.browser_version,
            country: location.country,
            city: location.city,
            latitude: location.latitude,
            longitude: location.longitude,
            session_duration_ms: input.session_duration_ms,
            time_between_attempts_ms: input.time_between_attempts_ms,
            seems_automated: score > AUTOMATED_SCORE_THRESHOLD,
            automation_score: score,
            target_resource: input.target_resource,
            additional_data: input.additional_data,
        };

        self.repository.append_event(event).await
    }

    /// Returns events whose lockout is still active.
    pub async fn list_active(&self) -> AppResult<Vec<RateLimitEvent>> {
        self.repository.list_active().await
    }

    /// Returns the most recent events.
    pub async fn list_history(&self, limit: i64) -> AppResult<Vec<RateLimitEvent>> {
        self.repository.list_history(limit).await
    }

    /// Returns events for one user.
    pub async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<RateLimitEvent>> {
        self.repository.list_for_user(user_id).await
    }

    async fn locate(&self, ip_address: Option<&str>) -> GeoLocation {
        let Some(ip_address) = ip_address else {
            return GeoLocation::default();
        };

        match tokio::time::timeout(GEO_LOOKUP_TIMEOUT, self.geo_lookup.locate(ip_address)).await {
            Ok(Ok(location)) => location,
            Ok(Err(error)) => {
                tracing::warn!(ip_address, %error, "geo lookup failed; recording event without location");
                GeoLocation::default()
            }
            Err(_) => {
                tracing::warn!(ip_address, "geo lookup timed out; recording event without location");
                GeoLocation::default()
            }
        }
    }
}
