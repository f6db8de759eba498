//! Request/response payloads shared with the TypeScript frontend.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use shellforge_core::UserIdentity;
use shellforge_domain::RateLimitEvent;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

/// Generic message response for auth flows.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/generic-message-response.ts"
)]
pub struct GenericMessageResponse {
    pub message: String,
}

/// Signals the browser self-reports alongside a request.
///
/// Advisory only: a scripted client can fabricate all of this, which is why
/// the heuristics treat them as one weighted input among several.
#[derive(Debug, Default, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/client-signals.ts"
)]
pub struct ClientSignals {
    pub screen_resolution: Option<String>,
    pub time_zone: Option<String>,
    #[serde(default)]
    pub webdriver: bool,
    pub plugins_count: Option<u32>,
    pub languages_count: Option<u32>,
    pub hardware_concurrency: Option<u32>,
    #[serde(default)]
    pub automation_globals: Vec<String>,
    pub session_duration_ms: Option<i64>,
}

/// POST /auth/register body.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/register-request.ts"
)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

/// POST /auth/login body.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/login-request.ts"
)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub client: Option<ClientSignals>,
}

/// POST /snippets/{id}/like body.
#[derive(Debug, Default, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/like-request.ts"
)]
pub struct LikeRequest {
    #[serde(default)]
    pub client: Option<ClientSignals>,
}

/// API representation of the authenticated user.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/user-identity-response.ts"
)]
pub struct UserIdentityResponse {
    pub subject: String,
    pub display_name: String,
    pub email: Option<String>,
    pub is_admin: bool,
}

impl From<UserIdentity> for UserIdentityResponse {
    fn from(identity: UserIdentity) -> Self {
        Self {
            subject: identity.subject().to_owned(),
            display_name: identity.display_name().to_owned(),
            email: identity.email().map(ToOwned::to_owned),
            is_admin: identity.is_admin(),
        }
    }
}

/// One rate-limit decision event as surfaced to the admin dashboard.
///
/// Timestamps are RFC 3339 strings so the generated TypeScript type stays
/// plain.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/rate-limit-event-response.ts"
)]
pub struct RateLimitEventResponse {
    pub id: String,
    pub created_at: String,
    pub event_type: String,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub identifier: String,
    pub attempt_count: i32,
    pub window_started_at: String,
    pub locked_until: Option<String>,
    pub is_still_locked: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_type: Option<String>,
    pub device_info: Option<String>,
    pub operating_system: Option<String>,
    pub browser: Option<String>,
    pub browser_version: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub session_duration_ms: Option<i64>,
    pub time_between_attempts_ms: Option<i64>,
    pub seems_automated: bool,
    pub automation_score: i32,
    pub target_resource: Option<String>,
    #[ts(type = "unknown | null")]
    pub additional_data: Option<serde_json::Value>,
}

impl From<RateLimitEvent> for RateLimitEventResponse {
    fn from(event: RateLimitEvent) -> Self {
        Self {
            id: event.id.to_string(),
            created_at: event.created_at.to_rfc3339(),
            event_type: event.event_type,
            user_id: event.user_id,
            user_email: event.user_email,
            identifier: event.identifier,
            attempt_count: event.attempt_count,
            window_started_at: event.window_started_at.to_rfc3339(),
            locked_until: event.locked_until.map(|value| value.to_rfc3339()),
            is_still_locked: event.is_still_locked,
            ip_address: event.ip_address,
            user_agent: event.user_agent,
            device_type: event.device_type,
            device_info: event.device_info,
            operating_system: event.operating_system,
            browser: event.browser,
            browser_version: event.browser_version,
            country: event.country,
            city: event.city,
            latitude: event.latitude,
            longitude: event.longitude,
            session_duration_ms: event.session_duration_ms,
            time_between_attempts_ms: event.time_between_attempts_ms,
            seems_automated: event.seems_automated,
            automation_score: event.automation_score,
            target_resource: event.target_resource,
            additional_data: event.additional_data,
        }
    }
}
