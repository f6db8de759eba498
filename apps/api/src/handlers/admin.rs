//! Admin endpoints over the rate-limit event log.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::dto::RateLimitEventResponse;
use crate::error::ApiResult;
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 100;
const MAX_HISTORY_LIMIT: i64 = 1000;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

/// GET /api/admin/rate-limits/active - Events whose lockout is still live.
pub async fn active_rate_limits_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<RateLimitEventResponse>>> {
    let events = state.rate_limit_service.active_rate_limits().await?;
    Ok(Json(
        events.into_iter().map(RateLimitEventResponse::from).collect(),
    ))
}

/// GET /api/admin/rate-limits/history - Most recent decision events.
pub async fn rate_limit_history_handler(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<RateLimitEventResponse>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let events = state.rate_limit_service.rate_limit_history(limit).await?;
    Ok(Json(
        events.into_iter().map(RateLimitEventResponse::from).collect(),
    ))
}

/// GET /api/admin/rate-limits/users/{user_id} - Events for one user.
pub async fn rate_limits_for_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<RateLimitEventResponse>>> {
    let events = state
        .rate_limit_service
        .rate_limits_for_user(&user_id)
        .await?;
    Ok(Json(
        events.into_iter().map(RateLimitEventResponse::from).collect(),
    ))
}

/// POST /api/admin/rate-limits/users/{user_id}/reset - Clear a user's login
/// attempt window and lockout.
pub async fn reset_rate_limit_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .rate_limit_service
        .reset_login_attempts(&user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
