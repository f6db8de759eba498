//! Snippet like endpoint, throttled by the fingerprint cooldown gate.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use tower_sessions::Session;

use shellforge_core::{AppError, UserIdentity};

use crate::dto::{GenericMessageResponse, LikeRequest};
use crate::error::ApiResult;
use crate::state::AppState;

use super::auth::SESSION_USER_KEY;
use super::build_request_context;

/// POST /snippets/{snippet_id}/like - Register one like per caller per
/// cooldown. Works for anonymous callers too; the gate keys on the browser
/// fingerprint, not the session.
pub async fn like_snippet_handler(
    State(state): State<AppState>,
    Path(snippet_id): Path<String>,
    headers: HeaderMap,
    session: Session,
    payload: Option<Json<LikeRequest>>,
) -> ApiResult<Json<GenericMessageResponse>> {
    let payload = payload.map(|Json(body)| body).unwrap_or_default();
    let context = build_request_context(&headers, payload.client);

    let identity = session
        .get::<UserIdentity>(SESSION_USER_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session identity: {error}")))?;
    let user_id = identity.as_ref().map(|identity| identity.subject().to_owned());
    let user_email = identity
        .as_ref()
        .and_then(|identity| identity.email().map(ToOwned::to_owned));

    let resource = format!("snippet:{snippet_id}");
    let verdict = state
        .rate_limit_service
        .check_action_limit(
            &resource,
            user_id.as_deref(),
            user_email.as_deref(),
            &context,
        )
        .await;
    if let Some(denial) = verdict.denial {
        return Err(AppError::RateLimited(denial).into());
    }

    Ok(Json(GenericMessageResponse {
        message: "like recorded".to_owned(),
    }))
}
