//! Email/password authentication endpoints.

use axum::Json;
use axum::extract::{Extension, State};
use axum::http::{HeaderMap, StatusCode};
use tower_sessions::Session;
use tracing::warn;

use shellforge_application::AuthOutcome;
use shellforge_core::{AppError, UserIdentity};

use crate::dto::{GenericMessageResponse, LoginRequest, RegisterRequest, UserIdentityResponse};
use crate::error::ApiResult;
use crate::state::AppState;

use super::build_request_context;

pub const SESSION_USER_KEY: &str = "user_identity";

/// POST /auth/register - Create a new account with email+password.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<GenericMessageResponse>)> {
    state
        .user_service
        .register(shellforge_application::RegisterParams {
            email: payload.email,
            password: payload.password,
            display_name: payload.display_name,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(GenericMessageResponse {
            message: "account created; you can sign in now".to_owned(),
        }),
    ))
}

/// POST /auth/login - Authenticate with email+password.
///
/// The attempt ledger is consulted before credentials are checked, so a
/// locked account burns no verification work and leaks no credential
/// validity.
pub async fn login_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<UserIdentityResponse>> {
    let context = build_request_context(&headers, payload.client);
    let user_key = payload.email.trim().to_lowercase();

    let verdict = state
        .rate_limit_service
        .check_login_attempt(&user_key, Some(user_key.as_str()), &context)
        .await;
    if let Some(denial) = verdict.denial {
        return Err(AppError::RateLimited(denial).into());
    }

    let outcome = state
        .user_service
        .login(&payload.email, &payload.password)
        .await?;

    let user = match outcome {
        AuthOutcome::Authenticated(user) => user,
        AuthOutcome::Failed => {
            return Err(AppError::Unauthorized("invalid email or password".to_owned()).into());
        }
    };

    // A successful login clears the attempt window so legitimate users
    // cannot lock themselves out by signing in repeatedly.
    if let Err(error) = state.rate_limit_service.reset_login_attempts(&user_key).await {
        warn!(%error, "failed to reset login attempts after successful login");
    }

    let identity = UserIdentity::new(
        user.id.to_string(),
        user.display_name.clone(),
        Some(user.email.as_str().to_owned()),
        user.is_admin,
    );

    // Fresh session id on privilege change.
    session
        .cycle_id()
        .await
        .map_err(|error| AppError::Internal(format!("failed to cycle session id: {error}")))?;
    session
        .insert(SESSION_USER_KEY, identity.clone())
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist session: {error}")))?;

    Ok(Json(UserIdentityResponse::from(identity)))
}

/// POST /auth/logout - Terminate the current session.
pub async fn logout_handler(session: Session) -> ApiResult<StatusCode> {
    session
        .delete()
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete session: {error}")))?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me - Return the authenticated user.
pub async fn me_handler(
    Extension(identity): Extension<UserIdentity>,
) -> Json<UserIdentityResponse> {
    Json(UserIdentityResponse::from(identity))
}
