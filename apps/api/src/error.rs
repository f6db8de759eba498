use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use ts_rs::TS;

use shellforge_core::{AppError, RateLimitDenial};

/// API error payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/error-response.ts"
)]
pub struct ErrorResponse {
    message: String,
}

/// Denial payload returned when the rate limiter blocks a request.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/rate-limit-response.ts"
)]
pub struct RateLimitResponse {
    message: String,
    category: String,
    severity: String,
    retry_after_ms: i64,
}

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::RateLimited(denial) => return denial_response(denial),
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorResponse {
            message: self.0.to_string(),
        });

        (status, payload).into_response()
    }
}

fn denial_response(denial: RateLimitDenial) -> Response {
    // The classifier decides between 429 and 403 for blocked automation.
    let status =
        StatusCode::from_u16(denial.http_status).unwrap_or(StatusCode::TOO_MANY_REQUESTS);

    let payload = Json(RateLimitResponse {
        message: denial.message,
        category: denial.category,
        severity: denial.severity.as_str().to_owned(),
        retry_after_ms: denial.retry_after_ms,
    });

    (status, payload).into_response()
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;
