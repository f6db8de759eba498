//! Shared primitives for all Rust crates in Shellforge.

#![forbid(unsafe_code)]

/// Authentication primitives shared across services.
pub mod auth;
/// Rate-limit denial payloads surfaced through [`AppError::RateLimited`].
pub mod rate_limit;

use thiserror::Error;

pub use auth::UserIdentity;
pub use rate_limit::{RateLimitDenial, Severity};

/// Result type used across Shellforge crates.
pub type AppResult<T> = Result<T, AppError>;

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// User is not authenticated or not allowed to access a resource.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but blocked by authorization policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Request was denied by the rate-limiting subsystem.
    #[error("rate limited: {}", .0.message)]
    RateLimited(RateLimitDenial),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::{AppError, RateLimitDenial, Severity};

    #[test]
    fn rate_limited_error_displays_denial_message() {
        let denial = RateLimitDenial {
            message: "too many login attempts".to_owned(),
            category: "auth".to_owned(),
            http_status: 429,
            severity: Severity::High,
            retry_after_ms: 60_000,
            seems_automated: false,
        };

        let error = AppError::RateLimited(denial);
        assert_eq!(error.to_string(), "rate limited: too many login attempts");
    }
}
