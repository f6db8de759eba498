use serde::{Deserialize, Serialize};

/// How serious a classified rate-limit denial is for alerting purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Throttled but routine (feedback, likes, generic endpoints).
    Medium,
    /// Credential-guessing or automated access on auth surfaces.
    High,
}

impl Severity {
    /// Returns the stable lowercase label used in payloads and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// User-facing outcome of a denied rate-limit check.
///
/// Produced by the error classifier and carried inside
/// `AppError::RateLimited` so API routes can translate it into an HTTP
/// response without re-deriving any rate-limit state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDenial {
    /// Human-readable message suitable for direct display.
    pub message: String,
    /// Limit category the denial belongs to (e.g. "auth", "like-button").
    pub category: String,
    /// HTTP status the API layer should answer with (429, or 403 for bots).
    pub http_status: u16,
    /// Alerting severity.
    pub severity: Severity,
    /// Milliseconds until the caller may retry.
    pub retry_after_ms: i64,
    /// Whether the requester scored as automated.
    pub seems_automated: bool,
}
