//! Application services and ports for Shellforge.

#![feature(int_roundings)]
#![forbid(unsafe_code)]

mod bot_heuristics;
mod error_classifier;
mod event_recorder;
mod fingerprint;
mod rate_limit_service;
mod user_service;

pub use bot_heuristics::{BotAssessment, HeaderSignals, RuntimeSignals, assess_request};
pub use error_classifier::{DenialContext, classify_denial};
pub use event_recorder::{
    GeoLocation, GeoLookup, RateLimitEventInput, RateLimitEventRecorder, RateLimitEventRepository,
    automation_score,
};
pub use fingerprint::{FingerprintSignals, generate_fingerprint};
pub use rate_limit_service::{
    AttemptLedger, CooldownGate, GateDecision, LedgerDecision, RateLimitService, RateLimitStore,
    RateLimitVerdict, RequestContext,
};
pub use user_service::{AuthOutcome, PasswordHasher, RegisterParams, UserRepository, UserService};
