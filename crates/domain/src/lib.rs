//! Domain types for Shellforge: users and the rate-limiting data model.

#![forbid(unsafe_code)]

mod rate_limit;
mod user;

pub use rate_limit::{
    ActionCooldownRecord, AttemptRecord, CooldownPolicy, LimitScope, RateLimitEvent,
    RateLimitEventKind, RateLimitPolicy,
};
pub use user::{EmailAddress, User, UserId};
