//! Rate limiting ports and application services.
//!
//! Two enforcement primitives share one storage port: a sliding-window
//! attempt ledger with lockout (login throttling) and a one-shot cooldown
//! gate keyed by browser fingerprint (like actions). The facade wires them
//! to bot scoring, event recording, and denial classification.
//!
//! Enforcement lives on the backend; any browser-local counters are
//! advisory UX only. Same-scope concurrent checks may lose updates, which
//! degrades limiting gracefully rather than blocking legitimate traffic;
//! multi-instance deployments need compare-and-swap semantics from the
//! storage layer.

mod attempt_ledger;
mod cooldown_gate;
mod ports;
mod service;
#[cfg(test)]
mod tests;

pub use attempt_ledger::{AttemptLedger, LedgerDecision};
pub use cooldown_gate::{CooldownGate, GateDecision};
pub use ports::RateLimitStore;
pub use service::{RateLimitService, RateLimitVerdict, RequestContext};
