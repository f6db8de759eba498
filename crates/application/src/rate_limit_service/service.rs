use chrono::Utc;
use tracing::warn;

use shellforge_core::{AppResult, RateLimitDenial};
use shellforge_domain::{RateLimitEvent, RateLimitEventKind};

use crate::bot_heuristics::{BotAssessment, HeaderSignals, RuntimeSignals, assess_request};
use crate::error_classifier::{DenialContext, classify_denial};
use crate::event_recorder::{RateLimitEventInput, RateLimitEventRecorder};
use crate::fingerprint::{FingerprintSignals, generate_fingerprint};

use super::attempt_ledger::AttemptLedger;
use super::cooldown_gate::CooldownGate;

/// Per-request context assembled by the API layer: transport facts from
/// headers plus advisory signals the browser self-reports.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Caller IP address.
    pub ip_address: Option<String>,
    /// Raw user-agent string.
    pub user_agent: Option<String>,
    /// `Accept` header value.
    pub accept: Option<String>,
    /// `Accept-Language` header value.
    pub accept_language: Option<String>,
    /// Screen resolution reported by the client.
    pub screen_resolution: Option<String>,
    /// IANA timezone reported by the client.
    pub time_zone: Option<String>,
    /// Client runtime capability probe.
    pub runtime: RuntimeSignals,
    /// How long the client session had been open, in milliseconds.
    pub session_duration_ms: Option<i64>,
}

impl RequestContext {
    fn header_signals(&self) -> HeaderSignals {
        HeaderSignals {
            user_agent: self.user_agent.clone(),
            accept: self.accept.clone(),
            accept_language: self.accept_language.clone(),
        }
    }

    fn fingerprint_signals(&self) -> FingerprintSignals {
        FingerprintSignals {
            user_agent: self.user_agent.clone(),
            screen_resolution: self.screen_resolution.clone(),
            time_zone: self.time_zone.clone(),
        }
    }
}

/// Allow/deny verdict surfaced to API handlers.
#[derive(Debug, Clone)]
pub struct RateLimitVerdict {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Milliseconds until the caller may retry; zero when allowed.
    pub wait_time_ms: i64,
    /// Classified denial, present exactly when `allowed` is false.
    pub denial: Option<RateLimitDenial>,
}

impl RateLimitVerdict {
    fn allow() -> Self {
        Self {
            allowed: true,
            wait_time_ms: 0,
            denial: None,
        }
    }
}

/// Facade over the rate-limiting subsystem.
///
/// Control flow on deny: the ledger or gate decides, bot heuristics score
/// the request, the recorder persists an enriched event, and the classifier
/// produces the user-facing denial. Allows update state and return without
/// logging an event.
#[derive(Clone)]
pub struct RateLimitService {
    login_ledger: AttemptLedger,
    action_gate: CooldownGate,
    recorder: RateLimitEventRecorder,
}

impl RateLimitService {
    /// Creates the facade from its composed services.
    #[must_use]
    pub fn new(
        login_ledger: AttemptLedger,
        action_gate: CooldownGate,
        recorder: RateLimitEventRecorder,
    ) -> Self {
        Self {
            login_ledger,
            action_gate,
            recorder,
        }
    }

    /// Checks a login attempt for the given user key (email or user id).
    pub async fn check_login_attempt(
        &self,
        user_key: &str,
        user_email: Option<&str>,
        context: &RequestContext,
    ) -> RateLimitVerdict {
        let category = self.login_ledger.policy().category().to_owned();
        let scope_key = format!("{category}:{user_key}");
        let decision = self.login_ledger.check(&scope_key).await;

        if decision.allowed {
            return RateLimitVerdict::allow();
        }

        let bot = assess_request(&context.header_signals(), &context.runtime);
        self.record_denial(RateLimitEventInput {
            kind: RateLimitEventKind::Login,
            user_id: Some(user_key.to_owned()),
            user_email: user_email.map(ToOwned::to_owned),
            identifier: scope_key,
            attempt_count: decision.attempt_count,
            window_started_at: decision.window_started_at,
            locked_until: decision.locked_until,
            ip_address: context.ip_address.clone(),
            user_agent: context.user_agent.clone(),
            session_duration_ms: context.session_duration_ms,
            time_between_attempts_ms: decision.time_between_attempts_ms,
            target_resource: None,
            additional_data: Some(bot_metadata(&bot)),
        })
        .await;

        let denial = classify_denial(
            &DenialContext {
                category: category.as_str(),
                wait_time_ms: decision.wait_time_ms,
            },
            Some(&bot),
        );

        RateLimitVerdict {
            allowed: false,
            wait_time_ms: decision.wait_time_ms,
            denial: Some(denial),
        }
    }

    /// Checks a one-shot action (like, feedback) against its cooldown.
    ///
    /// The caller is identified by a fingerprint derived from the request
    /// context, so anonymous users are covered too.
    pub async fn check_action_limit(
        &self,
        resource: &str,
        user_id: Option<&str>,
        user_email: Option<&str>,
        context: &RequestContext,
    ) -> RateLimitVerdict {
        let fingerprint = generate_fingerprint(&context.fingerprint_signals());
        let decision = self.action_gate.check(resource, &fingerprint).await;

        if decision.allowed {
            return RateLimitVerdict::allow();
        }

        let category = self.action_gate.policy().category().to_owned();
        let now = Utc::now();
        let bot = assess_request(&context.header_signals(), &context.runtime);
        self.record_denial(RateLimitEventInput {
            kind: RateLimitEventKind::Action,
            user_id: user_id.map(ToOwned::to_owned),
            user_email: user_email.map(ToOwned::to_owned),
            identifier: fingerprint,
            attempt_count: 1,
            window_started_at: decision.previous_action_at.unwrap_or(now),
            locked_until: Some(now + chrono::Duration::milliseconds(decision.wait_time_ms)),
            ip_address: context.ip_address.clone(),
            user_agent: context.user_agent.clone(),
            session_duration_ms: context.session_duration_ms,
            time_between_attempts_ms: None,
            target_resource: Some(resource.to_owned()),
            additional_data: Some(bot_metadata(&bot)),
        })
        .await;

        let denial = classify_denial(
            &DenialContext {
                category: category.as_str(),
                wait_time_ms: decision.wait_time_ms,
            },
            Some(&bot),
        );

        RateLimitVerdict {
            allowed: false,
            wait_time_ms: decision.wait_time_ms,
            denial: Some(denial),
        }
    }

    /// Clears the login attempt window for a user. Admin only.
    pub async fn reset_login_attempts(&self, user_key: &str) -> AppResult<()> {
        let scope_key = format!("{}:{user_key}", self.login_ledger.policy().category());
        self.login_ledger.reset(&scope_key).await
    }

    /// Returns events whose lockout is still active.
    pub async fn active_rate_limits(&self) -> AppResult<Vec<RateLimitEvent>> {
        self.recorder.list_active().await
    }

    /// Returns the most recent decision events.
    pub async fn rate_limit_history(&self, limit: i64) -> AppResult<Vec<RateLimitEvent>> {
        self.recorder.list_history(limit).await
    }

    /// Returns decision events for one user.
    pub async fn rate_limits_for_user(&self, user_id: &str) -> AppResult<Vec<RateLimitEvent>> {
        self.recorder.list_for_user(user_id).await
    }

    async fn record_denial(&self, input: RateLimitEventInput) {
        // Event logging never blocks or overturns the verdict.
        if let Err(error) = self.recorder.record(input).await {
            warn!(%error, "failed to record rate limit event");
        }
    }
}

fn bot_metadata(bot: &BotAssessment) -> serde_json::Value {
    serde_json::json!({
        "bot_confidence": bot.confidence,
        "bot_reasons": bot.reasons,
    })
}
