//! Maps rate-limit denials into typed, user-facing errors with an HTTP
//! status and alerting severity.

use shellforge_core::{RateLimitDenial, Severity};

use crate::bot_heuristics::BotAssessment;

/// Bot confidence above which a denial is reported as blocked automation.
const BLOCKED_AUTOMATION_CONFIDENCE: f64 = 0.8;

/// Denial facts the classifier turns into a user-facing error.
#[derive(Debug, Clone)]
pub struct DenialContext<'a> {
    /// Limit category the denial belongs to.
    pub category: &'a str,
    /// Milliseconds until the caller may retry.
    pub wait_time_ms: i64,
}

/// Classifies a denied rate-limit check.
///
/// High-confidence bots get a 403 with a fixed message; everyone else gets a
/// 429 with a category-specific wait message. Severity is high for the auth
/// category, medium otherwise.
#[must_use]
pub fn classify_denial(
    context: &DenialContext<'_>,
    bot: Option<&BotAssessment>,
) -> RateLimitDenial {
    let seems_automated = bot.is_some_and(|assessment| assessment.is_bot);

    if let Some(assessment) = bot
        && assessment.is_bot
        && assessment.confidence > BLOCKED_AUTOMATION_CONFIDENCE
    {
        return RateLimitDenial {
            message: "automated access blocked".to_owned(),
            category: context.category.to_owned(),
            http_status: 403,
            severity: Severity::High,
            retry_after_ms: context.wait_time_ms,
            seems_automated: true,
        };
    }

    let wait = humanize_wait(context.wait_time_ms);
    let (message, severity) = match context.category {
        "auth" => (
            format!("too many login attempts. please try again in {wait}"),
            Severity::High,
        ),
        "feedback" => (
            format!("you have recently submitted feedback. please try again in {wait}"),
            Severity::Medium,
        ),
        "like-button" => (
            format!("you have already liked this recently. you can like again in {wait}"),
            Severity::Medium,
        ),
        _ => (
            format!("rate limit exceeded. please try again in {wait}"),
            Severity::Medium,
        ),
    };

    RateLimitDenial {
        message,
        category: context.category.to_owned(),
        http_status: 429,
        severity,
        retry_after_ms: context.wait_time_ms,
        seems_automated,
    }
}

fn humanize_wait(wait_time_ms: i64) -> String {
    const MINUTE_MS: i64 = 60 * 1000;
    const HOUR_MS: i64 = 60 * MINUTE_MS;
    const DAY_MS: i64 = 24 * HOUR_MS;

    if wait_time_ms < MINUTE_MS {
        return "less than a minute".to_owned();
    }

    let (amount, unit) = if wait_time_ms < HOUR_MS {
        (wait_time_ms.div_ceil(MINUTE_MS), "minute")
    } else if wait_time_ms < DAY_MS {
        (wait_time_ms.div_ceil(HOUR_MS), "hour")
    } else {
        (wait_time_ms.div_ceil(DAY_MS), "day")
    };

    if amount == 1 {
        format!("1 {unit}")
    } else {
        format!("{amount} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use shellforge_core::Severity;

    use super::{DenialContext, classify_denial};
    use crate::bot_heuristics::BotAssessment;

    fn context(category: &str, wait_time_ms: i64) -> DenialContext<'_> {
        DenialContext {
            category,
            wait_time_ms,
        }
    }

    #[test]
    fn high_confidence_bot_is_blocked_with_403() {
        let bot = BotAssessment {
            is_bot: true,
            confidence: 0.9,
            reasons: vec!["user-agent:automation-tool".to_owned()],
        };

        let denial = classify_denial(&context("auth", 60_000), Some(&bot));

        assert_eq!(denial.http_status, 403);
        assert_eq!(denial.severity, Severity::High);
        assert_eq!(denial.message, "automated access blocked");
        assert!(denial.seems_automated);
    }

    #[test]
    fn moderate_bot_confidence_still_gets_wait_message() {
        let bot = BotAssessment {
            is_bot: true,
            confidence: 0.6,
            reasons: Vec::new(),
        };

        let denial = classify_denial(&context("auth", 15 * 60 * 1000), Some(&bot));

        assert_eq!(denial.http_status, 429);
        assert!(denial.seems_automated);
        assert_eq!(
            denial.message,
            "too many login attempts. please try again in 15 minutes"
        );
    }

    #[test]
    fn auth_category_is_high_severity() {
        let denial = classify_denial(&context("auth", 60_000), None);

        assert_eq!(denial.http_status, 429);
        assert_eq!(denial.severity, Severity::High);
        assert!(!denial.seems_automated);
    }

    #[test]
    fn like_button_uses_its_own_template_with_day_scale() {
        let denial = classify_denial(&context("like-button", 24 * 60 * 60 * 1000), None);

        assert_eq!(denial.severity, Severity::Medium);
        assert_eq!(
            denial.message,
            "you have already liked this recently. you can like again in 1 day"
        );
    }

    #[test]
    fn unknown_category_falls_back_to_generic_template() {
        let denial = classify_denial(&context("export", 90 * 1000), None);

        assert_eq!(
            denial.message,
            "rate limit exceeded. please try again in 2 minutes"
        );
        assert_eq!(denial.severity, Severity::Medium);
    }

    #[test]
    fn sub_minute_waits_read_naturally() {
        let denial = classify_denial(&context("feedback", 20 * 1000), None);

        assert_eq!(
            denial.message,
            "you have recently submitted feedback. please try again in less than a minute"
        );
    }
}
