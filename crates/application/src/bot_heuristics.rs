//! Heuristic bot-confidence scoring from header, user-agent, and client
//! runtime signals.
//!
//! This is signal for downstream event logging, not a hard gate: false
//! positives and negatives are expected. Three independent groups each
//! contribute a fixed weight per triggered check; the sum is clamped to
//! `[0, 1]` and anything above 0.5 is flagged as a bot.

/// Weight for each anomalous or missing header.
const HEADER_WEIGHT: f64 = 0.20;
/// Weight for each matched user-agent pattern category.
const USER_AGENT_WEIGHT: f64 = 0.30;
/// Weight for each runtime/DOM anomaly.
const RUNTIME_WEIGHT: f64 = 0.25;

/// Confidence above which a request is treated as a bot.
const BOT_THRESHOLD: f64 = 0.5;

const KNOWN_BOT_PATTERNS: &[&str] = &[
    "googlebot",
    "bingbot",
    "yandexbot",
    "duckduckbot",
    "baiduspider",
    "slurp",
    "crawler",
    "spider",
    "facebookexternalhit",
];

// "selenium" and "headless" appear in both automation and headless lists on
// purpose: either marker alone must push confidence past the bot threshold.
const AUTOMATION_TOOL_PATTERNS: &[&str] = &[
    "selenium",
    "webdriver",
    "puppeteer",
    "playwright",
    "phantomjs",
    "headless",
    "cypress",
];

const HTTP_CLIENT_PATTERNS: &[&str] = &[
    "curl",
    "wget",
    "python-requests",
    "python-urllib",
    "go-http-client",
    "okhttp",
    "libwww",
    "httpclient",
    "axios",
    "java/",
];

const HEADLESS_MARKER_PATTERNS: &[&str] = &[
    "headless",
    "selenium",
    "phantomjs",
    "slimerjs",
    "htmlunit",
];

/// Request header signals relevant to bot scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSignals {
    /// Raw user-agent string.
    pub user_agent: Option<String>,
    /// `Accept` header value.
    pub accept: Option<String>,
    /// `Accept-Language` header value.
    pub accept_language: Option<String>,
}

/// Client runtime capability probe, self-reported by the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeSignals {
    /// `navigator.webdriver` flag.
    pub webdriver: bool,
    /// Number of configured browser plugins.
    pub plugins_count: Option<u32>,
    /// Number of configured languages.
    pub languages_count: Option<u32>,
    /// Logical CPU count reported by the client.
    pub hardware_concurrency: Option<u32>,
    /// Automation-framework globals observed on `window`.
    pub automation_globals: Vec<String>,
}

/// Outcome of a bot-heuristics assessment.
#[derive(Debug, Clone, PartialEq)]
pub struct BotAssessment {
    /// Whether the confidence crossed the bot threshold.
    pub is_bot: bool,
    /// Summed heuristic confidence, clamped to `[0, 1]`.
    pub confidence: f64,
    /// Every triggered check, labelled by group and check name.
    pub reasons: Vec<String>,
}

/// Scores a request as bot-like from headers and runtime signals.
#[must_use]
pub fn assess_request(headers: &HeaderSignals, runtime: &RuntimeSignals) -> BotAssessment {
    let mut confidence = 0.0;
    let mut reasons = Vec::new();

    if headers.user_agent.as_deref().is_none_or(str::is_empty) {
        confidence += HEADER_WEIGHT;
        reasons.push("header:missing-user-agent".to_owned());
    }
    if headers.accept_language.as_deref().is_none_or(str::is_empty) {
        confidence += HEADER_WEIGHT;
        reasons.push("header:missing-accept-language".to_owned());
    }
    if headers.accept.as_deref() == Some("*/*") {
        confidence += HEADER_WEIGHT;
        reasons.push("header:generic-accept".to_owned());
    }

    if let Some(user_agent) = headers.user_agent.as_deref() {
        let lowered = user_agent.to_lowercase();
        let categories: [(&[&str], &str); 4] = [
            (KNOWN_BOT_PATTERNS, "user-agent:known-bot"),
            (AUTOMATION_TOOL_PATTERNS, "user-agent:automation-tool"),
            (HTTP_CLIENT_PATTERNS, "user-agent:http-client"),
            (HEADLESS_MARKER_PATTERNS, "user-agent:headless-marker"),
        ];

        for (patterns, label) in categories {
            if patterns.iter().any(|pattern| lowered.contains(pattern)) {
                confidence += USER_AGENT_WEIGHT;
                reasons.push(label.to_owned());
            }
        }
    }

    if runtime.webdriver {
        confidence += RUNTIME_WEIGHT;
        reasons.push("runtime:webdriver-flag".to_owned());
    }
    if runtime.plugins_count == Some(0) {
        confidence += RUNTIME_WEIGHT;
        reasons.push("runtime:no-plugins".to_owned());
    }
    if runtime.languages_count == Some(0) {
        confidence += RUNTIME_WEIGHT;
        reasons.push("runtime:no-languages".to_owned());
    }
    if runtime.hardware_concurrency == Some(1) {
        confidence += RUNTIME_WEIGHT;
        reasons.push("runtime:single-core".to_owned());
    }
    if !runtime.automation_globals.is_empty() {
        confidence += RUNTIME_WEIGHT;
        reasons.push("runtime:automation-globals".to_owned());
    }

    let confidence = confidence.min(1.0);

    BotAssessment {
        is_bot: confidence > BOT_THRESHOLD,
        confidence,
        reasons,
    }
}
