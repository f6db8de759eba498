//! User-agent and behavioral enrichment helpers.

use woothee::parser::Parser;

/// Scores above this value mark the requester as automated.
pub(super) const AUTOMATED_SCORE_THRESHOLD: i32 = 70;

/// Parsed device triad from a raw user-agent string.
#[derive(Debug, Clone, Default)]
pub(super) struct DeviceProfile {
    pub device_type: Option<String>,
    pub device_info: Option<String>,
    pub operating_system: Option<String>,
    pub browser: Option<String>,
    pub browser_version: Option<String>,
}

/// Parses browser, OS, and device category out of a user-agent string.
///
/// Unrecognized or missing user-agents yield an all-`None` profile.
pub(super) fn parse_device(user_agent: Option<&str>) -> DeviceProfile {
    let Some(user_agent) = user_agent else {
        return DeviceProfile::default();
    };

    let Some(parsed) = Parser::new().parse(user_agent) else {
        return DeviceProfile::default();
    };

    let browser = (parsed.name != "UNKNOWN").then(|| parsed.name.to_owned());
    let operating_system = (parsed.os != "UNKNOWN").then(|| parsed.os.to_owned());
    let device_type = (parsed.category != "UNKNOWN").then(|| parsed.category.to_owned());
    let browser_version = (parsed.version != "UNKNOWN").then(|| parsed.version.to_owned());

    let device_info = match (browser.as_deref(), operating_system.as_deref()) {
        (Some(browser), Some(os)) => Some(format!("{browser} on {os}")),
        (Some(browser), None) => Some(browser.to_owned()),
        (None, Some(os)) => Some(os.to_owned()),
        (None, None) => None,
    };

    DeviceProfile {
        device_type,
        device_info,
        operating_system,
        browser,
        browser_version,
    }
}

/// Computes the 0-100 automation score from behavioral facts.
///
/// Three factors contribute fixed point bands: raw attempt volume (up to 30),
/// robotic inter-attempt timing (up to 15), and attempt rate over the session
/// (up to 40). The sum is clamped to `[0, 100]` and is monotone
/// non-decreasing in attempt count when the other factors are held constant.
#[must_use]
pub fn automation_score(
    attempt_count: i32,
    mean_gap_ms: Option<i64>,
    session_duration_ms: Option<i64>,
) -> i32 {
    let mut score = 0;

    score += match attempt_count {
        count if count >= 10 => 30,
        count if count >= 6 => 20,
        count if count >= 4 => 10,
        _ => 0,
    };

    score += match mean_gap_ms {
        Some(gap) if gap < 500 => 15,
        Some(gap) if gap < 2000 => 10,
        _ => 0,
    };

    if let Some(duration) = session_duration_ms
        && duration > 0
    {
        let attempts_per_second = f64::from(attempt_count.max(0)) * 1000.0 / duration as f64;
        score += if attempts_per_second > 1.0 {
            40
        } else if attempts_per_second > 0.25 {
            25
        } else {
            0
        };
    }

    score.clamp(0, 100)
}
