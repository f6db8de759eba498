//! Pseudo-identifier derivation for anonymous callers.
//!
//! The fingerprint is a SHA-256 digest over client-observable signals. It is
//! deliberately not a cryptographic identity: two real users on identical
//! hardware and locale collide, and a caller that changes any signal gets a
//! fresh identifier. Good enough as a cooldown key, nothing more.

use sha2::{Digest, Sha256};

/// Client-observable signals the fingerprint is derived from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FingerprintSignals {
    /// Raw user-agent string.
    pub user_agent: Option<String>,
    /// Screen resolution as reported by the client, e.g. "2560x1440".
    pub screen_resolution: Option<String>,
    /// IANA timezone name, e.g. "Europe/Berlin".
    pub time_zone: Option<String>,
}

/// Derives a stable identifier from the given signals.
///
/// Deterministic for identical signal triples. Missing signals contribute an
/// empty string instead of failing.
#[must_use]
pub fn generate_fingerprint(signals: &FingerprintSignals) -> String {
    use std::fmt::Write;

    let user_agent = signals.user_agent.as_deref().unwrap_or("");
    let screen_resolution = signals.screen_resolution.as_deref().unwrap_or("");
    let time_zone = signals.time_zone.as_deref().unwrap_or("");

    let mut hasher = Sha256::new();
    hasher.update(user_agent.as_bytes());
    hasher.update(b"|");
    hasher.update(screen_resolution.as_bytes());
    hasher.update(b"|");
    hasher.update(time_zone.as_bytes());
    let digest = hasher.finalize();

    digest
        .iter()
        .fold(String::with_capacity(64), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::{FingerprintSignals, generate_fingerprint};

    fn browser_signals() -> FingerprintSignals {
        FingerprintSignals {
            user_agent: Some("Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0".to_owned()),
            screen_resolution: Some("2560x1440".to_owned()),
            time_zone: Some("Europe/Berlin".to_owned()),
        }
    }

    #[test]
    fn identical_signals_produce_identical_fingerprints() {
        assert_eq!(
            generate_fingerprint(&browser_signals()),
            generate_fingerprint(&browser_signals())
        );
    }

    #[test]
    fn any_changed_signal_changes_the_fingerprint() {
        let base = generate_fingerprint(&browser_signals());

        let mut other_screen = browser_signals();
        other_screen.screen_resolution = Some("1920x1080".to_owned());
        assert_ne!(base, generate_fingerprint(&other_screen));

        let mut other_zone = browser_signals();
        other_zone.time_zone = Some("America/New_York".to_owned());
        assert_ne!(base, generate_fingerprint(&other_zone));
    }

    #[test]
    fn missing_signals_substitute_empty_components() {
        let all_missing = generate_fingerprint(&FingerprintSignals::default());
        let explicit_empty = generate_fingerprint(&FingerprintSignals {
            user_agent: Some(String::new()),
            screen_resolution: Some(String::new()),
            time_zone: Some(String::new()),
        });

        assert_eq!(all_missing, explicit_empty);
        assert_eq!(all_missing.len(), 64);
    }
}
