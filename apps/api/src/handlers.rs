//! HTTP handlers grouped by surface.

pub mod admin;
pub mod auth;
pub mod health;
pub mod likes;

use axum::http::HeaderMap;

use shellforge_application::{RequestContext, RuntimeSignals};

use crate::dto::ClientSignals;

/// Builds the rate-limiting request context from transport headers and the
/// advisory signals the client self-reports.
pub(crate) fn build_request_context(
    headers: &HeaderMap,
    client: Option<ClientSignals>,
) -> RequestContext {
    let client = client.unwrap_or_default();

    RequestContext {
        ip_address: header_value(headers, "x-forwarded-for")
            .as_deref()
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned),
        user_agent: header_value(headers, "user-agent"),
        accept: header_value(headers, "accept"),
        accept_language: header_value(headers, "accept-language"),
        screen_resolution: client.screen_resolution,
        time_zone: client.time_zone,
        runtime: RuntimeSignals {
            webdriver: client.webdriver,
            plugins_count: client.plugins_count,
            languages_count: client.languages_count,
            hardware_concurrency: client.hardware_concurrency,
            automation_globals: client.automation_globals,
        },
        session_duration_ms: client.session_duration_ms,
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderMap;

    use crate::dto::ClientSignals;

    use super::build_request_context;

    #[test]
    fn forwarded_for_takes_first_hop_and_trims() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.2".parse().unwrap_or_else(|_| unreachable!("static header value")));

        let context = build_request_context(&headers, None);
        assert_eq!(context.ip_address.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn missing_headers_and_signals_become_none() {
        let context = build_request_context(&HeaderMap::new(), Some(ClientSignals::default()));

        assert_eq!(context.ip_address, None);
        assert_eq!(context.user_agent, None);
        assert_eq!(context.screen_resolution, None);
        assert!(!context.runtime.webdriver);
    }
}
