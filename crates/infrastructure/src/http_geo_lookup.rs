//! HTTP-based IP geolocation adapter.
//!
//! Queries an ip-api.com-compatible JSON endpoint. Private and loopback
//! addresses are short-circuited locally since no public geo database can
//! say anything useful about them.

use async_trait::async_trait;
use ipnet::IpNet;
use serde::Deserialize;

use shellforge_application::{GeoLocation, GeoLookup};
use shellforge_core::{AppError, AppResult};

const NON_PUBLIC_RANGES: &[&str] = &[
    "10.0.0.0/8",
    "172.16.0.0/12",
    "192.168.0.0/16",
    "127.0.0.0/8",
    "169.254.0.0/16",
    "100.64.0.0/10",
    "fc00::/7",
    "fe80::/10",
    "::1/128",
];

/// Geo lookup against an HTTP JSON endpoint.
#[derive(Clone)]
pub struct HttpGeoLookup {
    http_client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    status: String,
    country: Option<String>,
    city: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl HttpGeoLookup {
    /// Creates a lookup with a shared client and endpoint base URL
    /// (e.g. `http://ip-api.com/json`).
    #[must_use]
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    fn is_public(ip_address: &str) -> bool {
        let Ok(parsed) = ip_address.parse::<std::net::IpAddr>() else {
            return false;
        };

        !NON_PUBLIC_RANGES
            .iter()
            .filter_map(|range| range.parse::<IpNet>().ok())
            .any(|range| range.contains(&parsed))
    }
}

#[async_trait]
impl GeoLookup for HttpGeoLookup {
    async fn locate(&self, ip_address: &str) -> AppResult<GeoLocation> {
        if !Self::is_public(ip_address) {
            return Ok(GeoLocation::default());
        }

        let url = format!(
            "{}/{ip_address}?fields=status,country,city,lat,lon",
            self.base_url
        );

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("geo lookup request failed: {error}")))?
            .error_for_status()
            .map_err(|error| AppError::Internal(format!("geo lookup returned error: {error}")))?;

        let body: GeoResponse = response
            .json()
            .await
            .map_err(|error| AppError::Internal(format!("geo lookup response invalid: {error}")))?;

        if body.status != "success" {
            return Err(AppError::Internal(format!(
                "geo lookup failed for {ip_address}"
            )));
        }

        Ok(GeoLocation {
            country: body.country,
            city: body.city,
            latitude: body.lat,
            longitude: body.lon,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::HttpGeoLookup;

    #[test]
    fn private_and_malformed_addresses_are_not_public() {
        assert!(!HttpGeoLookup::is_public("10.1.2.3"));
        assert!(!HttpGeoLookup::is_public("172.20.0.1"));
        assert!(!HttpGeoLookup::is_public("192.168.1.10"));
        assert!(!HttpGeoLookup::is_public("127.0.0.1"));
        assert!(!HttpGeoLookup::is_public("::1"));
        assert!(!HttpGeoLookup::is_public("not-an-ip"));
    }

    #[test]
    fn public_addresses_pass_the_filter() {
        assert!(HttpGeoLookup::is_public("8.8.8.8"));
        assert!(HttpGeoLookup::is_public("2001:4860:4860::8888"));
    }
}
