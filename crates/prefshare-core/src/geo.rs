//! IP geolocation lookup.
//!
//! Any failure resolves to [`UNKNOWN`]; callers never see an error.

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::config::{Config, UrlKey};

/// City reported when a lookup cannot be resolved.
pub const UNKNOWN: &str = "Unknown";

/// Sentinel the geolocation service returns for unresolved addresses.
const UNRESOLVED_SENTINEL: &str = "-";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeoResponse {
    #[serde(default)]
    city_name: Option<String>,
}

/// Resolves IP addresses to city names.
#[derive(Debug, Clone)]
pub struct GeoLocator {
    base_url: String,
    http: reqwest::Client,
}

impl GeoLocator {
    pub fn new(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Builds a locator from config, sharing an existing HTTP client.
    ///
    /// # Errors
    /// Returns an error if the configured URL is invalid.
    pub fn from_config(config: &Config, http: reqwest::Client) -> Result<Self> {
        Ok(Self::new(config.resolve_url(UrlKey::Geo)?, http))
    }

    /// Returns the city for an IP, or `"Unknown"`.
    pub async fn city_for_ip(&self, ip: &str) -> String {
        let ip = ip.trim();
        if ip.is_empty() {
            return UNKNOWN.to_string();
        }

        match self.lookup(ip).await {
            Ok(city) => city,
            Err(err) => {
                tracing::warn!(ip, error = %err, "location lookup failed");
                UNKNOWN.to_string()
            }
        }
    }

    /// `{base}/api/json/{ip}` with the IP as one encoded path segment.
    fn lookup_url(&self, ip: &str) -> Result<url::Url> {
        let mut url = url::Url::parse(&self.base_url)
            .with_context(|| format!("Invalid geo URL {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("Geo URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(["api", "json", ip]);
        Ok(url)
    }

    async fn lookup(&self, ip: &str) -> Result<String> {
        let url = self.lookup_url(ip)?;
        let response: GeoResponse = self
            .http
            .get(url)
            .send()
            .await
            .context("geo request failed")?
            .error_for_status()
            .context("geo service rejected lookup")?
            .json()
            .await
            .context("unparseable geo response")?;
        Ok(normalize_city(response.city_name.as_deref()))
    }
}

fn normalize_city(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(city) if !city.is_empty() && city != UNRESOLVED_SENTINEL => city.to_string(),
        _ => UNKNOWN.to_string(),
    }
}
