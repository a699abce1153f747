//! Nominatim search API client.

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use fleetpulse_core::config::GeocodingConfig;
use fleetpulse_core::error::{AppError, ErrorKind};
use fleetpulse_core::result::AppResult;
use fleetpulse_entity::Coordinates;

use crate::provider::GeocodingProvider;

/// One search hit. Nominatim encodes coordinates as strings.
#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Geocoder backed by a Nominatim-compatible `/search` endpoint.
///
/// Holds a reusable `reqwest::Client`; the per-attempt timeout is applied
/// by [`crate::RetryingGeocoder`].
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    /// Reusable HTTP client with connection pooling.
    http: reqwest::Client,
    /// Full URL of the search endpoint.
    search_url: Url,
}

impl NominatimGeocoder {
    /// Create a client from configuration.
    pub fn new(config: &GeocodingConfig) -> AppResult<Self> {
        let base = config.base_url.trim_end_matches('/');
        let search_url = Url::parse(&format!("{base}/search")).map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Invalid geocoding base URL '{}'", config.base_url),
                e,
            )
        })?;

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Internal, "Failed to build HTTP client", e)
            })?;

        Ok(Self { http, search_url })
    }

    fn request_url(&self, address: &str) -> AppResult<Url> {
        Url::parse_with_params(
            self.search_url.as_str(),
            &[("q", address), ("format", "json"), ("limit", "1")],
        )
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Failed to build search URL", e))
    }
}

#[async_trait]
impl GeocodingProvider for NominatimGeocoder {
    async fn resolve_address(&self, address: &str) -> AppResult<Coordinates> {
        let address = address.trim();
        if address.is_empty() {
            return Err(AppError::validation("Address must not be empty"));
        }

        let response = self
            .http
            .get(self.request_url(address)?)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::ExternalService, "Geocoding request failed", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::external_service(format!(
                "Geocoding service answered {status}"
            )));
        }

        let hits: Vec<SearchHit> = response.json().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::ExternalService,
                "Malformed geocoding response",
                e,
            )
        })?;

        let hit = hits
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found(format!("No location matches '{address}'")))?;

        tracing::debug!(
            address = %address,
            resolved = hit.display_name.as_deref().unwrap_or(""),
            "Address geocoded"
        );

        parse_hit(&hit)
    }
}

fn parse_hit(hit: &SearchHit) -> AppResult<Coordinates> {
    let lat = hit.lat.parse::<f64>();
    let lon = hit.lon.parse::<f64>();
    match (lat, lon) {
        (Ok(lat), Ok(lon)) => Coordinates::new(lat, lon),
        _ => Err(AppError::external_service(format!(
            "Unparseable coordinates '{}', '{}'",
            hit.lat, hit.lon
        ))),
    }
}
