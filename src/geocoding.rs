//! Place name resolution
//!
//! Resolves free-text place names into coordinates and an IANA timezone
//! using the `OpenMeteo` geocoding API (no API key required).

use crate::models::{DEFAULT_TIMEZONE, Place};
use crate::{AgentError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Resolves a place name to a single best candidate
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Returns `Ok(None)` when the geocoder has no candidate for `place_name`.
    async fn resolve(&self, place_name: &str) -> Result<Option<Place>>;
}

/// `OpenMeteo` geocoding client
#[derive(Debug, Clone)]
pub struct OpenMeteoGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl OpenMeteoGeocoder {
    /// Create a geocoder against `base_url` (e.g. `https://geocoding-api.open-meteo.com/v1`)
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn search_url(&self, place_name: &str) -> String {
        format!(
            "{}/search?name={}&count=1&language=en&format=json",
            self.base_url,
            urlencoding::encode(place_name)
        )
    }
}

#[async_trait]
impl Geocoder for OpenMeteoGeocoder {
    #[instrument(skip(self))]
    async fn resolve(&self, place_name: &str) -> Result<Option<Place>> {
        let start_time = Instant::now();
        let url = self.search_url(place_name);
        debug!("OpenMeteo geocoding request URL: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::api(format!(
                "Geocoding request failed with status {status}"
            )));
        }

        let body: openmeteo::GeocodingResponse = response.json().await?;
        let place = body
            .results
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(Place::from);

        match &place {
            Some(place) => info!(
                "Resolved '{}' to {} ({}) in {:.3}s",
                place_name,
                place.name,
                place.format_coordinates(),
                start_time.elapsed().as_secs_f64()
            ),
            None => warn!("No geocoding results found for '{}'", place_name),
        }

        Ok(place)
    }
}

/// `OpenMeteo` geocoding response structures
mod openmeteo {
    use super::{DEFAULT_TIMEZONE, Deserialize, Place};

    #[derive(Debug, Deserialize)]
    pub struct GeocodingResponse {
        pub results: Option<Vec<GeocodingResult>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct GeocodingResult {
        pub name: String,
        pub latitude: f64,
        pub longitude: f64,
        pub timezone: Option<String>,
    }

    impl From<GeocodingResult> for Place {
        fn from(result: GeocodingResult) -> Self {
            Place {
                latitude: result.latitude,
                longitude: result.longitude,
                name: result.name,
                timezone: result
                    .timezone
                    .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            }
        }
    }
}
