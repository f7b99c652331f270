//! Current weather lookup
//!
//! Composes geocoding with the `OpenMeteo` forecast endpoint into a one-line
//! summary for the model.

use crate::geocoding::Geocoder;
use crate::models::{ToolArguments, WeatherReading};
use crate::tools::{FunctionDeclaration, Tool, ToolKind, required_argument};
use crate::{AgentError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Source of current conditions at a coordinate
#[async_trait]
pub trait CurrentWeatherSource: Send + Sync {
    /// Returns `Ok(None)` when the response carried no current conditions.
    async fn current(&self, latitude: f64, longitude: f64) -> Result<Option<WeatherReading>>;
}

/// `OpenMeteo` forecast client restricted to current conditions
#[derive(Debug, Clone)]
pub struct OpenMeteoForecast {
    client: reqwest::Client,
    base_url: String,
}

impl OpenMeteoForecast {
    /// Create a forecast client against `base_url` (e.g. `https://api.open-meteo.com/v1`)
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn current_url(&self, latitude: f64, longitude: f64) -> String {
        format!(
            "{}/forecast?latitude={}&longitude={}&current=temperature_2m,weather_code",
            self.base_url, latitude, longitude
        )
    }
}

#[async_trait]
impl CurrentWeatherSource for OpenMeteoForecast {
    #[instrument(skip(self))]
    async fn current(&self, latitude: f64, longitude: f64) -> Result<Option<WeatherReading>> {
        let start_time = Instant::now();
        let url = self.current_url(latitude, longitude);
        debug!("OpenMeteo API request URL: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::api(format!(
                "Forecast request failed with status {status}"
            )));
        }

        let body: openmeteo::ForecastResponse = response.json().await?;
        let reading = body.into_reading()?;

        info!(
            "Retrieved current weather in {:.3}s",
            start_time.elapsed().as_secs_f64()
        );

        Ok(reading)
    }
}

/// `OpenMeteo` API response structures
mod openmeteo {
    use super::{AgentError, Result, WeatherReading};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        pub current: Option<CurrentData>,
        pub current_units: Option<CurrentUnits>,
    }

    #[derive(Debug, Deserialize)]
    pub struct CurrentData {
        #[serde(rename = "temperature_2m")]
        pub temperature: f64,
        pub weather_code: i64,
    }

    #[derive(Debug, Deserialize)]
    pub struct CurrentUnits {
        #[serde(rename = "temperature_2m")]
        pub temperature: String,
    }

    impl ForecastResponse {
        pub fn into_reading(self) -> Result<Option<WeatherReading>> {
            let Some(current) = self.current else {
                return Ok(None);
            };
            let units = self
                .current_units
                .ok_or_else(|| AgentError::api("Forecast response is missing 'current_units'"))?;

            Ok(Some(WeatherReading {
                temperature: current.temperature,
                unit: units.temperature,
                wmo_code: current.weather_code,
            }))
        }
    }
}

/// The `get_weather` tool
pub struct WeatherTool {
    geocoder: Arc<dyn Geocoder>,
    source: Arc<dyn CurrentWeatherSource>,
}

impl WeatherTool {
    #[must_use]
    pub fn new(geocoder: Arc<dyn Geocoder>, source: Arc<dyn CurrentWeatherSource>) -> Self {
        Self { geocoder, source }
    }

    /// Weather summary for `city`; failures are rendered into the text
    pub async fn get_weather(&self, city: &str) -> String {
        info!("Getting weather for: {}", city);
        match self.lookup(city).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Weather lookup for '{}' failed: {}", city, e);
                format!("Error getting weather: {e}")
            }
        }
    }

    async fn lookup(&self, city: &str) -> Result<String> {
        let Some(place) = self.geocoder.resolve(city).await? else {
            return Ok(format!("Could not find coordinates for city: {city}"));
        };

        let Some(reading) = self.source.current(place.latitude, place.longitude).await? else {
            return Ok(format!("Could not get weather data for {}.", place.name));
        };

        Ok(format!(
            "Weather in {}: {}, {}",
            place.name,
            reading.description(),
            reading.format_temperature()
        ))
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Weather
    }

    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration::single_string(
            ToolKind::Weather,
            "Gets the current weather for a given city.",
            "Name of the city, e.g. Paris",
        )
    }

    async fn call(&self, arguments: &ToolArguments) -> Result<String> {
        let city = required_argument(ToolKind::Weather, arguments)?;
        Ok(self.get_weather(city).await)
    }
}
