//! Local time lookup
//!
//! Resolves a city's IANA timezone through the geocoder and renders the
//! current wall-clock time there.

use crate::geocoding::Geocoder;
use crate::models::ToolArguments;
use crate::tools::{FunctionDeclaration, Tool, ToolKind, required_argument};
use crate::{AgentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{info, warn};

/// Output format for local times
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Format `instant` as wall-clock time in the IANA zone `timezone`
pub fn format_local_time(instant: DateTime<Utc>, timezone: &str) -> Result<String> {
    let tz: Tz = timezone
        .parse()
        .map_err(|_| AgentError::validation(format!("Unknown timezone '{timezone}'")))?;
    Ok(instant.with_timezone(&tz).format(TIME_FORMAT).to_string())
}

/// The `get_current_time` tool
pub struct TimeTool {
    geocoder: Arc<dyn Geocoder>,
    clock: Arc<dyn Clock>,
}

impl TimeTool {
    #[must_use]
    pub fn new(geocoder: Arc<dyn Geocoder>, clock: Arc<dyn Clock>) -> Self {
        Self { geocoder, clock }
    }

    /// Local time in `city`; failures are rendered into the text
    pub async fn get_current_time(&self, city: &str) -> String {
        info!("Getting time for: {}", city);
        match self.lookup(city).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Time lookup for '{}' failed: {}", city, e);
                format!("Error getting time: {e}")
            }
        }
    }

    async fn lookup(&self, city: &str) -> Result<String> {
        let Some(place) = self.geocoder.resolve(city).await? else {
            return Ok(format!("Could not find coordinates for city: {city}"));
        };

        // Read the clock only after geocoding returned.
        let local_time = format_local_time(self.clock.now(), &place.timezone)?;

        Ok(format!(
            "Current time in {} ({}): {}",
            place.name, place.timezone, local_time
        ))
    }
}

#[async_trait]
impl Tool for TimeTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Time
    }

    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration::single_string(
            ToolKind::Time,
            "Gets the current local time for a given city.",
            "Name of the city, e.g. Tokyo",
        )
    }

    async fn call(&self, arguments: &ToolArguments) -> Result<String> {
        let city = required_argument(ToolKind::Time, arguments)?;
        Ok(self.get_current_time(city).await)
    }
}
