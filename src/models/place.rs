//! Resolved place model for geocoded coordinates and timezone

use serde::{Deserialize, Serialize};

/// Timezone assumed when the geocoder does not declare one
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// A geocoded place
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Place {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Display name as returned by the geocoder
    pub name: String,
    /// IANA timezone identifier, e.g. `Europe/Paris`
    pub timezone: String,
}

impl Place {
    /// Create a new place in the default timezone
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, name: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            name: name.into(),
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }

    /// Set the IANA timezone identifier
    #[must_use]
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Format place as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}
