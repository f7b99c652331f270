//! Current weather reading and WMO code interpretation

use serde::{Deserialize, Serialize};

/// Current conditions at a place, as reported by the forecast API
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherReading {
    /// Air temperature at 2 m
    pub temperature: f64,
    /// Unit of `temperature` as declared by the API, e.g. `°C`
    pub unit: String,
    /// WMO weather interpretation code
    pub wmo_code: i64,
}

impl WeatherReading {
    /// Short human-readable description of the conditions
    #[must_use]
    pub fn description(&self) -> &'static str {
        wmo_description(self.wmo_code)
    }

    /// Temperature with its unit, e.g. `18.4 °C`
    ///
    /// Whole values keep one decimal place (`18.0 °C`).
    #[must_use]
    pub fn format_temperature(&self) -> String {
        if self.temperature.is_finite() && self.temperature.fract() == 0.0 {
            format!("{:.1} {}", self.temperature, self.unit)
        } else {
            format!("{} {}", self.temperature, self.unit)
        }
    }
}

/// Convert a WMO weather code to a coarse description
///
/// Total over every integer; codes outside the known groups are `Unknown`.
#[must_use]
pub fn wmo_description(code: i64) -> &'static str {
    match code {
        0 => "Clear sky",
        1..=3 => "Partly cloudy",
        45 | 48 => "Fog",
        51 | 53 | 55 => "Drizzle",
        61 | 63 | 65 => "Rain",
        71 | 73 | 75 => "Snow",
        95 | 96 | 99 => "Thunderstorm",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "Clear sky")]
    #[case(1, "Partly cloudy")]
    #[case(2, "Partly cloudy")]
    #[case(3, "Partly cloudy")]
    #[case(45, "Fog")]
    #[case(48, "Fog")]
    #[case(53, "Drizzle")]
    #[case(65, "Rain")]
    #[case(71, "Snow")]
    #[case(99, "Thunderstorm")]
    #[case(4, "Unknown")]
    #[case(56, "Unknown")]
    #[case(80, "Unknown")]
    #[case(-1, "Unknown")]
    fn test_wmo_description(#[case] code: i64, #[case] expected: &str) {
        assert_eq!(wmo_description(code), expected);
    }

    #[test]
    fn test_wmo_table_is_total_over_known_range() {
        let categories = [
            "Clear sky",
            "Partly cloudy",
            "Fog",
            "Drizzle",
            "Rain",
            "Snow",
            "Thunderstorm",
            "Unknown",
        ];
        for code in 0..=99 {
            assert!(categories.contains(&wmo_description(code)), "code {code}");
        }
    }

    #[test]
    fn test_format_temperature_keeps_api_precision() {
        let reading = WeatherReading {
            temperature: 18.4,
            unit: "°C".to_string(),
            wmo_code: 2,
        };
        assert_eq!(reading.format_temperature(), "18.4 °C");
        assert_eq!(reading.description(), "Partly cloudy");

        let whole = WeatherReading {
            temperature: -3.0,
            unit: "°F".to_string(),
            wmo_code: 71,
        };
        assert_eq!(whole.format_temperature(), "-3.0 °F");
    }
}
