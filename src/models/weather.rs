//! Weather panel data: current conditions, forecast steps and air quality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current conditions at a point, fields left empty when the provider omits them
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct CurrentConditions {
    /// Temperature in Celsius
    pub temperature: Option<f64>,
    /// Apparent temperature in Celsius
    pub feels_like: Option<f64>,
    /// Relative humidity (0-100)
    pub humidity: Option<u8>,
    /// Human-readable description of weather conditions
    pub description: String,
    /// Provider icon code
    pub icon: Option<String>,
}

impl CurrentConditions {
    /// Format temperature with unit
    #[must_use]
    pub fn format_temperature(&self) -> String {
        format_celsius(self.temperature)
    }

    #[must_use]
    pub fn format_feels_like(&self) -> String {
        format_celsius(self.feels_like)
    }

    #[must_use]
    pub fn format_humidity(&self) -> String {
        self.humidity
            .map_or_else(|| UNAVAILABLE.to_string(), |h| format!("{h}%"))
    }
}

/// One timestamped forecast step
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ForecastEntry {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub description: String,
    pub icon: Option<String>,
}

impl ForecastEntry {
    /// Format as a panel line, e.g. "15:00  24.3°C  light rain"
    #[must_use]
    pub fn format_line(&self) -> String {
        format!(
            "{}  {:.1}°C  {}",
            self.timestamp.format("%a %H:%M"),
            self.temperature,
            self.description
        )
    }
}

/// Air quality index on the provider's 1-5 scale
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct AirQuality {
    pub index: u8,
}

impl AirQuality {
    #[must_use]
    pub fn new(index: u8) -> Self {
        Self { index }
    }

    /// Qualitative label for the index
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self.index {
            1 => "Good",
            2 => "Fair",
            3 => "Moderate",
            4 => "Poor",
            5 => "Very Poor",
            _ => "Unknown",
        }
    }
}

/// Placeholder shown for a field or section that could not be loaded
pub const UNAVAILABLE: &str = "unavailable";

fn format_celsius(value: Option<f64>) -> String {
    value.map_or_else(|| UNAVAILABLE.to_string(), |t| format!("{t:.1}°C"))
}
