//! Temperature readings and the heat islands derived from them

use super::Coordinates;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Suffix appended to a region name to label its heat island
pub const HEAT_ISLAND_SUFFIX: &str = "Heat Island";

/// A normalised current-conditions sample at one catalog point
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TemperatureReading {
    pub latitude: f64,
    pub longitude: f64,
    /// Air temperature in Celsius
    pub temperature_celsius: f64,
    /// Apparent temperature in Celsius
    pub feels_like_celsius: f64,
    /// Relative humidity (0-100)
    pub humidity_percent: u8,
    /// Region the sample point belongs to
    pub region_name: String,
}

impl TemperatureReading {
    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// The hottest reading of a region
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HeatIsland {
    pub latitude: f64,
    pub longitude: f64,
    pub temperature_celsius: f64,
    pub feels_like_celsius: f64,
    pub humidity_percent: u8,
    /// Region this island was selected from
    pub region_name: String,
    /// "<region> Heat Island"
    pub display_name: String,
}

impl HeatIsland {
    /// Promote the hottest reading of a region
    #[must_use]
    pub fn from_reading(reading: TemperatureReading) -> Self {
        let display_name = format!("{} {}", reading.region_name, HEAT_ISLAND_SUFFIX);
        Self {
            latitude: reading.latitude,
            longitude: reading.longitude,
            temperature_celsius: reading.temperature_celsius,
            feels_like_celsius: reading.feels_like_celsius,
            humidity_percent: reading.humidity_percent,
            region_name: reading.region_name,
            display_name,
        }
    }

    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    #[must_use]
    pub fn band(&self) -> TemperatureBand {
        TemperatureBand::for_temperature(self.temperature_celsius)
    }

    /// Tooltip text shown on the island marker
    #[must_use]
    pub fn tooltip(&self) -> String {
        format!(
            "{}: {:.1}°C (feels like {:.1}°C, {}% humidity)",
            self.display_name, self.temperature_celsius, self.feels_like_celsius,
            self.humidity_percent
        )
    }
}

/// Colour band used to style temperature markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureBand {
    Extreme,
    VeryHot,
    Hot,
    Warm,
    Mild,
}

impl TemperatureBand {
    #[must_use]
    pub fn for_temperature(celsius: f64) -> Self {
        match celsius {
            t if t >= 40.0 => TemperatureBand::Extreme,
            t if t >= 37.0 => TemperatureBand::VeryHot,
            t if t >= 34.0 => TemperatureBand::Hot,
            t if t >= 30.0 => TemperatureBand::Warm,
            _ => TemperatureBand::Mild,
        }
    }

    /// Hex colour for the map layer
    #[must_use]
    pub fn color(&self) -> &'static str {
        match self {
            TemperatureBand::Extreme => "#d7191c",
            TemperatureBand::VeryHot => "#fdae61",
            TemperatureBand::Hot => "#ffffbf",
            TemperatureBand::Warm => "#abd9e9",
            TemperatureBand::Mild => "#2c7bb6",
        }
    }
}

impl std::fmt::Display for TemperatureBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemperatureBand::Extreme => write!(f, "Extreme"),
            TemperatureBand::VeryHot => write!(f, "Very hot"),
            TemperatureBand::Hot => write!(f, "Hot"),
            TemperatureBand::Warm => write!(f, "Warm"),
            TemperatureBand::Mild => write!(f, "Mild"),
        }
    }
}

/// A temperature reading submitted by a user
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CommunityReading {
    pub coordinates: Coordinates,
    pub temperature_celsius: f64,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}
