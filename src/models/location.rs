//! Geographic coordinate model

use crate::CanopyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Metres per degree of latitude, close enough for zone-sized offsets
const METRES_PER_DEGREE: f64 = 111_320.0;

/// A point on the map in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Coordinates {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check that both components are within their valid ranges
    pub fn validate(&self) -> crate::Result<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(CanopyError::validation(format!(
                "Latitude must be between -90 and 90, got: {}",
                self.latitude
            )));
        }

        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(CanopyError::validation(format!(
                "Longitude must be between -180 and 180, got: {}",
                self.longitude
            )));
        }

        Ok(())
    }

    /// Parse coordinates from a string like "-33.89,151.20" or "-33.89 151.20"
    pub fn parse(input: &str) -> crate::Result<Self> {
        let parts: Vec<&str> = input
            .trim()
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();

        if parts.len() != 2 {
            return Err(CanopyError::validation(
                "Coordinates must be in format 'lat,lon'",
            ));
        }

        let latitude = parts[0]
            .parse::<f64>()
            .map_err(|_| CanopyError::validation(format!("Invalid latitude: {}", parts[0])))?;
        let longitude = parts[1]
            .parse::<f64>()
            .map_err(|_| CanopyError::validation(format!("Invalid longitude: {}", parts[1])))?;

        let coordinates = Self::new(latitude, longitude);
        coordinates.validate()?;
        Ok(coordinates)
    }

    /// Move by a metric offset, east and north positive
    #[must_use]
    pub fn offset_by_metres(&self, east: f64, north: f64) -> Self {
        let lat = self.latitude + north / METRES_PER_DEGREE;
        let cos_lat = self.latitude.to_radians().cos().max(1e-6);
        let lon = self.longitude + east / (METRES_PER_DEGREE * cos_lat);
        Self::new(lat, lon)
    }

    /// Format as coordinate string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

impl FromStr for Coordinates {
    type Err = CanopyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_coordinates())
    }
}
