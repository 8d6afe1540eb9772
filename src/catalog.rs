//! Sample point catalog
//!
//! Fixed sampling coordinates grouped by named region. The built-in catalog
//! covers eight inner and western Sydney suburbs; a JSON file with the same
//! shape can replace it.

use crate::models::Coordinates;
use crate::{CanopyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// A fixed coordinate at which a temperature reading is requested
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl SamplePoint {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// A named group of sample points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub points: Vec<SamplePoint>,
}

impl Region {
    #[must_use]
    pub fn new(name: impl Into<String>, points: Vec<SamplePoint>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }
}

/// The ordered, immutable set of regions sampled at start-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionCatalog {
    regions: Vec<Region>,
}

const BUILT_IN: &[(&str, [(f64, f64); 5])] = &[
    (
        "Redfern",
        [
            (-33.8932, 151.2040),
            (-33.8921, 151.2065),
            (-33.8955, 151.2012),
            (-33.8910, 151.2025),
            (-33.8968, 151.2058),
        ],
    ),
    (
        "Surry Hills",
        [
            (-33.8861, 151.2111),
            (-33.8840, 151.2090),
            (-33.8885, 151.2135),
            (-33.8822, 151.2128),
            (-33.8870, 151.2075),
        ],
    ),
    (
        "Newtown",
        [
            (-33.8978, 151.1794),
            (-33.8960, 151.1820),
            (-33.8995, 151.1768),
            (-33.8942, 151.1785),
            (-33.9010, 151.1805),
        ],
    ),
    (
        "Parramatta",
        [
            (-33.8150, 151.0011),
            (-33.8172, 151.0045),
            (-33.8131, 150.9980),
            (-33.8190, 151.0002),
            (-33.8115, 151.0038),
        ],
    ),
    (
        "Blacktown",
        [
            (-33.7688, 150.9057),
            (-33.7705, 150.9090),
            (-33.7662, 150.9031),
            (-33.7721, 150.9040),
            (-33.7650, 150.9075),
        ],
    ),
    (
        "Penrith",
        [
            (-33.7507, 150.6877),
            (-33.7530, 150.6910),
            (-33.7485, 150.6850),
            (-33.7545, 150.6862),
            (-33.7470, 150.6895),
        ],
    ),
    (
        "Liverpool",
        [
            (-33.9200, 150.9238),
            (-33.9225, 150.9265),
            (-33.9178, 150.9210),
            (-33.9240, 150.9220),
            (-33.9165, 150.9255),
        ],
    ),
    (
        "Bankstown",
        [
            (-33.9173, 151.0335),
            (-33.9195, 151.0360),
            (-33.9150, 151.0310),
            (-33.9210, 151.0318),
            (-33.9138, 151.0352),
        ],
    ),
];

impl Default for RegionCatalog {
    fn default() -> Self {
        Self::built_in()
    }
}

impl RegionCatalog {
    /// Build a catalog, rejecting empty or duplicate region names and bad coordinates
    pub fn new(regions: Vec<Region>) -> Result<Self> {
        let mut seen = HashSet::new();
        for region in &regions {
            let name = region.name.trim();
            if name.is_empty() {
                return Err(CanopyError::validation("Region name cannot be empty"));
            }
            // Lookups and selection ignore case, so names must be unique without it
            if !seen.insert(name.to_lowercase()) {
                return Err(CanopyError::validation(format!(
                    "Duplicate region name: {name}"
                )));
            }
            for point in &region.points {
                point.coordinates().validate()?;
            }
        }
        Ok(Self { regions })
    }

    /// The catalog shipped with the application
    #[must_use]
    pub fn built_in() -> Self {
        let regions = BUILT_IN
            .iter()
            .map(|(name, points)| {
                Region::new(
                    *name,
                    points
                        .iter()
                        .map(|&(lat, lon)| SamplePoint::new(lat, lon))
                        .collect(),
                )
            })
            .collect();
        Self { regions }
    }

    /// Parse a catalog from JSON of the form `{"regions": [{"name": .., "points": [..]}]}`
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: RegionCatalog = serde_json::from_str(json)
            .map_err(|e| CanopyError::validation(format!("Invalid catalog JSON: {e}")))?;
        Self::new(parsed.regions)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading region catalog from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    #[must_use]
    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn point_count(&self) -> usize {
        self.regions.iter().map(|r| r.points.len()).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_built_in_catalog() {
        let catalog = RegionCatalog::built_in();
        assert_eq!(catalog.len(), 8);
        assert_eq!(catalog.point_count(), 40);
        assert!(catalog.region("redfern").is_some());
        assert!(RegionCatalog::new(catalog.regions().to_vec()).is_ok());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{"regions": [
            {"name": "Midtown", "points": [{"latitude": 40.7549, "longitude": -73.9840}]},
            {"name": "Harlem", "points": []}
        ]}"#;
        let catalog = RegionCatalog::from_json(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.regions()[0].name, "Midtown");
        assert_eq!(catalog.point_count(), 1);
    }

    #[rstest]
    #[case("Redfern", "Redfern")]
    #[case("Redfern", "REDFERN")]
    #[case("Surry Hills", " surry hills ")]
    fn test_rejects_duplicate_names(#[case] first: &str, #[case] second: &str) {
        let regions = vec![Region::new(first, vec![]), Region::new(second, vec![])];
        let err = RegionCatalog::new(regions).unwrap_err();
        assert!(err.to_string().contains("Duplicate region"));
    }

    #[test]
    fn test_json_duplicates_differing_in_case_are_rejected() {
        let json = r#"{"regions": [
            {"name": "Redfern", "points": []},
            {"name": "REDFERN", "points": []}
        ]}"#;
        assert!(matches!(
            RegionCatalog::from_json(json),
            Err(CanopyError::Validation { .. })
        ));
    }

    #[test]
    fn test_rejects_invalid_points() {
        let regions = vec![Region::new("Nowhere", vec![SamplePoint::new(95.0, 0.0)])];
        assert!(RegionCatalog::new(regions).is_err());
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = RegionCatalog::from_json("{\"regions\": 3}").unwrap_err();
        assert!(matches!(err, CanopyError::Validation { .. }));
    }
}
