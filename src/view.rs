//! View state controller
//!
//! Owns the session state behind the map: the active heat island set, the
//! single optional selection, the display mode and the tree-count control.
//! Everything the map layer needs (visible layers, highlighted island, tree
//! marker positions, insight lines) is derived from this state on demand.

use crate::aggregator::HeatIslandAggregator;
use crate::api::WeatherProvider;
use crate::catalog::RegionCatalog;
use crate::models::{Coordinates, HeatIsland};
use crate::simulator::{CoolingImpact, CoolingSimulator, SimulationParameters, Target};
use crate::{CanopyError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use tracing::{debug, info};

/// Most tree markers drawn inside a single zone
pub const MAX_MARKERS_PER_ZONE: usize = 200;

/// Golden angle in radians, used to spread markers evenly
const GOLDEN_ANGLE: f64 = PI * (3.0 - 2.236_067_977_499_79);

/// What the map currently shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Heat islands only
    #[default]
    Heat,
    /// Simulated trees and their cooling impact
    Trees,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::Heat => write!(f, "heat"),
            ViewMode::Trees => write!(f, "trees"),
        }
    }
}

/// Which overlay groups are attached to the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerVisibility {
    pub heat_islands: bool,
    pub tree_markers: bool,
    pub impact: bool,
}

/// A simulated tree position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeMarker {
    pub coordinates: Coordinates,
    /// Index of the heat island the tree belongs to
    pub island: usize,
}

/// Session state; written only through [`ViewStateController`]
#[derive(Debug, Clone, Default)]
pub struct AppState {
    heat_islands: Vec<HeatIsland>,
    selected: Option<usize>,
    mode: ViewMode,
    params: SimulationParameters,
}

/// Drives the mode, selection and simulation for one session
#[derive(Debug, Clone, Default)]
pub struct ViewStateController {
    state: AppState,
    simulator: CoolingSimulator,
}

impl ViewStateController {
    #[must_use]
    pub fn new(simulator: CoolingSimulator) -> Self {
        Self {
            state: AppState::default(),
            simulator,
        }
    }

    #[must_use]
    pub fn mode(&self) -> ViewMode {
        self.state.mode
    }

    #[must_use]
    pub fn heat_islands(&self) -> &[HeatIsland] {
        &self.state.heat_islands
    }

    #[must_use]
    pub fn selected(&self) -> Option<&HeatIsland> {
        self.state.selected.map(|i| &self.state.heat_islands[i])
    }

    #[must_use]
    pub fn params(&self) -> SimulationParameters {
        self.state.params
    }

    /// Replace the active set wholesale; any selection is cleared
    pub fn replace_heat_islands(&mut self, islands: Vec<HeatIsland>) {
        info!("Active heat island set replaced ({} islands)", islands.len());
        self.state.heat_islands = islands;
        self.state.selected = None;
    }

    /// Run a full aggregation pass and install its result
    pub async fn recompute_heat_islands<P: WeatherProvider>(
        &mut self,
        aggregator: &HeatIslandAggregator<P>,
        catalog: &RegionCatalog,
    ) -> usize {
        let islands = aggregator.aggregate(catalog).await;
        let count = islands.len();
        self.replace_heat_islands(islands);
        count
    }

    /// Select the island of `region`, or clear with `None`.
    ///
    /// Selecting the island that is already selected clears the selection.
    /// The mode is left unchanged.
    pub fn set_selection(&mut self, region: Option<&str>) -> Result<Option<&HeatIsland>> {
        let Some(region) = region else {
            self.state.selected = None;
            return Ok(None);
        };

        let index = self
            .state
            .heat_islands
            .iter()
            .position(|island| island.region_name.eq_ignore_ascii_case(region))
            .ok_or_else(|| {
                CanopyError::validation(format!("No heat island for region '{region}'"))
            })?;

        if self.state.selected == Some(index) {
            debug!("Deselected {}", self.state.heat_islands[index].display_name);
            self.state.selected = None;
        } else {
            debug!("Selected {}", self.state.heat_islands[index].display_name);
            self.state.selected = Some(index);
        }

        Ok(self.selected())
    }

    /// Update the tree-count control
    pub fn set_tree_count(&mut self, tree_count: u32) {
        self.state.params.tree_count = tree_count;
    }

    /// Switch modes.
    ///
    /// Entering `heat` clears the selection. Entering `trees` returns the
    /// impact for the current selection state.
    pub fn set_mode(&mut self, mode: ViewMode) -> Option<CoolingImpact> {
        debug!("Mode {} -> {}", self.state.mode, mode);
        self.state.mode = mode;
        match mode {
            ViewMode::Heat => {
                self.state.selected = None;
                None
            }
            ViewMode::Trees => Some(self.simulate(self.state.params.tree_count)),
        }
    }

    fn target(&self) -> Target {
        match self.state.selected {
            Some(_) => Target::Selected,
            None => Target::All {
                island_count: self.state.heat_islands.len(),
            },
        }
    }

    /// Impact of planting `tree_count` trees for the current selection state
    #[must_use]
    pub fn simulate(&self, tree_count: u32) -> CoolingImpact {
        self.simulator
            .simulate(SimulationParameters { tree_count }, self.target())
    }

    #[must_use]
    pub fn layers(&self) -> LayerVisibility {
        match self.state.mode {
            ViewMode::Heat => LayerVisibility {
                heat_islands: true,
                tree_markers: false,
                impact: false,
            },
            ViewMode::Trees => LayerVisibility {
                heat_islands: false,
                tree_markers: true,
                impact: true,
            },
        }
    }

    /// Island drawn with emphasis, if any
    #[must_use]
    pub fn highlighted(&self) -> Option<&HeatIsland> {
        self.selected()
    }

    /// Deterministic positions for the simulated trees in `trees` mode.
    ///
    /// Trees are laid out on a sunflower spiral filling each targeted zone,
    /// at most [`MAX_MARKERS_PER_ZONE`] per zone.
    #[must_use]
    pub fn tree_markers(&self) -> Vec<TreeMarker> {
        if self.state.mode != ViewMode::Trees {
            return Vec::new();
        }

        let per_zone = (self.state.params.tree_count as usize).min(MAX_MARKERS_PER_ZONE);
        if per_zone == 0 {
            return Vec::new();
        }

        let radius = self.simulator.zone_area().sqrt() / PI.sqrt();
        let targets: Vec<usize> = match self.state.selected {
            Some(index) => vec![index],
            None => (0..self.state.heat_islands.len()).collect(),
        };

        targets
            .into_iter()
            .flat_map(|island| {
                let center = self.state.heat_islands[island].coordinates();
                (0..per_zone).map(move |i| {
                    let r = radius * ((i as f64 + 0.5) / per_zone as f64).sqrt();
                    let theta = i as f64 * GOLDEN_ANGLE;
                    TreeMarker {
                        coordinates: center.offset_by_metres(r * theta.cos(), r * theta.sin()),
                        island,
                    }
                })
            })
            .collect()
    }

    /// Short summary lines for the insights panel
    #[must_use]
    pub fn insights(&self) -> Vec<String> {
        let islands = &self.state.heat_islands;
        if islands.is_empty() {
            return vec!["No heat islands available".to_string()];
        }

        match self.state.mode {
            ViewMode::Heat => {
                let mut lines = Vec::new();
                if let Some(hottest) = islands.iter().reduce(|a, b| {
                    if b.temperature_celsius > a.temperature_celsius {
                        b
                    } else {
                        a
                    }
                }) {
                    lines.push(format!(
                        "Hottest: {} at {:.1}°C",
                        hottest.display_name, hottest.temperature_celsius
                    ));
                }
                let average = islands.iter().map(|i| i.temperature_celsius).sum::<f64>()
                    / islands.len() as f64;
                lines.push(format!("Average heat island temperature: {average:.1}°C"));
                if let Some(selected) = self.selected() {
                    lines.push(format!("Selected: {}", selected.display_name));
                }
                lines
            }
            ViewMode::Trees => {
                let impact = self.simulate(self.state.params.tree_count);
                let scope = self
                    .selected()
                    .map_or_else(|| "all heat islands".to_string(), |s| s.display_name.clone());
                vec![
                    format!("Planting across {scope}"),
                    format!(
                        "Estimated cooling: {} with {}",
                        impact.format_reduction(),
                        impact.format_trees()
                    ),
                    format!("Canopy coverage: {}", impact.format_coverage()),
                ]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TemperatureReading;

    fn island(region: &str, temperature: f64, latitude: f64) -> HeatIsland {
        HeatIsland::from_reading(TemperatureReading {
            latitude,
            longitude: 151.0,
            temperature_celsius: temperature,
            feels_like_celsius: temperature,
            humidity_percent: 50,
            region_name: region.to_string(),
        })
    }

    fn sydney() -> Vec<HeatIsland> {
        [
            "Redfern",
            "Surry Hills",
            "Newtown",
            "Parramatta",
            "Blacktown",
            "Penrith",
            "Liverpool",
            "Bankstown",
        ]
        .iter()
        .enumerate()
        .map(|(i, name)| island(name, 25.0 + i as f64, -33.8 - i as f64 * 0.01))
        .collect()
    }

    fn controller() -> ViewStateController {
        let mut controller = ViewStateController::default();
        controller.replace_heat_islands(sydney());
        controller
    }

    #[test]
    fn test_selection_toggles() {
        let mut controller = controller();
        let selected = controller.set_selection(Some("Redfern")).unwrap();
        assert_eq!(selected.unwrap().display_name, "Redfern Heat Island");

        assert!(controller.set_selection(Some("Redfern")).unwrap().is_none());
        assert!(controller.selected().is_none());
    }

    #[test]
    fn test_selection_switches_between_islands() {
        let mut controller = controller();
        controller.set_selection(Some("Redfern")).unwrap();
        controller.set_selection(Some("penrith")).unwrap();
        assert_eq!(controller.selected().unwrap().region_name, "Penrith");
        controller.set_selection(None).unwrap();
        assert!(controller.selected().is_none());
    }

    #[test]
    fn test_unknown_region_is_rejected() {
        let mut controller = controller();
        controller.set_selection(Some("Newtown")).unwrap();
        let err = controller.set_selection(Some("Atlantis")).unwrap_err();
        assert!(matches!(err, CanopyError::Validation { .. }));
        assert_eq!(controller.selected().unwrap().region_name, "Newtown");
    }

    #[test]
    fn test_heat_mode_clears_selection() {
        let mut controller = controller();
        controller.set_mode(ViewMode::Trees);
        controller.set_selection(Some("Liverpool")).unwrap();
        assert_eq!(controller.mode(), ViewMode::Trees);

        assert!(controller.set_mode(ViewMode::Heat).is_none());
        assert!(controller.selected().is_none());
        assert!(controller.highlighted().is_none());

        // Already in heat mode with nothing selected
        assert!(controller.set_mode(ViewMode::Heat).is_none());
        assert!(controller.selected().is_none());
    }

    #[test]
    fn test_selection_in_heat_mode_drives_trees_mode() {
        let mut controller = controller();
        controller.set_tree_count(3);
        controller.set_selection(Some("Blacktown")).unwrap();
        assert_eq!(controller.mode(), ViewMode::Heat);

        let impact = controller.set_mode(ViewMode::Trees).unwrap();
        assert_eq!(impact.trees_planted, 3);
        assert_eq!(impact.format_reduction(), "-2.4°C");
    }

    #[test]
    fn test_trees_mode_without_selection_covers_all() {
        let mut controller = controller();
        controller.set_tree_count(10);
        let impact = controller.set_mode(ViewMode::Trees).unwrap();
        assert_eq!(impact.trees_planted, 80);
        assert_eq!(impact.format_reduction(), "-5.0°C");
    }

    #[test]
    fn test_replace_clears_selection() {
        let mut controller = controller();
        controller.set_selection(Some("Redfern")).unwrap();
        controller.replace_heat_islands(sydney());
        assert!(controller.selected().is_none());
    }

    #[test]
    fn test_layers_follow_mode() {
        let mut controller = controller();
        assert!(controller.layers().heat_islands);
        assert!(!controller.layers().tree_markers);

        controller.set_mode(ViewMode::Trees);
        let layers = controller.layers();
        assert!(!layers.heat_islands);
        assert!(layers.tree_markers);
        assert!(layers.impact);
    }

    #[test]
    fn test_tree_markers() {
        let mut controller = controller();
        controller.set_tree_count(5);
        assert!(controller.tree_markers().is_empty());

        controller.set_mode(ViewMode::Trees);
        assert_eq!(controller.tree_markers().len(), 40);

        controller.set_selection(Some("Newtown")).unwrap();
        let markers = controller.tree_markers();
        assert_eq!(markers.len(), 5);
        assert!(markers.iter().all(|m| m.island == 2));

        let center = controller.selected().unwrap().coordinates();
        for marker in markers {
            let dlat = (marker.coordinates.latitude - center.latitude).abs();
            assert!(dlat <= 500.0 / 111_320.0 + 1e-9);
        }
    }

    #[test]
    fn test_tree_markers_capped_per_zone() {
        let mut controller = controller();
        controller.set_tree_count(10_000);
        controller.set_selection(Some("Redfern")).unwrap();
        controller.set_mode(ViewMode::Trees);
        assert_eq!(controller.tree_markers().len(), MAX_MARKERS_PER_ZONE);
    }

    #[test]
    fn test_insights() {
        let mut controller = controller();
        let lines = controller.insights();
        assert_eq!(lines[0], "Hottest: Bankstown Heat Island at 32.0°C");
        assert_eq!(lines[1], "Average heat island temperature: 28.5°C");

        controller.set_tree_count(3);
        controller.set_selection(Some("Redfern")).unwrap();
        controller.set_mode(ViewMode::Trees);
        let lines = controller.insights();
        assert_eq!(lines[0], "Planting across Redfern Heat Island");
        assert_eq!(lines[1], "Estimated cooling: -2.4°C with 3 trees");

        let empty = ViewStateController::default();
        assert_eq!(empty.insights(), vec!["No heat islands available"]);
    }
}
