//! Cooling impact simulation
//!
//! Estimates the temperature reduction and canopy coverage gained by planting
//! trees in one selected heat island zone or in every zone at once.

use crate::config::SimulationConfig;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Inputs driven by the tree-count control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SimulationParameters {
    pub tree_count: u32,
}

/// Which zones the planted trees are spread over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// One selected heat island
    Selected,
    /// Every heat island in the active set
    All { island_count: usize },
}

/// Result of one simulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoolingImpact {
    /// Estimated reduction in °C, never above the configured cap
    pub temperature_reduction_celsius: f64,
    pub trees_planted: u64,
    /// Share of the reference area under canopy, 0-100
    pub area_coverage_percent: f64,
}

impl CoolingImpact {
    pub const NONE: CoolingImpact = CoolingImpact {
        temperature_reduction_celsius: 0.0,
        trees_planted: 0,
        area_coverage_percent: 0.0,
    };

    /// e.g. "-2.4°C"
    #[must_use]
    pub fn format_reduction(&self) -> String {
        format!("-{:.1}°C", self.temperature_reduction_celsius)
    }

    /// e.g. "3 trees"
    #[must_use]
    pub fn format_trees(&self) -> String {
        format!(
            "{} tree{}",
            self.trees_planted,
            if self.trees_planted == 1 { "" } else { "s" }
        )
    }

    /// e.g. "12.5%"
    #[must_use]
    pub fn format_coverage(&self) -> String {
        format!("{:.1}%", self.area_coverage_percent)
    }
}

/// Pure cooling model parameterised by [`SimulationConfig`]
#[derive(Debug, Clone)]
pub struct CoolingSimulator {
    max_reduction: f64,
    reduction_per_tree: f64,
    canopy_area_per_tree: f64,
    zone_area: f64,
}

impl Default for CoolingSimulator {
    fn default() -> Self {
        Self::new(&SimulationConfig::default())
    }
}

impl CoolingSimulator {
    #[must_use]
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            max_reduction: config.max_reduction.max(0.0),
            reduction_per_tree: config.reduction_per_tree.max(0.0),
            canopy_area_per_tree: config.canopy_area_per_tree.max(0.0),
            zone_area: PI * config.zone_radius * config.zone_radius,
        }
    }

    /// Area of one heat island zone in m²
    #[must_use]
    pub fn zone_area(&self) -> f64 {
        self.zone_area
    }

    /// Reduction for a total number of planted trees
    #[must_use]
    pub fn reduction_for(&self, trees_planted: u64) -> f64 {
        self.max_reduction
            .min(trees_planted as f64 * self.reduction_per_tree)
    }

    /// Simulate planting `params.tree_count` trees per targeted zone
    #[must_use]
    pub fn simulate(&self, params: SimulationParameters, target: Target) -> CoolingImpact {
        let tree_count = u64::from(params.tree_count);
        let (trees_planted, reference_area) = match target {
            Target::Selected => (tree_count, self.zone_area),
            Target::All { island_count } => (
                tree_count * island_count as u64,
                self.zone_area * island_count as f64,
            ),
        };

        if trees_planted == 0 || reference_area <= 0.0 {
            return CoolingImpact::NONE;
        }

        let coverage =
            (trees_planted as f64 * self.canopy_area_per_tree / reference_area * 100.0).min(100.0);

        CoolingImpact {
            temperature_reduction_celsius: self.reduction_for(trees_planted),
            trees_planted,
            area_coverage_percent: coverage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn params(tree_count: u32) -> SimulationParameters {
        SimulationParameters { tree_count }
    }

    #[test]
    fn test_zero_trees() {
        let sim = CoolingSimulator::default();
        for target in [Target::Selected, Target::All { island_count: 8 }] {
            let impact = sim.simulate(params(0), target);
            assert_eq!(impact, CoolingImpact::NONE);
            assert_eq!(impact.format_reduction(), "-0.0°C");
            assert_eq!(impact.format_trees(), "0 trees");
            assert_eq!(impact.format_coverage(), "0.0%");
        }
    }

    #[test]
    fn test_all_islands_saturates() {
        let impact = CoolingSimulator::default().simulate(params(10), Target::All { island_count: 8 });
        assert_eq!(impact.trees_planted, 80);
        assert_eq!(impact.temperature_reduction_celsius, 5.0);
        assert_eq!(impact.format_reduction(), "-5.0°C");
        assert_eq!(impact.format_trees(), "80 trees");
    }

    #[test]
    fn test_selected_island() {
        let impact = CoolingSimulator::default().simulate(params(3), Target::Selected);
        assert_eq!(impact.trees_planted, 3);
        assert_eq!(impact.temperature_reduction_celsius, 5.0_f64.min(3.0 * 0.8));
        assert_eq!(impact.format_reduction(), "-2.4°C");
        assert_eq!(impact.format_trees(), "3 trees");
    }

    #[test]
    fn test_no_islands_does_not_divide_by_zero() {
        let impact = CoolingSimulator::default().simulate(params(25), Target::All { island_count: 0 });
        assert_eq!(impact, CoolingImpact::NONE);
    }

    #[test]
    fn test_coverage_value() {
        let sim = CoolingSimulator::default();
        let impact = sim.simulate(params(100), Target::Selected);
        let expected = 100.0 * 176.0 / sim.zone_area() * 100.0;
        assert!((impact.area_coverage_percent - expected).abs() < 1e-9);
        assert_eq!(impact.format_coverage(), "2.2%");
    }

    #[test]
    fn test_single_tree_wording() {
        let impact = CoolingSimulator::default().simulate(params(1), Target::Selected);
        assert_eq!(impact.format_trees(), "1 tree");
    }

    #[rstest]
    #[case(Target::Selected)]
    #[case(Target::All { island_count: 1 })]
    #[case(Target::All { island_count: 8 })]
    fn test_reduction_monotone_and_bounded(#[case] target: Target) {
        let sim = CoolingSimulator::default();
        let mut previous = 0.0;
        for n in (0..=20_000u32).step_by(7).chain([u32::MAX]) {
            let impact = sim.simulate(params(n), target);
            let expected = 5.0_f64.min(impact.trees_planted as f64 * 0.8);
            assert_eq!(impact.temperature_reduction_celsius, expected);
            assert!(impact.temperature_reduction_celsius >= previous);
            assert!(impact.temperature_reduction_celsius <= 5.0);
            assert!((0.0..=100.0).contains(&impact.area_coverage_percent));
            previous = impact.temperature_reduction_celsius;
        }
        assert_eq!(previous, 5.0);
    }
}
