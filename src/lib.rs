//! Canopy - urban heat island explorer
//!
//! This library samples temperatures across a city's regions, reduces each
//! region to its hottest point, and estimates how much planting trees would
//! cool those heat islands. A weather panel and a small local store for
//! community readings complete the session.

pub mod aggregator;
pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod panel;
pub mod readings;
pub mod simulator;
pub mod store;
pub mod telemetry;
pub mod view;

// Re-export core types for public API
pub use aggregator::HeatIslandAggregator;
pub use api::{WeatherApiClient, WeatherProvider};
pub use catalog::{Region, RegionCatalog, SamplePoint};
pub use config::CanopyConfig;
pub use error::{CanopyError, ErrorCode};
pub use fetcher::{FallbackPolicy, TemperatureFetcher};
pub use models::{Coordinates, HeatIsland, TemperatureReading};
pub use panel::{Debouncer, PanelView, WeatherPanel};
pub use readings::CommunityReadings;
pub use simulator::{CoolingImpact, CoolingSimulator, SimulationParameters};
pub use store::LocalStore;
pub use view::{ViewMode, ViewStateController};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, CanopyError>;
