//! Data models for the canopy application
//!
//! This module contains the core domain models organized by concern:
//! - Location: Geographic coordinates
//! - Reading: Temperature readings, heat islands and community readings
//! - Weather: Current conditions, forecast steps and air quality
//! - OpenWeather: provider response types

pub mod location;
pub mod openweather;
pub mod reading;
pub mod weather;

// Re-export all public types for convenient access
pub use location::Coordinates;
pub use reading::{CommunityReading, HeatIsland, TemperatureBand, TemperatureReading};
pub use weather::{AirQuality, CurrentConditions, ForecastEntry, UNAVAILABLE};
