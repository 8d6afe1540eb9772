//! Configuration management for the canopy application
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::CanopyError;
use crate::fetcher::FallbackPolicy;
use crate::models::Coordinates;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for the canopy application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanopyConfig {
    /// Weather provider configuration
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Local store configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Cooling simulation constants
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Heat island aggregation settings
    #[serde(default)]
    pub aggregation: AggregationConfig,
    /// Weather panel settings
    #[serde(default)]
    pub panel: PanelConfig,
    /// Initial map view
    #[serde(default)]
    pub map: MapConfig,
}

/// Weather provider configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Provider API key, required for any network command
    pub api_key: Option<String>,
    /// Base URL for the provider API
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_weather_timeout")]
    pub timeout_seconds: u32,
    /// Retries for transient failures
    #[serde(default)]
    pub max_retries: u32,
    /// Shared request budget per minute
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Sample fetches in flight at once during aggregation
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    /// What to do with a sample point whose fetch failed
    #[serde(default)]
    pub fallback_policy: FallbackPolicy,
    /// Temperature used by the `substitute` policy
    #[serde(default = "default_fallback_temperature")]
    pub fallback_temperature: f64,
}

/// Local store configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store directory location
    #[serde(default = "default_store_location")]
    pub location: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// OTLP/HTTP endpoint for trace export, disabled when unset
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

/// Constants of the cooling impact model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Upper bound on the temperature reduction in °C
    #[serde(default = "default_max_reduction")]
    pub max_reduction: f64,
    /// Reduction contributed by one tree in °C
    #[serde(default = "default_reduction_per_tree")]
    pub reduction_per_tree: f64,
    /// Canopy footprint of one mature tree in m²
    #[serde(default = "default_canopy_area_per_tree")]
    pub canopy_area_per_tree: f64,
    /// Radius of one heat island zone in metres
    #[serde(default = "default_zone_radius")]
    pub zone_radius: f64,
}

/// Heat island aggregation settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AggregationConfig {
    /// Re-run interval for `islands --watch`; 0 runs once
    #[serde(default)]
    pub refresh_minutes: u32,
    /// JSON catalog replacing the built-in regions
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

/// Weather panel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Quiet period after the last map move before refreshing
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Number of forecast steps shown
    #[serde(default = "default_forecast_steps")]
    pub forecast_steps: u32,
}

/// Initial map view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_center_latitude")]
    pub center_latitude: f64,
    #[serde(default = "default_center_longitude")]
    pub center_longitude: f64,
}

// Default value functions
fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_weather_timeout() -> u32 {
    30
}

fn default_requests_per_minute() -> u32 {
    60
}

fn default_max_concurrent_requests() -> usize {
    4
}

fn default_fallback_temperature() -> f64 {
    22.0
}

fn default_store_location() -> String {
    dirs::data_local_dir()
        .map(|dir| dir.join("canopy").to_string_lossy().into_owned())
        .unwrap_or_else(|| ".canopy".to_string())
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_max_reduction() -> f64 {
    5.0
}

fn default_reduction_per_tree() -> f64 {
    0.8
}

fn default_canopy_area_per_tree() -> f64 {
    176.0
}

fn default_zone_radius() -> f64 {
    500.0
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_forecast_steps() -> u32 {
    5
}

fn default_center_latitude() -> f64 {
    -33.8688
}

fn default_center_longitude() -> f64 {
    151.2093
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            timeout_seconds: default_weather_timeout(),
            max_retries: 0,
            requests_per_minute: default_requests_per_minute(),
            max_concurrent_requests: default_max_concurrent_requests(),
            fallback_policy: FallbackPolicy::default(),
            fallback_temperature: default_fallback_temperature(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: default_store_location(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_reduction: default_max_reduction(),
            reduction_per_tree: default_reduction_per_tree(),
            canopy_area_per_tree: default_canopy_area_per_tree(),
            zone_radius: default_zone_radius(),
        }
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            forecast_steps: default_forecast_steps(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_latitude: default_center_latitude(),
            center_longitude: default_center_longitude(),
        }
    }
}

impl Default for CanopyConfig {
    fn default() -> Self {
        Self {
            weather: WeatherConfig::default(),
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
            simulation: SimulationConfig::default(),
            aggregation: AggregationConfig::default(),
            panel: PanelConfig::default(),
            map: MapConfig::default(),
        }
    }
}

impl PanelConfig {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl MapConfig {
    #[must_use]
    pub fn center(&self) -> Coordinates {
        Coordinates::new(self.center_latitude, self.center_longitude)
    }
}

impl CanopyConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // CANOPY_WEATHER__API_KEY=... overrides weather.api_key
        builder = builder.add_source(
            Environment::with_prefix("CANOPY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: CanopyConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("canopy").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_weather_timeout();
        }
        if self.weather.requests_per_minute == 0 {
            self.weather.requests_per_minute = default_requests_per_minute();
        }
        if self.weather.max_concurrent_requests == 0 {
            self.weather.max_concurrent_requests = default_max_concurrent_requests();
        }
        if self.store.location.is_empty() {
            self.store.location = default_store_location();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.panel.forecast_steps == 0 {
            self.panel.forecast_steps = default_forecast_steps();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate the API key if one is configured
    pub fn validate_api_keys(&self) -> Result<()> {
        if let Some(api_key) = &self.weather.api_key {
            if api_key.is_empty() {
                return Err(CanopyError::config(
                    "Weather API key cannot be empty if provided. Either remove it or provide a valid key.",
                )
                .into());
            }

            if api_key.len() < 8 {
                return Err(CanopyError::config(
                    "Weather API key appears to be invalid (too short). Please check your API key.",
                )
                .into());
            }

            if api_key.len() > 100 {
                return Err(CanopyError::config(
                    "Weather API key appears to be invalid (too long). Please check your API key.",
                )
                .into());
            }
        }

        Ok(())
    }

    /// Require an API key for commands that talk to the provider
    pub fn require_api_key(&self) -> Result<&str> {
        self.weather.api_key.as_deref().ok_or_else(|| {
            CanopyError::config(
                "A weather API key is required. Set weather.api_key or CANOPY_WEATHER__API_KEY.",
            )
            .into()
        })
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.weather.timeout_seconds > 300 {
            return Err(
                CanopyError::config("Weather API timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.weather.max_retries > 10 {
            return Err(CanopyError::config("Weather API max retries cannot exceed 10").into());
        }

        if self.weather.max_concurrent_requests > 32 {
            return Err(CanopyError::config(
                "Weather API max concurrent requests cannot exceed 32",
            )
            .into());
        }

        if !(-60.0..=60.0).contains(&self.weather.fallback_temperature) {
            return Err(CanopyError::config(
                "Fallback temperature must be between -60 and 60 °C",
            )
            .into());
        }

        let sim = &self.simulation;
        if sim.max_reduction < 0.0 || sim.reduction_per_tree < 0.0 {
            return Err(CanopyError::config("Cooling constants cannot be negative").into());
        }

        if sim.canopy_area_per_tree <= 0.0 || sim.zone_radius <= 0.0 {
            return Err(
                CanopyError::config("Canopy area and zone radius must be positive").into(),
            );
        }

        if self.panel.forecast_steps > 40 {
            return Err(CanopyError::config("Forecast steps cannot exceed 40").into());
        }

        if self.aggregation.refresh_minutes > 24 * 60 {
            return Err(
                CanopyError::config("Aggregation refresh cannot exceed 24 hours").into(),
            );
        }

        self.map
            .center()
            .validate()
            .map_err(|e| CanopyError::config(format!("Invalid map center: {e}")))?;

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(CanopyError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(CanopyError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.weather.base_url.starts_with("http://")
            && !self.weather.base_url.starts_with("https://")
        {
            return Err(CanopyError::config(
                "Weather API base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        Ok(())
    }
}
