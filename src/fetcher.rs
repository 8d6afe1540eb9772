//! Temperature fetcher
//!
//! Turns one current-conditions request into a [`TemperatureReading`] and
//! applies the configured policy when the request fails.

use crate::api::WeatherProvider;
use crate::catalog::SamplePoint;
use crate::config::WeatherConfig;
use crate::models::{CurrentConditions, TemperatureReading};
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Temperature assumed when the provider omits it
pub const DEFAULT_TEMPERATURE_CELSIUS: f64 = 20.0;
/// Humidity assumed when the provider omits it
pub const DEFAULT_HUMIDITY_PERCENT: u8 = 50;

/// Handling of a sample point whose fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Drop the point from the aggregation
    #[default]
    Omit,
    /// Use a reading at the fallback temperature
    Substitute,
}

/// Build a reading from provider data, filling omitted fields with defaults
#[must_use]
pub fn normalize(
    point: SamplePoint,
    region_name: &str,
    conditions: &CurrentConditions,
) -> TemperatureReading {
    TemperatureReading {
        latitude: point.latitude,
        longitude: point.longitude,
        temperature_celsius: conditions.temperature.unwrap_or(DEFAULT_TEMPERATURE_CELSIUS),
        feels_like_celsius: conditions.feels_like.unwrap_or(DEFAULT_TEMPERATURE_CELSIUS),
        humidity_percent: conditions.humidity.unwrap_or(DEFAULT_HUMIDITY_PERCENT),
        region_name: region_name.to_string(),
    }
}

/// Fetches one reading per sample point
#[derive(Debug, Clone)]
pub struct TemperatureFetcher<P> {
    provider: P,
    policy: FallbackPolicy,
    fallback_temperature: f64,
}

impl<P: WeatherProvider> TemperatureFetcher<P> {
    pub fn new(provider: P, policy: FallbackPolicy, fallback_temperature: f64) -> Self {
        Self {
            provider,
            policy,
            fallback_temperature,
        }
    }

    pub fn from_config(provider: P, config: &WeatherConfig) -> Self {
        Self::new(provider, config.fallback_policy, config.fallback_temperature)
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    #[must_use]
    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Request current conditions for a point; fails on network or HTTP errors
    pub async fn fetch(&self, point: SamplePoint, region_name: &str) -> Result<TemperatureReading> {
        let conditions = self.provider.current_conditions(point.coordinates()).await?;
        let reading = normalize(point, region_name, &conditions);
        debug!(
            "{} ({:.4}, {:.4}): {:.1}°C",
            region_name, point.latitude, point.longitude, reading.temperature_celsius
        );
        Ok(reading)
    }

    /// Fetch a point and absorb failure according to the fallback policy
    pub async fn fetch_or_fallback(
        &self,
        point: SamplePoint,
        region_name: &str,
    ) -> Option<TemperatureReading> {
        match self.fetch(point, region_name).await {
            Ok(reading) => Some(reading),
            Err(e) => {
                warn!(
                    "Failed to fetch temperature for {} ({:.4}, {:.4}): {}",
                    region_name, point.latitude, point.longitude, e
                );
                match self.policy {
                    FallbackPolicy::Omit => None,
                    FallbackPolicy::Substitute => Some(TemperatureReading {
                        latitude: point.latitude,
                        longitude: point.longitude,
                        temperature_celsius: self.fallback_temperature,
                        feels_like_celsius: self.fallback_temperature,
                        humidity_percent: DEFAULT_HUMIDITY_PERCENT,
                        region_name: region_name.to_string(),
                    }),
                }
            }
        }
    }
}
