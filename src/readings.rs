//! Community temperature readings kept in the local store

use crate::models::{CommunityReading, Coordinates};
use crate::store::LocalStore;
use crate::{CanopyError, Result};
use chrono::Utc;
use tracing::info;

/// Store key holding every submitted reading
pub const READINGS_KEY: &str = "canopy_readings";

/// Plausible range for a hand-entered air temperature
const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = -60.0..=70.0;

pub struct CommunityReadings<'a> {
    store: &'a LocalStore,
}

impl<'a> CommunityReadings<'a> {
    pub fn new(store: &'a LocalStore) -> Self {
        Self { store }
    }

    /// All readings, oldest first
    pub async fn list(&self) -> Result<Vec<CommunityReading>> {
        Ok(self
            .store
            .get::<Vec<CommunityReading>>(READINGS_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Validate and append a reading stamped with the current time
    pub async fn add(
        &self,
        coordinates: Coordinates,
        temperature_celsius: f64,
        notes: Option<String>,
    ) -> Result<CommunityReading> {
        coordinates.validate()?;
        if !TEMPERATURE_RANGE.contains(&temperature_celsius) {
            return Err(CanopyError::validation(format!(
                "Temperature {temperature_celsius}°C is outside the plausible range"
            )));
        }

        let reading = CommunityReading {
            coordinates,
            temperature_celsius,
            notes: notes.filter(|n| !n.trim().is_empty()),
            recorded_at: Utc::now(),
        };

        let mut readings = self.list().await?;
        readings.push(reading.clone());
        let total = readings.len();
        self.store.put(READINGS_KEY, readings).await?;

        info!(
            "Recorded {:.1}°C at {} ({} readings stored)",
            temperature_celsius, coordinates, total
        );
        Ok(reading)
    }

    /// Delete every stored reading, returning how many there were
    pub async fn clear(&self) -> Result<usize> {
        let count = self.list().await?.len();
        self.store.remove(READINGS_KEY).await?;
        info!("Cleared {} community readings", count);
        Ok(count)
    }
}
