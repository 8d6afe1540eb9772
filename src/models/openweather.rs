//! OpenWeatherMap API response structures and conversion utilities

use super::{AirQuality, CurrentConditions, ForecastEntry};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Response of the `/weather` endpoint
#[derive(Debug, Deserialize)]
pub struct CurrentResponse {
    #[serde(default)]
    pub weather: Vec<Condition>,
    pub main: Option<MainBlock>,
    pub name: Option<String>,
}

/// Weather condition descriptor
#[derive(Debug, Deserialize)]
pub struct Condition {
    pub id: Option<u32>,
    pub main: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

/// Thermodynamic block shared by current and forecast responses
#[derive(Debug, Deserialize, Default)]
pub struct MainBlock {
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub humidity: Option<f64>,
}

/// Response of the `/forecast` endpoint
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub list: Vec<ForecastItem>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastItem {
    /// Unix timestamp (seconds)
    pub dt: i64,
    #[serde(default)]
    pub main: MainBlock,
    #[serde(default)]
    pub weather: Vec<Condition>,
}

/// Response of the `/air_pollution` endpoint
#[derive(Debug, Deserialize)]
pub struct AirPollutionResponse {
    #[serde(default)]
    pub list: Vec<AirPollutionItem>,
}

#[derive(Debug, Deserialize)]
pub struct AirPollutionItem {
    pub main: AirPollutionMain,
}

#[derive(Debug, Deserialize)]
pub struct AirPollutionMain {
    pub aqi: u8,
}

fn describe(conditions: &[Condition]) -> (String, Option<String>) {
    conditions.first().map_or_else(
        || ("Unknown".to_string(), None),
        |c| {
            let description = c
                .description
                .clone()
                .or_else(|| c.main.clone())
                .unwrap_or_else(|| "Unknown".to_string());
            (description, c.icon.clone())
        },
    )
}

fn humidity_percent(value: Option<f64>) -> Option<u8> {
    value.map(|h| h.round().clamp(0.0, 100.0) as u8)
}

impl From<CurrentResponse> for CurrentConditions {
    fn from(response: CurrentResponse) -> Self {
        let (description, icon) = describe(&response.weather);
        let main = response.main.unwrap_or_default();
        Self {
            temperature: main.temp,
            feels_like: main.feels_like,
            humidity: humidity_percent(main.humidity),
            description,
            icon,
        }
    }
}

impl ForecastResponse {
    /// Convert to forecast entries, skipping steps without a temperature
    #[must_use]
    pub fn into_entries(self, steps: usize) -> Vec<ForecastEntry> {
        self.list
            .into_iter()
            .filter_map(|item| {
                let temperature = item.main.temp?;
                let timestamp = DateTime::<Utc>::from_timestamp(item.dt, 0)?;
                let (description, icon) = describe(&item.weather);
                Some(ForecastEntry {
                    timestamp,
                    temperature,
                    description,
                    icon,
                })
            })
            .take(steps)
            .collect()
    }
}

impl AirPollutionResponse {
    #[must_use]
    pub fn air_quality(&self) -> Option<AirQuality> {
        self.list
            .first()
            .map(|item| AirQuality::new(item.main.aqi))
            .filter(|aqi| (1..=5).contains(&aqi.index))
    }
}
