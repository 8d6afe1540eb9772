//! Weather panel for the current map centre
//!
//! A refresh requests current conditions, a short forecast and the air
//! quality index at once. Each section fails on its own and renders as
//! `unavailable` without affecting the others. Map moves are debounced so
//! only the last of a burst triggers a refresh.

use crate::api::WeatherProvider;
use crate::config::PanelConfig;
use crate::models::{AirQuality, Coordinates, CurrentConditions, ForecastEntry, UNAVAILABLE};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

/// Everything the panel shows for one centre; `None` marks a failed section
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub center: Coordinates,
    pub current: Option<CurrentConditions>,
    pub forecast: Option<Vec<ForecastEntry>>,
    pub air_quality: Option<AirQuality>,
}

impl PanelView {
    /// Text lines for the panel
    #[must_use]
    pub fn render_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Weather at {}", self.center)];

        match &self.current {
            Some(current) => {
                lines.push(format!(
                    "Now: {} (feels like {}), humidity {}",
                    current.format_temperature(),
                    current.format_feels_like(),
                    current.format_humidity()
                ));
                if !current.description.is_empty() {
                    lines.push(format!("Conditions: {}", current.description));
                }
            }
            None => lines.push(format!("Now: {UNAVAILABLE}")),
        }

        match &self.forecast {
            Some(entries) if !entries.is_empty() => {
                lines.push("Forecast:".to_string());
                lines.extend(entries.iter().map(|e| format!("  {}", e.format_line())));
            }
            _ => lines.push(format!("Forecast: {UNAVAILABLE}")),
        }

        match self.air_quality {
            Some(aqi) => lines.push(format!("Air quality: {} ({})", aqi.label(), aqi.index)),
            None => lines.push(format!("Air quality: {UNAVAILABLE}")),
        }

        lines
    }
}

pub struct WeatherPanel<P> {
    provider: P,
    forecast_steps: u32,
}

impl<P: WeatherProvider> WeatherPanel<P> {
    pub fn new(provider: P, config: &PanelConfig) -> Self {
        Self {
            provider,
            forecast_steps: config.forecast_steps.max(1),
        }
    }

    /// Fetch all three sections for `center`; never fails as a whole
    #[instrument(skip(self))]
    pub async fn refresh(&self, center: Coordinates) -> PanelView {
        let (current, forecast, air_quality) = futures::join!(
            self.provider.current_conditions(center),
            self.provider.forecast(center, self.forecast_steps),
            self.provider.air_quality(center),
        );

        PanelView {
            center,
            current: current
                .inspect_err(|e| warn!("Current conditions unavailable: {}", e))
                .ok(),
            forecast: forecast
                .inspect_err(|e| warn!("Forecast unavailable: {}", e))
                .ok(),
            air_quality: air_quality
                .inspect_err(|e| warn!("Air quality unavailable: {}", e))
                .ok(),
        }
    }
}

/// Runs only the most recent of a burst of triggers, after a quiet period
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub fn from_config(config: &PanelConfig) -> Self {
        Self::new(config.debounce())
    }

    /// Claim the latest slot now and return a future that waits out the
    /// quiet period, then runs `action` unless a newer trigger arrived.
    /// Resolves to `None` when superseded.
    pub fn debounced<F, Fut>(
        &self,
        action: F,
    ) -> impl Future<Output = Option<Fut::Output>> + Send + use<F, Fut>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.generation);
        let delay = self.delay;

        async move {
            tokio::time::sleep(delay).await;
            if latest.load(Ordering::SeqCst) != generation {
                debug!("Trigger {} superseded", generation);
                return None;
            }
            Some(action().await)
        }
    }

    /// Spawn [`Debouncer::debounced`] onto the runtime
    pub fn trigger<F, Fut>(&self, action: F) -> JoinHandle<Option<Fut::Output>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        tokio::spawn(self.debounced(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CanopyError, ErrorCode, Result};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use std::sync::atomic::AtomicUsize;
    use tokio::task::JoinSet;

    struct StubProvider {
        current_ok: bool,
        forecast_ok: bool,
        aqi: Option<u8>,
    }

    #[async_trait]
    impl WeatherProvider for StubProvider {
        async fn current_conditions(&self, _at: Coordinates) -> Result<CurrentConditions> {
            if self.current_ok {
                Ok(CurrentConditions {
                    temperature: Some(24.3),
                    feels_like: Some(25.0),
                    humidity: Some(61),
                    description: "scattered clouds".to_string(),
                    icon: Some("03d".to_string()),
                })
            } else {
                Err(CanopyError::api("timeout", ErrorCode::ApiNetworkError))
            }
        }

        async fn forecast(&self, _at: Coordinates, steps: u32) -> Result<Vec<ForecastEntry>> {
            if !self.forecast_ok {
                return Err(CanopyError::api("HTTP 500", ErrorCode::ApiNetworkError));
            }
            Ok((0..steps)
                .map(|i| ForecastEntry {
                    timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
                        + chrono::Duration::hours(3 * i64::from(i)),
                    temperature: 26.0 + f64::from(i),
                    description: "clear sky".to_string(),
                    icon: None,
                })
                .collect())
        }

        async fn air_quality(&self, _at: Coordinates) -> Result<AirQuality> {
            self.aqi
                .map(AirQuality::new)
                .ok_or_else(|| CanopyError::api("HTTP 404", ErrorCode::ApiNotFound))
        }
    }

    const CENTER: Coordinates = Coordinates {
        latitude: -33.8688,
        longitude: 151.2093,
    };

    #[tokio::test]
    async fn test_refresh_all_sections() {
        let panel = WeatherPanel::new(
            StubProvider {
                current_ok: true,
                forecast_ok: true,
                aqi: Some(2),
            },
            &PanelConfig::default(),
        );
        let view = panel.refresh(CENTER).await;
        assert_eq!(view.forecast.as_ref().unwrap().len(), 5);

        let lines = view.render_lines();
        assert_eq!(lines[0], "Weather at -33.8688, 151.2093");
        assert_eq!(lines[1], "Now: 24.3°C (feels like 25.0°C), humidity 61%");
        assert_eq!(lines[3], "Forecast:");
        assert_eq!(lines[4], "  Mon 12:00  26.0°C  clear sky");
        assert_eq!(lines.last().unwrap(), "Air quality: Fair (2)");
    }

    #[tokio::test]
    async fn test_sections_fail_independently() {
        let panel = WeatherPanel::new(
            StubProvider {
                current_ok: false,
                forecast_ok: true,
                aqi: None,
            },
            &PanelConfig::default(),
        );
        let view = panel.refresh(CENTER).await;
        assert!(view.current.is_none());
        assert!(view.forecast.is_some());

        let lines = view.render_lines();
        assert_eq!(lines[1], "Now: unavailable");
        assert_eq!(lines.last().unwrap(), "Air quality: unavailable");
    }

    #[tokio::test]
    async fn test_everything_unavailable() {
        let panel = WeatherPanel::new(
            StubProvider {
                current_ok: false,
                forecast_ok: false,
                aqi: None,
            },
            &PanelConfig::default(),
        );
        let lines = panel.refresh(CENTER).await.render_lines();
        assert_eq!(
            lines[1..],
            [
                "Now: unavailable",
                "Forecast: unavailable",
                "Air quality: unavailable"
            ]
        );
    }

    #[rstest]
    #[case(1, "Good")]
    #[case(3, "Moderate")]
    #[case(5, "Very Poor")]
    #[tokio::test]
    async fn test_air_quality_labels(#[case] index: u8, #[case] label: &str) {
        let panel = WeatherPanel::new(
            StubProvider {
                current_ok: true,
                forecast_ok: true,
                aqi: Some(index),
            },
            &PanelConfig::default(),
        );
        let lines = panel.refresh(CENTER).await.render_lines();
        assert_eq!(
            lines.last().unwrap(),
            &format!("Air quality: {label} ({index})")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_fires_only_latest() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let fired = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..5u32 {
            let fired = Arc::clone(&fired);
            handles.push(debouncer.trigger(move || async move {
                fired.fetch_add(1, Ordering::SeqCst);
                i
            }));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        assert_eq!(results, vec![None, None, None, None, Some(4)]);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_draining_join_set_completes_fired_refresh() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let completed = Arc::new(AtomicUsize::new(0));
        let mut refreshes = JoinSet::new();

        // First move fires, then a slow fetch is still running when the
        // second, later move arrives
        for i in 0..2u32 {
            let completed = Arc::clone(&completed);
            refreshes.spawn(debouncer.debounced(move || async move {
                tokio::time::sleep(Duration::from_secs(2)).await;
                completed.fetch_add(1, Ordering::SeqCst);
                i
            }));
            tokio::time::sleep(Duration::from_millis(600)).await;
        }

        let mut fired = Vec::new();
        while let Some(result) = refreshes.join_next().await {
            if let Some(i) = result.unwrap() {
                fired.push(i);
            }
        }
        fired.sort_unstable();
        assert_eq!(fired, vec![0, 1]);
        assert_eq!(completed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_spaced_triggers_all_fire() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let first = debouncer.trigger(|| async { "first" });
        tokio::time::sleep(Duration::from_millis(600)).await;
        let second = debouncer.trigger(|| async { "second" });

        assert_eq!(first.await.unwrap(), Some("first"));
        assert_eq!(second.await.unwrap(), Some("second"));
    }
}
