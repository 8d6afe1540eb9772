//! Weather provider client
//!
//! HTTP client for an OpenWeatherMap-compatible API: current conditions,
//! short-horizon forecast and air pollution by coordinate. All requests made
//! through one client share a sliding-window rate limiter, and transient
//! failures are retried by the `reqwest-retry` middleware.

use crate::config::WeatherConfig;
use crate::models::openweather::{AirPollutionResponse, CurrentResponse, ForecastResponse};
use crate::models::{AirQuality, Coordinates, CurrentConditions, ForecastEntry};
use crate::{CanopyError, ErrorCode, Result};
use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Source of weather data for a coordinate
///
/// Implemented by [`WeatherApiClient`] for the real provider; tests supply
/// in-memory implementations.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Current conditions at a point
    async fn current_conditions(&self, at: Coordinates) -> Result<CurrentConditions>;

    /// Up to `steps` forecast entries for a point
    async fn forecast(&self, at: Coordinates, steps: u32) -> Result<Vec<ForecastEntry>>;

    /// Air quality index for a point
    async fn air_quality(&self, at: Coordinates) -> Result<AirQuality>;
}

#[async_trait]
impl<P: WeatherProvider + ?Sized> WeatherProvider for Arc<P> {
    async fn current_conditions(&self, at: Coordinates) -> Result<CurrentConditions> {
        (**self).current_conditions(at).await
    }

    async fn forecast(&self, at: Coordinates, steps: u32) -> Result<Vec<ForecastEntry>> {
        (**self).forecast(at, steps).await
    }

    async fn air_quality(&self, at: Coordinates) -> Result<AirQuality> {
        (**self).air_quality(at).await
    }
}

/// Sliding-window rate limiter for API requests
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum requests per window
    max_requests: u32,
    /// Window length
    window: Duration,
    /// Request timestamps within the current window
    request_times: Vec<Instant>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_requests_per_minute` requests per minute
    pub fn new(max_requests_per_minute: u32) -> Self {
        Self::with_window(max_requests_per_minute, Duration::from_secs(60))
    }

    pub fn with_window(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            request_times: Vec::new(),
        }
    }

    /// Check if a request is allowed and record it
    pub fn allow_request(&mut self) -> bool {
        self.cleanup_old_requests();

        if self.request_times.len() >= self.max_requests as usize {
            false
        } else {
            self.request_times.push(Instant::now());
            true
        }
    }

    /// Get time until next request is allowed
    pub fn time_until_next_request(&mut self) -> Duration {
        self.cleanup_old_requests();

        if self.request_times.len() < self.max_requests as usize {
            return Duration::ZERO;
        }

        self.request_times
            .first()
            .map_or(Duration::ZERO, |oldest| {
                self.window.saturating_sub(oldest.elapsed())
            })
    }

    /// Remove requests older than the window
    fn cleanup_old_requests(&mut self) {
        let window = self.window;
        self.request_times.retain(|time| time.elapsed() < window);
    }
}

/// Rate limiter shared by every request issued through one client
#[derive(Debug, Clone)]
pub struct SharedRateLimiter {
    inner: Arc<Mutex<RateLimiter>>,
}

impl SharedRateLimiter {
    pub fn new(limiter: RateLimiter) -> Self {
        Self {
            inner: Arc::new(Mutex::new(limiter)),
        }
    }

    /// Wait until the limiter admits one more request
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut limiter = self.inner.lock().await;
                if limiter.allow_request() {
                    return;
                }
                limiter.time_until_next_request()
            };
            debug!("Rate limit reached, waiting {:.1}s", wait.as_secs_f64());
            tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
        }
    }
}

/// Weather API client for OpenWeatherMap
pub struct WeatherApiClient {
    /// HTTP client with retry middleware
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
    rate_limiter: SharedRateLimiter,
}

impl WeatherApiClient {
    /// Create a new weather API client
    pub fn new(config: &WeatherConfig, api_key: impl Into<String>) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds.into());

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("canopy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CanopyError::config(format!("Failed to create HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            rate_limiter: SharedRateLimiter::new(RateLimiter::new(config.requests_per_minute)),
        })
    }

    /// Issue a rate-limited GET and decode the JSON body
    #[instrument(skip(self, query))]
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        at: Coordinates,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.rate_limiter.acquire().await;

        let mut url = format!(
            "{}/{}?lat={}&lon={}&appid={}",
            self.base_url,
            endpoint,
            at.latitude,
            at.longitude,
            urlencoding::encode(&self.api_key)
        );
        for (key, value) in query {
            url.push_str(&format!("&{}={}", key, urlencoding::encode(value)));
        }
        let start_time = Instant::now();
        debug!("GET {}/{} for {}", self.base_url, endpoint, at);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| {
                warn!("Network error calling {}: {}", endpoint, e);
                CanopyError::api_with_context(
                    format!("Network error: {e}"),
                    ErrorCode::ApiNetworkError,
                    HashMap::from([("coordinates".to_string(), at.format_coordinates())]),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let code = match status.as_u16() {
                401 => ErrorCode::ApiUnauthorized,
                404 => ErrorCode::ApiNotFound,
                429 => ErrorCode::ApiRateLimit,
                _ => ErrorCode::ApiNetworkError,
            };
            warn!("HTTP {} from {}", status, endpoint);
            return Err(CanopyError::api_with_context(
                format!(
                    "API request failed with status: {} - {}",
                    status,
                    status.canonical_reason().unwrap_or("Unknown error")
                ),
                code,
                HashMap::from([
                    ("status_code".to_string(), status.as_u16().to_string()),
                    ("coordinates".to_string(), at.format_coordinates()),
                ]),
            ));
        }

        let body = response.json::<T>().await.map_err(|e| {
            error!("Failed to parse {} response: {}", endpoint, e);
            CanopyError::api_with_context(
                "Invalid data received from weather provider",
                ErrorCode::ApiInvalidResponse,
                HashMap::from([("coordinates".to_string(), at.format_coordinates())]),
            )
        })?;

        let elapsed = start_time.elapsed();
        if elapsed.as_secs() > 5 {
            warn!("Slow API response detected: {:.3}s", elapsed.as_secs_f64());
        } else {
            debug!("{} answered in {:.3}s", endpoint, elapsed.as_secs_f64());
        }

        Ok(body)
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiClient {
    async fn current_conditions(&self, at: Coordinates) -> Result<CurrentConditions> {
        let response: CurrentResponse = self
            .get_json("weather", at, &[("units", "metric".to_string())])
            .await?;
        Ok(CurrentConditions::from(response))
    }

    async fn forecast(&self, at: Coordinates, steps: u32) -> Result<Vec<ForecastEntry>> {
        let response: ForecastResponse = self
            .get_json(
                "forecast",
                at,
                &[
                    ("units", "metric".to_string()),
                    ("cnt", steps.to_string()),
                ],
            )
            .await?;
        let entries = response.into_entries(steps as usize);
        info!("Retrieved {} forecast steps for {}", entries.len(), at);
        Ok(entries)
    }

    async fn air_quality(&self, at: Coordinates) -> Result<AirQuality> {
        let response: AirPollutionResponse = self.get_json("air_pollution", at, &[]).await?;
        response.air_quality().ok_or_else(|| {
            CanopyError::api(
                "No air quality index in provider response",
                ErrorCode::ApiInvalidResponse,
            )
        })
    }
}
