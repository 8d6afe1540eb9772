//! Heat-island aggregation
//!
//! Fetches a reading for every sample point in the catalog and keeps the
//! hottest reading of each region as that region's heat island. Fetches run
//! with bounded concurrency; results are consumed in catalog order so the
//! first of several equally hot readings always wins.

use crate::api::WeatherProvider;
use crate::catalog::RegionCatalog;
use crate::fetcher::TemperatureFetcher;
use crate::models::{HeatIsland, TemperatureReading};
use futures::stream::{self, Stream, StreamExt};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, instrument, warn};

/// Pick the reading with the strictly highest temperature, first one on ties
#[must_use]
pub fn select_hottest<I>(readings: I) -> Option<TemperatureReading>
where
    I: IntoIterator<Item = TemperatureReading>,
{
    readings.into_iter().fold(None, |hottest, reading| match hottest {
        Some(current) if reading.temperature_celsius <= current.temperature_celsius => {
            Some(current)
        }
        _ => Some(reading),
    })
}

/// Runs one full aggregation pass over a catalog
pub struct HeatIslandAggregator<P> {
    fetcher: TemperatureFetcher<P>,
    max_concurrent_requests: usize,
}

impl<P: WeatherProvider> HeatIslandAggregator<P> {
    pub fn new(fetcher: TemperatureFetcher<P>, max_concurrent_requests: usize) -> Self {
        Self {
            fetcher,
            max_concurrent_requests: max_concurrent_requests.max(1),
        }
    }

    #[must_use]
    pub fn fetcher(&self) -> &TemperatureFetcher<P> {
        &self.fetcher
    }

    /// Fetch every sample point and reduce each region to its heat island.
    ///
    /// Returns once all regions are processed. Regions without a single
    /// successful reading are left out; failures never escape.
    #[instrument(skip_all, fields(regions = catalog.len(), points = catalog.point_count()))]
    pub async fn aggregate(&self, catalog: &RegionCatalog) -> Vec<HeatIsland> {
        let start_time = Instant::now();

        let jobs = catalog
            .regions()
            .iter()
            .enumerate()
            .flat_map(|(index, region)| {
                region
                    .points
                    .iter()
                    .map(move |point| (index, region.name.as_str(), *point))
            });

        let fetched: Vec<(usize, Option<TemperatureReading>)> = stream::iter(jobs)
            .map(|(index, name, point)| async move {
                (index, self.fetcher.fetch_or_fallback(point, name).await)
            })
            .buffered(self.max_concurrent_requests)
            .collect()
            .await;

        let mut per_region: Vec<Vec<TemperatureReading>> = vec![Vec::new(); catalog.len()];
        let mut missing = 0usize;
        for (index, reading) in fetched {
            match reading {
                Some(reading) => per_region[index].push(reading),
                None => missing += 1,
            }
        }

        let islands: Vec<HeatIsland> = catalog
            .regions()
            .iter()
            .zip(per_region)
            .filter_map(|(region, readings)| match select_hottest(readings) {
                Some(hottest) => Some(HeatIsland::from_reading(hottest)),
                None => {
                    warn!("No readings for region {}, skipping", region.name);
                    None
                }
            })
            .collect();

        info!(
            "Aggregated {} heat islands from {} regions in {:.3}s ({} points without data)",
            islands.len(),
            catalog.len(),
            start_time.elapsed().as_secs_f64(),
            missing
        );

        islands
    }

    /// Aggregate now and then once every `every`; each item is a complete
    /// replacement set. A slow pass delays the next one instead of bursting.
    pub fn watch<'a>(
        &'a self,
        catalog: &'a RegionCatalog,
        every: Duration,
    ) -> impl Stream<Item = Vec<HeatIsland>> + 'a {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        stream::unfold(interval, move |mut interval| async move {
            interval.tick().await;
            Some((self.aggregate(catalog).await, interval))
        })
    }
}
