use anyhow::Result;
use canopy::config::CanopyConfig;
use canopy::models::Coordinates;
use canopy::{
    CanopyError, CommunityReadings, CoolingSimulator, Debouncer, HeatIslandAggregator, LocalStore,
    RegionCatalog, TemperatureFetcher, ViewMode, ViewStateController, WeatherApiClient,
    WeatherPanel, telemetry,
};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::path::PathBuf;
use std::pin::pin;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{info, warn};

const ONBOARDING: &str = "\
Welcome to Canopy!
  canopy islands              find the hottest spot in each region
  canopy simulate --trees 10  estimate the cooling from planting trees
  canopy weather              current weather, forecast and air quality
A weather API key is required for these: set weather.api_key in the config
file or CANOPY_WEATHER__API_KEY.
";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the regions and their sample points
    Regions,
    /// Aggregate heat islands and print them with insights
    Islands {
        /// Re-run every `aggregation.refresh_minutes`
        #[arg(long)]
        watch: bool,
    },
    /// Estimate the cooling impact of planting trees
    Simulate {
        /// Trees planted per heat island zone
        #[arg(long)]
        trees: u32,
        /// Plant only in this region's heat island
        #[arg(long)]
        select: Option<String>,
    },
    /// Show the weather panel for a point
    Weather {
        /// "lat,lon"; defaults to the configured map centre
        #[arg(long, allow_hyphen_values = true)]
        at: Option<Coordinates>,
    },
    /// Refresh the weather panel for "lat,lon" map moves read from stdin
    Track,
    /// Community temperature readings
    Readings {
        #[command(subcommand)]
        action: ReadingsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ReadingsCommand {
    /// Record a reading
    Add {
        #[arg(long, allow_hyphen_values = true)]
        at: Coordinates,
        /// Temperature in °C
        #[arg(long, allow_hyphen_values = true)]
        temp: f64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List recorded readings
    List,
    /// Delete all recorded readings
    Clear,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<CanopyError>() {
                Some(err) => eprintln!("Error: {}", err.user_message()),
                None => eprintln!("Error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = CanopyConfig::load_from_path(cli.config)?;
    let _telemetry = telemetry::init_tracing(&config.logging, cli.verbose)?;

    let store = LocalStore::open(&config.store.location);
    onboarding(&store, &config).await;
    // Only `readings` keeps the store, and with it the directory lock, open
    let store = matches!(cli.command, Commands::Readings { .. }).then_some(store);

    match cli.command {
        Commands::Regions => {
            let catalog = load_catalog(&config)?;
            for region in catalog.regions() {
                println!("{} ({} points)", region.name, region.points.len());
                for point in &region.points {
                    println!("  {}", point.coordinates());
                }
            }
        }
        Commands::Islands { watch } => {
            let catalog = load_catalog(&config)?;
            let aggregator = aggregator(&config)?;
            let mut view = ViewStateController::new(CoolingSimulator::new(&config.simulation));

            let refresh = config.aggregation.refresh_minutes;
            if watch && refresh > 0 {
                let every = Duration::from_secs(u64::from(refresh) * 60);
                let mut passes = pin!(aggregator.watch(&catalog, every));
                while let Some(islands) = passes.next().await {
                    view.replace_heat_islands(islands);
                    print_islands(&view);
                    info!("Next aggregation in {} minutes", refresh);
                }
            } else {
                if watch {
                    warn!("aggregation.refresh_minutes is 0, aggregating once");
                }
                view.recompute_heat_islands(&aggregator, &catalog).await;
                print_islands(&view);
            }
        }
        Commands::Simulate { trees, select } => {
            let catalog = load_catalog(&config)?;
            let aggregator = aggregator(&config)?;
            let mut view = ViewStateController::new(CoolingSimulator::new(&config.simulation));
            view.recompute_heat_islands(&aggregator, &catalog).await;

            view.set_tree_count(trees);
            if let Some(region) = select.as_deref() {
                view.set_selection(Some(region))?;
            }
            if let Some(impact) = view.set_mode(ViewMode::Trees) {
                println!("Trees planted:         {}", impact.format_trees());
                println!("Temperature reduction: {}", impact.format_reduction());
                println!("Area coverage:         {}", impact.format_coverage());
            }
            println!("Tree markers:          {}", view.tree_markers().len());
            for line in view.insights() {
                println!("{line}");
            }
        }
        Commands::Weather { at } => {
            let center = at.unwrap_or_else(|| config.map.center());
            let panel = WeatherPanel::new(client(&config)?, &config.panel);
            for line in panel.refresh(center).await.render_lines() {
                println!("{line}");
            }
        }
        Commands::Track => track(&config).await?,
        Commands::Readings { action } => {
            let store = match store {
                Some(Ok(store)) => store,
                Some(Err(e)) => {
                    return Err(anyhow::Error::new(e).context(format!(
                        "Failed to open store at {}",
                        config.store.location
                    )));
                }
                None => return Err(CanopyError::store("Store was not opened").into()),
            };
            let readings = CommunityReadings::new(&store);
            match action {
                ReadingsCommand::Add { at, temp, notes } => {
                    let reading = readings.add(at, temp, notes).await?;
                    println!(
                        "Recorded {:.1}°C at {}",
                        reading.temperature_celsius, reading.coordinates
                    );
                }
                ReadingsCommand::Clear => {
                    let removed = readings.clear().await?;
                    println!("Removed {removed} community readings");
                }
                ReadingsCommand::List => {
                    let all = readings.list().await?;
                    if all.is_empty() {
                        println!("No community readings yet");
                    }
                    for reading in all {
                        println!(
                            "{}  {}  {:.1}°C{}",
                            reading.recorded_at.format("%Y-%m-%d %H:%M"),
                            reading.coordinates,
                            reading.temperature_celsius,
                            reading
                                .notes
                                .map(|n| format!("  {n}"))
                                .unwrap_or_default()
                        );
                    }
                }
            }
        }
    }

    Ok(())
}

/// Print the welcome text on the first run; the store is optional here
async fn onboarding(store: &canopy::Result<LocalStore>, config: &CanopyConfig) {
    let first_run = match store {
        Ok(store) => store.first_run().await,
        Err(e) => {
            warn!(
                "Store at {} unavailable, skipping onboarding check: {}",
                config.store.location, e
            );
            return;
        }
    };
    match first_run {
        Ok(true) => println!("{ONBOARDING}"),
        Ok(false) => {}
        Err(e) => warn!("Onboarding check failed: {}", e),
    }
}

fn load_catalog(config: &CanopyConfig) -> Result<RegionCatalog> {
    Ok(match &config.aggregation.catalog_path {
        Some(path) => RegionCatalog::from_json_file(path)?,
        None => RegionCatalog::built_in(),
    })
}

fn client(config: &CanopyConfig) -> Result<Arc<WeatherApiClient>> {
    let api_key = config.require_api_key()?;
    Ok(Arc::new(WeatherApiClient::new(&config.weather, api_key)?))
}

fn aggregator(config: &CanopyConfig) -> Result<HeatIslandAggregator<Arc<WeatherApiClient>>> {
    let fetcher = TemperatureFetcher::from_config(client(config)?, &config.weather);
    Ok(HeatIslandAggregator::new(
        fetcher,
        config.weather.max_concurrent_requests,
    ))
}

fn print_islands(view: &ViewStateController) {
    for island in view.heat_islands() {
        println!("{} [{} {}]", island.tooltip(), island.band(), island.band().color());
    }
    for line in view.insights() {
        println!("{line}");
    }
}

async fn track(config: &CanopyConfig) -> Result<()> {
    let panel = Arc::new(WeatherPanel::new(client(config)?, &config.panel));
    let debouncer = Debouncer::from_config(&config.panel);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut refreshes = JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let center = match Coordinates::parse(line) {
            Ok(center) => center,
            Err(e) => {
                warn!("Ignoring map move '{}': {}", line, e);
                continue;
            }
        };

        let panel = Arc::clone(&panel);
        refreshes.spawn(debouncer.debounced(move || async move {
            for line in panel.refresh(center).await.render_lines() {
                println!("{line}");
            }
        }));
        while let Some(finished) = refreshes.try_join_next() {
            finished?;
        }
    }

    // Let refreshes that already fired finish printing
    while let Some(finished) = refreshes.join_next().await {
        finished?;
    }
    Ok(())
}
