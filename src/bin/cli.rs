//! flight-spy CLI - list what could be seen from a recorded flight
//!
//! Usage:
//!   flight-spy [FLIGHT_ID] [--by-distance <m>] [--by-time <s>] [--config <file>]
//!
//! Fetches the flight trail, reduces it to waypoints, looks up the map around
//! each waypoint and prints the interesting features in flight order.
//! Responses are cached under `<cache-root>/<flight id>/`, so a second run of
//! the same flight makes no map requests.

use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use flight_spy::report::{self, Report};
use flight_spy::{
    enrich_trail, FailurePolicy, FeatureFilter, FlightCache, Flightradar24Client, LibreTranslate,
    MapCache, NoTranslation, OsmClient, SpyConfig, Translator,
};

#[derive(Parser)]
#[command(name = "flight-spy")]
#[command(about = "List the points of interest along a recorded flight", long_about = None)]
struct Cli {
    /// Flightradar24 flight id (hex, from the playback URL)
    flight_id: Option<String>,

    /// Configuration file. Default: .flightspy.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit a waypoint every N meters (replaces the configured reduction rules)
    #[arg(long)]
    by_distance: Option<f64>,

    /// Emit a waypoint every N seconds (replaces the configured reduction rules)
    #[arg(long)]
    by_time: Option<i64>,

    /// Size of the area searched around each waypoint, in meters
    #[arg(long)]
    radius: Option<f64>,

    /// Minimum spacing between map requests, in milliseconds
    #[arg(long)]
    rate_limit_ms: Option<u64>,

    /// Ignore amenities while flying above the altitude threshold
    #[arg(long)]
    filter_altitude: bool,

    /// Do not call the translation service
    #[arg(long)]
    no_translate: bool,

    /// Drop waypoints whose map lookup fails instead of aborting
    #[arg(long)]
    skip_failures: bool,

    /// Root directory of the response cache
    #[arg(long)]
    cache_root: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Command line values win over the configuration file.
    fn apply(self, mut config: SpyConfig) -> SpyConfig {
        if let Some(flight_id) = self.flight_id {
            config.flight_id = flight_id;
        }
        if self.by_distance.is_some() || self.by_time.is_some() {
            config.distance_gap_m = self.by_distance;
            config.time_gap_s = self.by_time;
        }
        if let Some(radius) = self.radius {
            config.map_area_radius_m = radius;
        }
        if let Some(rate_limit_ms) = self.rate_limit_ms {
            config.rate_limit_ms = rate_limit_ms;
        }
        if let Some(cache_root) = self.cache_root {
            config.cache_root = cache_root;
        }
        if self.filter_altitude {
            config.filter_by_altitude = true;
        }
        if self.no_translate {
            config.translate_url = None;
        }
        if self.skip_failures {
            config.failure_policy = FailurePolicy::Skip;
        }
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let config = match SpyConfig::load(cli.config.as_deref()) {
        Ok(config) => cli.apply(config),
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&config).await {
        Ok(text) => {
            print!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run the whole pipeline and return the rendered report.
async fn run(config: &SpyConfig) -> flight_spy::Result<String> {
    let flights = FlightCache::new(config.flight_cache_dir(), Flightradar24Client::new()?)?;
    let waypoints = flights
        .flight_trail(&config.flight_id, &config.reduce_config())
        .await?;
    log::info!("{} waypoints for flight {}", waypoints.len(), config.flight_id);

    let maps = MapCache::new(config.map_cache_dir(), OsmClient::new()?)?;
    let features = enrich_trail(&waypoints, &maps, &config.enrich_config()).await?;

    let mut filter = FeatureFilter::new(config.filter_options());
    let report = Report::from_features(features, &mut filter);
    log::info!("{} distinct interests", filter.seen_count());

    let text = match &config.translate_url {
        Some(url) => render(&report, &LibreTranslate::new(url)?, &config.target_language).await,
        None => render(&report, &NoTranslation, &config.target_language).await,
    };
    Ok(text)
}

async fn render<T: Translator>(report: &Report, translator: &T, target_language: &str) -> String {
    let entries = report.process(translator, target_language).await;
    report::render(&entries, report.start_time())
}
