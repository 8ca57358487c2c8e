//! CLI entry point for the transit route status pulse.
//!
//! Provides subcommands for a single pulse run, a sequential re-run loop,
//! trip id diagnostics and realtime feed inspection.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use transit_pulse::{
    config::PulseConfig,
    fetch::BasicClient,
    matcher::TripMatcher,
    output::PulseSnapshot,
    pipeline::spawn_route_status_pulse,
    reference::StaticReference,
    source::FeedSource,
    stats::FeedSummary,
};

#[derive(Parser)]
#[command(name = "transit_pulse")]
#[command(about = "Live route status from GTFS and GTFS-realtime feeds", long_about = None)]
struct Cli {
    #[command(flatten)]
    overrides: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConfigArgs {
    /// JSON config file; absent keys use defaults
    #[arg(long, global = true, env = "PULSE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding routes.txt, trips.txt, stops.txt and local feeds
    #[arg(long, global = true, env = "PULSE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Snapshot output path
    #[arg(short, long, global = true, env = "PULSE_OUTPUT")]
    output: Option<PathBuf>,

    /// Trip updates URL used when no local file exists
    #[arg(long, global = true, env = "PULSE_TRIP_UPDATES_URL")]
    trip_updates_url: Option<String>,

    /// Service alerts URL used when no local file exists
    #[arg(long, global = true, env = "PULSE_ALERTS_URL")]
    alerts_url: Option<String>,

    /// Realtime fetch timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Minutes above which a trip counts as delayed
    #[arg(long, global = true)]
    delay_minutes: Option<i64>,

    /// Delayed share (0.0-1.0) at which a route is delayed
    #[arg(long, global = true)]
    percent_delayed: Option<f64>,

    /// Minutes above which a single trip delays its route
    #[arg(long, global = true)]
    major_delay_minutes: Option<i64>,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<PulseConfig> {
        let mut config = match &self.config {
            Some(path) => PulseConfig::load(path)?,
            None => PulseConfig::default(),
        };

        if let Some(dir) = &self.data_dir {
            config = config.with_data_dir(dir);
        }
        if let Some(output) = &self.output {
            config.output_file = output.clone();
        }
        if let Some(url) = &self.trip_updates_url {
            config.realtime.trip_updates_url = Some(url.clone());
        }
        if let Some(url) = &self.alerts_url {
            config.realtime.alerts_url = Some(url.clone());
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.realtime.timeout_ms = timeout_ms;
        }
        if let Some(minutes) = self.delay_minutes {
            config.thresholds.delay_minutes_threshold = minutes;
        }
        if let Some(share) = self.percent_delayed {
            config.thresholds.percent_delayed_threshold = share;
        }
        if let Some(minutes) = self.major_delay_minutes {
            config.thresholds.major_delay_minutes = minutes;
        }

        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the route status pulse once
    Run,
    /// Rebuild the pulse on an interval, one run at a time
    Watch {
        /// Seconds between the end of one run and the start of the next
        #[arg(short = 'i', long, default_value_t = 60)]
        interval_secs: u64,

        /// Number of runs (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 0)]
        runs: usize,
    },
    /// Resolve realtime trip ids against the static trips table
    Lookup {
        #[arg(value_name = "TRIP_ID", required = true)]
        trip_ids: Vec<String>,
    },
    /// Decode a GTFS-RT feed from a file or URL and summarise it
    Inspect {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/transit_pulse.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_pulse.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = Arc::new(cli.overrides.resolve()?);
    let client = Arc::new(BasicClient::new());

    match cli.command {
        Commands::Run => {
            let snapshot = spawn_route_status_pulse(config, client).await?;
            log_status_counts(&snapshot);
        }
        Commands::Watch {
            interval_secs,
            runs,
        } => {
            watch(config, client, interval_secs, runs).await;
        }
        Commands::Lookup { trip_ids } => {
            let reference = StaticReference::load(&config.static_files);
            let mut matcher = TripMatcher::new(reference.trips());

            for trip_id in &trip_ids {
                match matcher.lookup_route(trip_id) {
                    Some(route_id) => {
                        let short_name = reference
                            .route(&route_id)
                            .map(|meta| meta.short_name.as_str())
                            .unwrap_or("?");
                        info!(
                            trip_id = %trip_id,
                            route_id = %route_id,
                            short_name,
                            "Trip resolved"
                        );
                    }
                    None => warn!(trip_id = %trip_id, "Trip unmatched"),
                }
            }
        }
        Commands::Inspect { source } => {
            let source = FeedSource::from_location(&source);
            if let Some(feed) = source.fetch(client.as_ref(), config.realtime.timeout()).await? {
                let summary = FeedSummary::from_feed(&feed);
                info!("{}", serde_json::to_string_pretty(&summary)?);
            }
        }
    }

    Ok(())
}

/// Re-runs the pulse sequentially; a failed run is logged and the loop
/// carries on.
#[tracing::instrument(skip(config, client))]
async fn watch(
    config: Arc<PulseConfig>,
    client: Arc<BasicClient>,
    interval_secs: u64,
    runs: usize,
) {
    if runs == 0 {
        info!(interval_secs, "Running indefinitely. Press Ctrl+C to stop.");
    } else {
        info!(runs, interval_secs, "Starting pulse runs");
    }

    let mut run_count = 0;

    loop {
        if runs > 0 && run_count >= runs {
            break;
        }
        run_count += 1;

        match spawn_route_status_pulse(Arc::clone(&config), Arc::clone(&client)).await {
            Ok(snapshot) => log_status_counts(&snapshot),
            Err(e) => error!(run = run_count, error = %e, "Pulse run failed"),
        }

        if runs == 0 || run_count < runs {
            tokio::time::sleep(tokio::time::Duration::from_secs(interval_secs)).await;
        }
    }

    info!(run_count, "Finished pulse runs");
}

fn log_status_counts(snapshot: &PulseSnapshot) {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for route in &snapshot.routes {
        *counts.entry(route.status.to_string()).or_default() += 1;
    }
    info!(
        updated_at = %snapshot.updated_at,
        routes = snapshot.routes.len(),
        ?counts,
        "Pulse summary"
    );
}
