//! Run configuration.
//!
//! Defaults mirror the Sarnia Transit deployment. A JSON file may override
//! any subset of keys; the CLI layers its flags on top.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::aggregate::types::Thresholds;

pub const DEFAULT_TRIP_UPDATES_URL: &str =
    "https://metrolinx.tmix.se/gtfs-realtime-sarnia/tripupdates.pb";

const DEFAULT_DATA_DIR: &str = "data";

/// Paths of the static reference tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StaticFiles {
    pub routes: PathBuf,
    pub trips: PathBuf,
    pub stops: PathBuf,
}

impl StaticFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            routes: dir.join("routes.txt"),
            trips: dir.join("trips.txt"),
            stops: dir.join("stops.txt"),
        }
    }
}

impl Default for StaticFiles {
    fn default() -> Self {
        Self::in_dir(Path::new(DEFAULT_DATA_DIR))
    }
}

/// Where the two realtime feeds come from.
///
/// A local file that exists wins over the URL. The alerts feed has no default
/// URL, so without a local file it is simply absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RealtimeConfig {
    pub trip_updates_local: Option<PathBuf>,
    pub trip_updates_url: Option<String>,
    pub alerts_local: Option<PathBuf>,
    pub alerts_url: Option<String>,
    pub timeout_ms: u64,
}

impl RealtimeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        let dir = Path::new(DEFAULT_DATA_DIR);
        Self {
            trip_updates_local: Some(dir.join("tripupdates.pb")),
            trip_updates_url: Some(DEFAULT_TRIP_UPDATES_URL.to_string()),
            alerts_local: Some(dir.join("alerts.pb")),
            alerts_url: None,
            timeout_ms: 12_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PulseConfig {
    pub static_files: StaticFiles,
    pub realtime: RealtimeConfig,
    pub thresholds: Thresholds,
    pub output_file: PathBuf,
    /// How many unmatched trip ids are logged at the end of a run.
    pub debug_sample_limit: usize,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            static_files: StaticFiles::default(),
            realtime: RealtimeConfig::default(),
            thresholds: Thresholds::default(),
            output_file: Path::new(DEFAULT_DATA_DIR).join("route_status.json"),
            debug_sample_limit: 10,
        }
    }
}

impl PulseConfig {
    /// Loads a JSON config file; absent keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid config '{}'", path.display()))
    }

    /// Points every file location (tables, local feeds, output) at `dir`.
    pub fn with_data_dir(mut self, dir: &Path) -> Self {
        self.static_files = StaticFiles::in_dir(dir);
        self.realtime.trip_updates_local = Some(dir.join("tripupdates.pb"));
        self.realtime.alerts_local = Some(dir.join("alerts.pb"));
        self.output_file = dir.join("route_status.json");
        self
    }
}
