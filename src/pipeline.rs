//! One end-to-end pulse run.
//!
//! Every run rebuilds its lookups from scratch inside a [`PulseRun`]; nothing
//! is shared between runs except the snapshot file, which is never read back.
//! Runs are not serialised here: callers that schedule them must avoid
//! overlapping runs on the same output file.

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::aggregate::aggregate_route_status;
use crate::aggregate::types::{RouteStatusResult, Thresholds};
use crate::alerts::apply_alerts;
use crate::config::PulseConfig;
use crate::fetch::HttpClient;
use crate::gtfs_rt::FeedMessage;
use crate::matcher::TripMatcher;
use crate::output::{PulseSnapshot, write_snapshot};
use crate::reference::StaticReference;
use crate::source::{FeedSource, load_feed};

/// The two realtime feeds of a run; either may be absent.
#[derive(Debug, Default)]
pub struct RealtimeFeeds {
    pub trip_updates: Option<FeedMessage>,
    pub alerts: Option<FeedMessage>,
}

impl RealtimeFeeds {
    pub async fn load<C: HttpClient>(config: &PulseConfig, client: &C) -> Self {
        let realtime = &config.realtime;
        let trip_source = FeedSource::resolve(
            realtime.trip_updates_local.as_deref(),
            realtime.trip_updates_url.as_deref(),
        );
        let alert_source =
            FeedSource::resolve(realtime.alerts_local.as_deref(), realtime.alerts_url.as_deref());

        let trip_updates =
            load_feed("trip_updates", &trip_source, client, realtime.timeout()).await;
        let alerts = match alert_source {
            FeedSource::Absent => None,
            source => load_feed("alerts", &source, client, realtime.timeout()).await,
        };

        Self {
            trip_updates,
            alerts,
        }
    }
}

/// State owned by a single run.
#[derive(Debug)]
pub struct PulseRun {
    started_at: DateTime<Utc>,
    reference: StaticReference,
}

impl PulseRun {
    /// Loads the static reference, failing if routes or trips are unusable.
    pub fn prepare(config: &PulseConfig, started_at: DateTime<Utc>) -> Result<Self> {
        let reference = StaticReference::load(&config.static_files);
        if let Some(failure) = reference.required_failure() {
            bail!("static reference unavailable: {failure}");
        }
        for failure in reference.failures() {
            warn!(%failure, "Continuing without optional reference table");
        }

        Ok(Self {
            started_at,
            reference,
        })
    }

    pub fn reference(&self) -> &StaticReference {
        &self.reference
    }

    pub fn matcher(&self) -> TripMatcher<'_> {
        TripMatcher::new(self.reference.trips())
    }

    /// Aggregates the trip-update feed and overlays service alerts.
    ///
    /// Without a trip-update feed there are no results at all, not even
    /// "No Active Trips" entries.
    pub fn route_statuses(
        &self,
        feeds: &RealtimeFeeds,
        thresholds: &Thresholds,
        debug_sample_limit: usize,
    ) -> Vec<RouteStatusResult> {
        let Some(trip_feed) = feeds.trip_updates.as_ref() else {
            warn!("No trip updates available, publishing empty route list");
            return Vec::new();
        };

        let mut matcher = self.matcher();
        info!(entries = matcher.index_len(), "Trip id index ready");

        let mut results =
            aggregate_route_status(trip_feed, &self.reference, &mut matcher, thresholds);
        apply_alerts(&mut results, feeds.alerts.as_ref());

        if matcher.unmatched_count() > 0 {
            let sample: Vec<&str> = matcher.unmatched().take(debug_sample_limit).collect();
            warn!(count = matcher.unmatched_count(), ?sample, "Unmatched trip ids");
        }

        results
    }

    pub fn snapshot(&self, routes: Vec<RouteStatusResult>) -> PulseSnapshot {
        PulseSnapshot {
            updated_at: self.started_at,
            routes,
        }
    }
}

async fn compute_pulse<C: HttpClient>(
    config: &PulseConfig,
    client: &C,
    started_at: DateTime<Utc>,
) -> Result<PulseSnapshot> {
    let run = PulseRun::prepare(config, started_at)?;
    let feeds = RealtimeFeeds::load(config, client).await;
    let routes = run.route_statuses(&feeds, &config.thresholds, config.debug_sample_limit);
    Ok(run.snapshot(routes))
}

/// Runs the pipeline and writes the snapshot.
///
/// On failure a degraded snapshot with no routes is written in place of the
/// real one and the failure is returned.
#[tracing::instrument(skip_all, fields(output = %config.output_file.display()))]
pub async fn build_route_status_pulse<C: HttpClient>(
    config: &PulseConfig,
    client: &C,
) -> Result<PulseSnapshot> {
    let started_at = Utc::now();

    match compute_pulse(config, client, started_at).await {
        Ok(snapshot) => {
            write_snapshot(&config.output_file, &snapshot)?;
            info!(routes = snapshot.routes.len(), "Route status pulse updated");
            Ok(snapshot)
        }
        Err(e) => Err(degrade(config, started_at, e)),
    }
}

/// Like [`build_route_status_pulse`], but on its own task so that a panic
/// inside the run is reported as an error (with a degraded snapshot written)
/// instead of unwinding into the caller.
pub async fn spawn_route_status_pulse<C: HttpClient + 'static>(
    config: Arc<PulseConfig>,
    client: Arc<C>,
) -> Result<PulseSnapshot> {
    let task_config = Arc::clone(&config);
    let started_at = Utc::now();

    let task = tokio::spawn(async move {
        build_route_status_pulse(&task_config, client.as_ref()).await
    });

    match task.await {
        Ok(outcome) => outcome,
        Err(join_error) => Err(degrade(
            &config,
            started_at,
            anyhow!("pulse run aborted: {join_error}"),
        )),
    }
}

fn degrade(
    config: &PulseConfig,
    started_at: DateTime<Utc>,
    cause: anyhow::Error,
) -> anyhow::Error {
    let message = format!("{cause:#}");
    error!(error = %message, "Route status pulse failed, writing degraded snapshot");
    let snapshot = PulseSnapshot::degraded(started_at);
    if let Err(write_error) = write_snapshot(&config.output_file, &snapshot) {
        let message = format!("{write_error:#}");
        error!(error = %message, "Degraded snapshot could not be written");
    }
    cause
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::{ROUTES, TRIPS, feed, trip_update};
    use crate::aggregate::types::RouteStatus;
    use crate::gtfs_rt::{Alert, EntitySelector, FeedEntity, FeedHeader};
    use crate::source::tests::FailingClient;
    use async_trait::async_trait;
    use std::path::Path;

    /// Client that panics on any request.
    struct PanickingClient;

    #[async_trait]
    impl HttpClient for PanickingClient {
        async fn execute(&self, _req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            panic!("connection pool poisoned");
        }
    }

    fn config_in(dir: &Path) -> PulseConfig {
        let mut config = PulseConfig::default().with_data_dir(dir);
        config.realtime.trip_updates_url = None;
        config
    }

    fn write_reference(dir: &Path) {
        std::fs::write(dir.join("routes.txt"), ROUTES).unwrap();
        std::fs::write(dir.join("trips.txt"), TRIPS).unwrap();
        std::fs::write(dir.join("stops.txt"), "stop_id,stop_name\nS1,Bayside\n").unwrap();
    }

    #[test]
    fn test_prepare_fails_without_routes() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PulseRun::prepare(&config_in(dir.path()), Utc::now()).is_err());
    }

    #[test]
    fn test_prepare_tolerates_missing_stops() {
        let dir = tempfile::tempdir().unwrap();
        write_reference(dir.path());
        std::fs::remove_file(dir.path().join("stops.txt")).unwrap();

        let run = PulseRun::prepare(&config_in(dir.path()), Utc::now()).unwrap();
        assert_eq!(run.reference().stop_count(), 0);
    }

    #[test]
    fn test_missing_trip_feed_yields_no_routes() {
        let dir = tempfile::tempdir().unwrap();
        write_reference(dir.path());
        let run = PulseRun::prepare(&config_in(dir.path()), Utc::now()).unwrap();

        let routes = run.route_statuses(&RealtimeFeeds::default(), &Thresholds::default(), 10);
        assert!(routes.is_empty());
    }

    #[test]
    fn test_alerts_override_computed_status() {
        let dir = tempfile::tempdir().unwrap();
        write_reference(dir.path());
        let run = PulseRun::prepare(&config_in(dir.path()), Utc::now()).unwrap();

        let feeds = RealtimeFeeds {
            trip_updates: Some(feed(vec![trip_update("T1A", Some(1800), None)])),
            alerts: Some(FeedMessage {
                header: FeedHeader::default(),
                entity: vec![FeedEntity {
                    id: "alert".to_string(),
                    alert: Some(Alert {
                        informed_entity: vec![EntitySelector {
                            route_id: Some("1".to_string()),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                    ..Default::default()
                }],
            }),
        };

        let routes = run.route_statuses(&feeds, &Thresholds::default(), 10);
        let r1 = routes.iter().find(|r| r.route_id == "R1").unwrap();
        assert_eq!(r1.status, RouteStatus::ServiceAlert);
        assert_eq!(r1.delayed_trips, 1);
    }

    #[tokio::test]
    async fn test_failed_run_writes_degraded_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let outcome = build_route_status_pulse(&config, &FailingClient).await;
        assert!(outcome.is_err());

        let written: PulseSnapshot =
            serde_json::from_str(&std::fs::read_to_string(&config.output_file).unwrap()).unwrap();
        assert!(written.routes.is_empty());
    }

    #[tokio::test]
    async fn test_spawned_run_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = Arc::new(config_in(dir.path()));

        let outcome = spawn_route_status_pulse(Arc::clone(&config), Arc::new(FailingClient)).await;
        assert!(outcome.is_err());
        assert!(config.output_file.exists());
    }

    #[tokio::test]
    async fn test_spawned_run_survives_panic() {
        let dir = tempfile::tempdir().unwrap();
        write_reference(dir.path());
        let mut config = config_in(dir.path());
        config.realtime.trip_updates_url = Some("https://feeds.invalid/tripupdates.pb".to_string());
        let config = Arc::new(config);

        let outcome =
            spawn_route_status_pulse(Arc::clone(&config), Arc::new(PanickingClient)).await;
        assert!(outcome.is_err());

        let written: PulseSnapshot =
            serde_json::from_str(&std::fs::read_to_string(&config.output_file).unwrap()).unwrap();
        assert!(written.routes.is_empty());
    }
}
