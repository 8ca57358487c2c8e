use async_trait::async_trait;
use prost::Message;
use std::path::Path;
use transit_pulse::aggregate::types::{RouteStatus, RouteStatusResult, SampleDelay};
use transit_pulse::config::PulseConfig;
use transit_pulse::fetch::HttpClient;
use transit_pulse::gtfs_rt::trip_update::{StopTimeEvent, StopTimeUpdate};
use transit_pulse::gtfs_rt::{
    Alert, EntitySelector, FeedEntity, FeedHeader, FeedMessage, TripDescriptor, TripUpdate,
};
use transit_pulse::output::PulseSnapshot;
use transit_pulse::pipeline::build_route_status_pulse;

/// Stands in for the network: every request fails.
struct OfflineClient;

#[async_trait]
impl HttpClient for OfflineClient {
    async fn execute(&self, _req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        Err(reqwest::Client::new().get("offline").build().unwrap_err())
    }
}

fn copy_fixtures(dir: &Path) {
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    for name in ["routes.txt", "trips.txt", "stops.txt"] {
        std::fs::copy(fixtures.join(name), dir.join(name)).unwrap();
    }
}

fn trip(trip_id: &str, arrival_delay: Option<i32>) -> FeedEntity {
    FeedEntity {
        id: format!("tu-{trip_id}"),
        trip_update: Some(TripUpdate {
            trip: TripDescriptor {
                trip_id: Some(trip_id.to_string()),
                ..Default::default()
            },
            stop_time_update: vec![StopTimeUpdate {
                stop_id: Some("100".to_string()),
                arrival: arrival_delay.map(|delay| StopTimeEvent {
                    delay: Some(delay),
                    ..Default::default()
                }),
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn alert(route_ids: &[&str]) -> FeedEntity {
    FeedEntity {
        id: "alert-1".to_string(),
        alert: Some(Alert {
            informed_entity: route_ids
                .iter()
                .map(|id| EntitySelector {
                    route_id: Some(id.to_string()),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn write_feed(path: &Path, entity: Vec<FeedEntity>) {
    let feed = FeedMessage {
        header: FeedHeader {
            gtfs_realtime_version: "2.0".to_string(),
            timestamp: Some(1_760_000_000),
            ..Default::default()
        },
        entity,
    };
    std::fs::write(path, feed.encode_to_vec()).unwrap();
}

fn offline_config(dir: &Path) -> PulseConfig {
    let mut config = PulseConfig::default().with_data_dir(dir);
    config.realtime.trip_updates_url = Some("https://feeds.invalid/tripupdates.pb".to_string());
    config
}

fn route<'a>(routes: &'a [RouteStatusResult], route_id: &str) -> &'a RouteStatusResult {
    routes.iter().find(|r| r.route_id == route_id).unwrap()
}

fn setup_network(dir: &Path) {
    copy_fixtures(dir);
    write_feed(
        &dir.join("tripupdates.pb"),
        vec![
            trip("RT84_1200", Some(120)),
            trip("RT85", Some(1200)),
            trip("sarnia:5501", Some(60)),
            trip("5502", None),
            trip("ZZZ-999", Some(3600)),
        ],
    );
    write_feed(&dir.join("alerts.pb"), vec![alert(&["SAR-N", "10"])]);
}

#[tokio::test]
async fn test_full_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    setup_network(dir.path());
    let config = offline_config(dir.path());

    let snapshot = build_route_status_pulse(&config, &OfflineClient).await.unwrap();
    let routes = &snapshot.routes;

    let short_names: Vec<_> = routes.iter().map(|r| r.route_short_name.as_str()).collect();
    assert_eq!(short_names, vec!["1", "2", "10", "Night"]);

    let lakeshore = route(routes, "SAR-1");
    assert_eq!(lakeshore.status, RouteStatus::Delayed);
    assert_eq!(lakeshore.total_active_trips, 2);
    assert_eq!(lakeshore.delayed_trips, 1);
    assert_eq!(lakeshore.percent_delayed, 50);
    assert_eq!(lakeshore.color, "#000080");
    assert_eq!(lakeshore.text_color, "#FFFFFF");
    assert_eq!(
        lakeshore.sample_delays,
        vec![
            SampleDelay {
                trip_id: "RT84_1200".to_string(),
                delay_minutes: Some(2)
            },
            SampleDelay {
                trip_id: "RT85".to_string(),
                delay_minutes: Some(20)
            },
        ]
    );

    let vidal = route(routes, "SAR-2");
    assert_eq!(vidal.status, RouteStatus::OnTime);
    assert_eq!(vidal.total_active_trips, 2);
    assert_eq!(vidal.sample_delays[1].delay_minutes, None);

    let express = route(routes, "SAR-10");
    assert_eq!(express.status, RouteStatus::ServiceAlert);
    assert_eq!(express.total_active_trips, 0);
    assert_eq!(express.color, "#FFFFFF");
    assert_eq!(express.text_color, "#000000");

    let night = route(routes, "SAR-N");
    assert_eq!(night.status, RouteStatus::ServiceAlert);
    assert_eq!(night.text_color, "#FFFFFF");

    // unmatched trip ZZZ-999 lands nowhere
    assert!(
        routes
            .iter()
            .flat_map(|r| r.sample_delays.iter())
            .all(|s| s.trip_id != "ZZZ-999")
    );

    let written: PulseSnapshot =
        serde_json::from_str(&std::fs::read_to_string(&config.output_file).unwrap()).unwrap();
    assert_eq!(written, snapshot);
}

#[tokio::test]
async fn test_reruns_are_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    setup_network(dir.path());
    let config = offline_config(dir.path());

    let first = build_route_status_pulse(&config, &OfflineClient).await.unwrap();
    let second = build_route_status_pulse(&config, &OfflineClient).await.unwrap();

    assert_eq!(first.routes, second.routes);
}

#[tokio::test]
async fn test_reference_failure_writes_empty_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    setup_network(dir.path());
    std::fs::remove_file(dir.path().join("trips.txt")).unwrap();
    let config = offline_config(dir.path());

    let outcome = build_route_status_pulse(&config, &OfflineClient).await;
    assert!(outcome.is_err());

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&config.output_file).unwrap()).unwrap();
    assert!(written["updatedAt"].is_string());
    assert_eq!(written["routes"], serde_json::json!([]));
}

#[tokio::test]
async fn test_unreachable_trip_feed_publishes_no_routes() {
    let dir = tempfile::tempdir().unwrap();
    copy_fixtures(dir.path());
    let config = offline_config(dir.path());

    let snapshot = build_route_status_pulse(&config, &OfflineClient).await.unwrap();
    assert!(snapshot.routes.is_empty());
}

#[tokio::test]
async fn test_without_alerts_routes_keep_computed_status() {
    let dir = tempfile::tempdir().unwrap();
    setup_network(dir.path());
    std::fs::remove_file(dir.path().join("alerts.pb")).unwrap();
    let config = offline_config(dir.path());

    let snapshot = build_route_status_pulse(&config, &OfflineClient).await.unwrap();

    assert_eq!(route(&snapshot.routes, "SAR-10").status, RouteStatus::NoActiveTrips);
    assert_eq!(route(&snapshot.routes, "SAR-N").status, RouteStatus::NoActiveTrips);
}
