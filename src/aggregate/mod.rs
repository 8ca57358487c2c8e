//! Route status aggregation.
//!
//! Realtime trip updates are resolved to static routes through the
//! [`TripMatcher`], bucketed per route, and each bucket is classified from
//! its delay statistics. Canonical routes without realtime trips still get an
//! entry so the dashboard always lists every route.

pub mod classify;
pub mod types;
pub mod utility;

use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::debug;

use crate::gtfs_rt::{FeedMessage, TripUpdate};
use crate::matcher::TripMatcher;
use crate::reference::{RouteMeta, StaticReference};
use classify::BucketStats;
use types::{RouteStatusResult, SampleDelay, Thresholds, TripDelay};
use utility::{minutes_from_seconds, short_name_order};

/// Trips shown per route in `sampleDelays`.
const SAMPLE_SIZE: usize = 3;

impl TripDelay {
    /// Reads the trip id and the first stop-time update's delay, preferring
    /// the arrival delay over the departure delay.
    pub fn from_trip_update(update: &TripUpdate) -> Self {
        let first = update.stop_time_update.first();
        let delay_seconds = first.and_then(|stu| {
            stu.arrival
                .as_ref()
                .and_then(|e| e.delay)
                .or_else(|| stu.departure.as_ref().and_then(|e| e.delay))
        });

        Self {
            trip_id: update
                .trip
                .trip_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            delay_minutes: delay_seconds.map(minutes_from_seconds),
            next_stop_id: first.and_then(|stu| stu.stop_id.clone()),
        }
    }
}

/// Aggregates every trip update in `feed` into per-route results, sorted by
/// short name.
pub fn aggregate_route_status(
    feed: &FeedMessage,
    reference: &StaticReference,
    matcher: &mut TripMatcher<'_>,
    thresholds: &Thresholds,
) -> Vec<RouteStatusResult> {
    let mut buckets: IndexMap<String, Vec<TripDelay>> = IndexMap::new();

    for update in feed.entity.iter().filter_map(|e| e.trip_update.as_ref()) {
        let trip = TripDelay::from_trip_update(update);
        let Some(route_id) = trip
            .trip_id
            .as_deref()
            .and_then(|id| matcher.lookup_route(id))
        else {
            continue;
        };

        debug!(
            route_id = %route_id,
            trip_id = ?trip.trip_id,
            delay_minutes = ?trip.delay_minutes,
            next_stop = ?trip.next_stop_id.as_deref().and_then(|s| reference.stop_name(s)),
            "Trip update matched"
        );
        buckets.entry(route_id).or_default().push(trip);
    }

    let mut results: Vec<RouteStatusResult> = buckets
        .iter()
        .map(|(route_id, trips)| {
            let meta = reference
                .route(route_id)
                .cloned()
                .unwrap_or_else(|| RouteMeta::placeholder(route_id));
            bucket_result(&meta, trips, thresholds)
        })
        .collect();

    let seen: HashSet<String> = results.iter().map(|r| r.route_id.clone()).collect();
    results.extend(
        reference
            .routes()
            .filter(|meta| !seen.contains(&meta.route_id))
            .map(RouteStatusResult::no_active_trips),
    );

    results.sort_by(|a, b| short_name_order(&a.route_short_name, &b.route_short_name));
    results
}

fn bucket_result(
    meta: &RouteMeta,
    trips: &[TripDelay],
    thresholds: &Thresholds,
) -> RouteStatusResult {
    let delays: Vec<i64> = trips.iter().map(|t| t.delay_minutes.unwrap_or(0)).collect();
    let stats = BucketStats::from_delays(&delays, thresholds);

    RouteStatusResult {
        route_id: meta.route_id.clone(),
        route_short_name: meta.short_name.clone(),
        route_long_name: meta.long_name.clone(),
        color: meta.color.clone(),
        text_color: meta.text_color.clone(),
        status: stats.status(thresholds),
        total_active_trips: stats.total_active_trips,
        delayed_trips: stats.delayed_trips,
        percent_delayed: stats.percent_delayed(),
        sample_delays: trips
            .iter()
            .take(SAMPLE_SIZE)
            .map(|t| SampleDelay {
                trip_id: t.trip_id.clone().unwrap_or_default(),
                delay_minutes: t.delay_minutes,
            })
            .collect(),
    }
}
