//! Data types produced by route status aggregation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::reference::RouteMeta;

/// Live classification of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteStatus {
    #[serde(rename = "On Time")]
    OnTime,
    Delayed,
    #[serde(rename = "No Active Trips")]
    NoActiveTrips,
    #[serde(rename = "Service Alert")]
    ServiceAlert,
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RouteStatus::OnTime => "On Time",
            RouteStatus::Delayed => "Delayed",
            RouteStatus::NoActiveTrips => "No Active Trips",
            RouteStatus::ServiceAlert => "Service Alert",
        };
        f.write_str(label)
    }
}

/// Cut-offs used to classify a route bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Thresholds {
    /// A trip is delayed when its delay is strictly above this many minutes.
    pub delay_minutes_threshold: i64,
    /// Fraction of delayed trips (0.0–1.0) at which a route is delayed.
    pub percent_delayed_threshold: f64,
    /// Any single trip strictly above this many minutes delays the route.
    pub major_delay_minutes: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            delay_minutes_threshold: 5,
            percent_delayed_threshold: 0.20,
            major_delay_minutes: 15,
        }
    }
}

/// Delay of one realtime trip, taken from its first stop-time update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripDelay {
    pub trip_id: Option<String>,
    /// `None` when the first stop-time update carries no delay.
    pub delay_minutes: Option<i64>,
    pub next_stop_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleDelay {
    pub trip_id: String,
    pub delay_minutes: Option<i64>,
}

/// One route's entry in the pulse snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStatusResult {
    pub route_id: String,
    pub route_short_name: String,
    pub route_long_name: Option<String>,
    pub color: String,
    pub text_color: String,
    pub status: RouteStatus,
    pub total_active_trips: usize,
    pub delayed_trips: usize,
    pub percent_delayed: u32,
    pub sample_delays: Vec<SampleDelay>,
}

impl RouteStatusResult {
    /// Entry for a canonical route with no trips in the realtime feed.
    pub fn no_active_trips(meta: &RouteMeta) -> Self {
        Self {
            route_id: meta.route_id.clone(),
            route_short_name: meta.short_name.clone(),
            route_long_name: meta.long_name.clone(),
            color: meta.color.clone(),
            text_color: meta.text_color.clone(),
            status: RouteStatus::NoActiveTrips,
            total_active_trips: 0,
            delayed_trips: 0,
            percent_delayed: 0,
            sample_delays: Vec::new(),
        }
    }
}
