//! Entity counts for a decoded feed, used by the `inspect` command.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::types::TripDelay;
use crate::alerts::alerted_routes;
use crate::gtfs_rt::FeedMessage;

#[derive(Debug, Default, Serialize)]
pub struct FeedSummary {
    pub gtfs_realtime_version: String,
    pub feed_timestamp: Option<DateTime<Utc>>,
    pub total_entities: usize,

    // entity types
    pub trip_updates: usize,
    pub vehicles: usize,
    pub alerts: usize,

    // trip update fields
    pub with_trip_id: usize,
    pub with_stop_time_updates: usize,
    pub with_first_stop_delay: usize,
    pub max_delay_minutes: Option<i64>,

    // alert fields
    pub alerted_routes: usize,
}

impl FeedSummary {
    pub fn from_feed(feed: &FeedMessage) -> Self {
        let mut s = FeedSummary {
            gtfs_realtime_version: feed.header.gtfs_realtime_version.clone(),
            feed_timestamp: feed
                .header
                .timestamp
                .and_then(|t| i64::try_from(t).ok())
                .and_then(|t| DateTime::from_timestamp(t, 0)),
            total_entities: feed.entity.len(),
            alerted_routes: alerted_routes(feed).len(),
            ..Default::default()
        };

        for e in &feed.entity {
            if let Some(tu) = &e.trip_update {
                s.trip_updates += 1;

                if !tu.stop_time_update.is_empty() {
                    s.with_stop_time_updates += 1;
                }

                let delay = TripDelay::from_trip_update(tu);
                if delay.trip_id.is_some() {
                    s.with_trip_id += 1;
                }
                if let Some(minutes) = delay.delay_minutes {
                    s.with_first_stop_delay += 1;
                    s.max_delay_minutes =
                        Some(s.max_delay_minutes.map_or(minutes, |m| m.max(minutes)));
                }
            }

            if e.vehicle.is_some() {
                s.vehicles += 1;
            }

            if e.alert.is_some() {
                s.alerts += 1;
            }
        }

        s
    }
}
