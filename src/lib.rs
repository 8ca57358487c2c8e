//! Route-level live status for a transit network.
//!
//! Static GTFS tables are joined with a GTFS-realtime trip-update feed to
//! classify every route as on time, delayed, idle or under a service alert,
//! and the result is persisted as a JSON "pulse" snapshot for a dashboard.

pub mod aggregate;
pub mod alerts;
pub mod config;
pub mod fetch;
pub mod matcher;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod reference;
pub mod source;
pub mod stats;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
