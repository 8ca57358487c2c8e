//! Static GTFS reference tables: routes, trips and stops.
//!
//! Each table loads independently. A table that cannot be read or parsed is
//! left empty and recorded in [`StaticReference::failures`] so the caller
//! decides whether the run can continue.

pub mod color;
pub mod table;

use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, error, info};

use crate::config::StaticFiles;
use color::{DEFAULT_ROUTE_COLOR, contrasting_text_color, normalize_hex};
use table::Table;

const ROUTE_ID: &[&str] = &["route_id", "RouteID", "RouteId"];
const ROUTE_SHORT_NAME: &[&str] = &["route_short_name", "routeShortName", "route_short"];
const ROUTE_LONG_NAME: &[&str] = &["route_long_name", "routeLongName"];
const ROUTE_COLOR: &[&str] = &["route_color", "routeColor"];
const ROUTE_TEXT_COLOR: &[&str] = &["route_text_color", "routeTextColor"];
const TRIP_ID: &[&str] = &["trip_id", "TripID"];
const TRIP_ROUTE_ID: &[&str] = &["route_id", "RouteID"];
const STOP_ID: &[&str] = &["stop_id", "StopID"];
const STOP_NAME: &[&str] = &["stop_name", "stopName"];

/// Display metadata for one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMeta {
    pub route_id: String,
    pub short_name: String,
    pub long_name: Option<String>,
    /// Background colour as `#RRGGBB`.
    pub color: String,
    /// Text colour as `#RRGGBB`.
    pub text_color: String,
}

impl RouteMeta {
    /// Metadata for a route id that has no row in the routes table.
    pub fn placeholder(route_id: &str) -> Self {
        Self {
            route_id: route_id.to_string(),
            short_name: route_id.to_string(),
            long_name: None,
            color: DEFAULT_ROUTE_COLOR.to_string(),
            text_color: "#000000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceTable {
    Routes,
    Trips,
    Stops,
}

impl ReferenceTable {
    /// Routes and trips drive aggregation; stops only enrich diagnostics.
    pub fn is_required(self) -> bool {
        matches!(self, ReferenceTable::Routes | ReferenceTable::Trips)
    }
}

impl fmt::Display for ReferenceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReferenceTable::Routes => "routes",
            ReferenceTable::Trips => "trips",
            ReferenceTable::Stops => "stops",
        };
        f.write_str(name)
    }
}

/// A table that failed to load and was left empty.
#[derive(Debug, Clone)]
pub struct LoadFailure {
    pub table: ReferenceTable,
    pub message: String,
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} table: {}", self.table, self.message)
    }
}

/// In-memory lookups built from the static reference tables.
#[derive(Debug, Default)]
pub struct StaticReference {
    routes: IndexMap<String, RouteMeta>,
    short_names: HashMap<String, String>,
    trips: IndexMap<String, String>,
    stops: HashMap<String, String>,
    failures: Vec<LoadFailure>,
}

impl StaticReference {
    /// Loads all three tables, degrading each failed table to empty.
    #[tracing::instrument(skip_all, fields(routes = %files.routes.display()))]
    pub fn load(files: &StaticFiles) -> Self {
        let mut reference = StaticReference::default();

        if let Some(table) = reference.read_table(ReferenceTable::Routes, &files.routes) {
            reference.ingest_routes(&table);
        }
        if let Some(table) = reference.read_table(ReferenceTable::Trips, &files.trips) {
            reference.ingest_trips(&table);
        }
        if let Some(table) = reference.read_table(ReferenceTable::Stops, &files.stops) {
            reference.ingest_stops(&table);
        }

        info!(
            routes = reference.routes.len(),
            trips = reference.trips.len(),
            stops = reference.stops.len(),
            failures = reference.failures.len(),
            "Static reference loaded"
        );
        reference
    }

    fn read_table(&mut self, kind: ReferenceTable, path: &Path) -> Option<Table> {
        log_file_diagnostics(path);
        match Table::read(path) {
            Ok(table) => {
                info!(table = %kind, rows = table.len(), "Loaded reference table");
                Some(table)
            }
            Err(e) => {
                let message = format!("{e:#}");
                error!(
                    table = %kind,
                    path = %path.display(),
                    error = %message,
                    "Reference table load failed"
                );
                self.failures.push(LoadFailure {
                    table: kind,
                    message,
                });
                None
            }
        }
    }

    fn ingest_routes(&mut self, table: &Table) {
        for row in table.rows() {
            let Some(route_id) = row.first_of(ROUTE_ID) else {
                continue;
            };

            let color = row
                .first_of(ROUTE_COLOR)
                .and_then(normalize_hex)
                .unwrap_or_else(|| DEFAULT_ROUTE_COLOR.to_string());
            let text_color = row
                .first_of(ROUTE_TEXT_COLOR)
                .and_then(normalize_hex)
                .unwrap_or_else(|| contrasting_text_color(&color).to_string());

            let meta = RouteMeta {
                route_id: route_id.to_string(),
                short_name: row.first_of(ROUTE_SHORT_NAME).unwrap_or(route_id).to_string(),
                long_name: row.first_of(ROUTE_LONG_NAME).map(str::to_string),
                color,
                text_color,
            };

            self.short_names
                .insert(meta.short_name.clone(), meta.route_id.clone());
            self.routes.insert(meta.route_id.clone(), meta);
        }
    }

    fn ingest_trips(&mut self, table: &Table) {
        for row in table.rows() {
            if let (Some(trip_id), Some(route_id)) =
                (row.first_of(TRIP_ID), row.first_of(TRIP_ROUTE_ID))
            {
                self.trips.insert(trip_id.to_string(), route_id.to_string());
            }
        }
    }

    fn ingest_stops(&mut self, table: &Table) {
        for row in table.rows() {
            if let Some(stop_id) = row.first_of(STOP_ID) {
                let name = row.first_of(STOP_NAME).unwrap_or_default();
                self.stops.insert(stop_id.to_string(), name.to_string());
            }
        }
    }

    /// Canonical routes in table order, one entry per route id.
    pub fn routes(&self) -> impl Iterator<Item = &RouteMeta> {
        self.routes.values()
    }

    /// Looks a route up by route id, then by short name.
    pub fn route(&self, key: &str) -> Option<&RouteMeta> {
        self.routes.get(key).or_else(|| {
            self.short_names
                .get(key)
                .and_then(|route_id| self.routes.get(route_id))
        })
    }

    /// Trip id to route id, in table order.
    pub fn trips(&self) -> &IndexMap<String, String> {
        &self.trips
    }

    pub fn stop_name(&self, stop_id: &str) -> Option<&str> {
        self.stops.get(stop_id).map(String::as_str)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    /// First failure of a table the aggregation cannot run without.
    pub fn required_failure(&self) -> Option<&LoadFailure> {
        self.failures.iter().find(|f| f.table.is_required())
    }

    #[cfg(test)]
    pub(crate) fn from_text(routes: &str, trips: &str, stops: &str) -> Self {
        let mut reference = StaticReference::default();
        reference.ingest_routes(&Table::parse(routes).unwrap());
        reference.ingest_trips(&Table::parse(trips).unwrap());
        reference.ingest_stops(&Table::parse(stops).unwrap());
        reference
    }
}

fn log_file_diagnostics(path: &Path) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }

    match std::fs::metadata(path) {
        Ok(meta) => {
            let head = std::fs::read_to_string(path)
                .map(|text| text.lines().take(6).collect::<Vec<_>>().join("\n"))
                .unwrap_or_default();
            debug!(
                path = %path.display(),
                exists = true,
                size = meta.len(),
                head = %head,
                "Reference file"
            );
        }
        Err(_) => debug!(path = %path.display(), exists = false, "Reference file"),
    }
}
