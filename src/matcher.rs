//! Fuzzy resolution of realtime trip ids to static route ids.
//!
//! Realtime vendors rarely echo static trip ids verbatim: they add agency
//! prefixes (`agency:1234`), block suffixes (`RT84_1200`) or strip letters.
//! [`TripMatcher`] tries, in order, an exact hit, a hit on any variant of the
//! id, and finally bidirectional substring containment against every indexed
//! variant. Ties always go to the earliest inserted index key, which keeps the
//! output stable between runs over the same inputs.

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

/// Unmatched ids kept for diagnostics before the sample is reset.
const UNMATCHED_SOFT_CAP: usize = 1000;

/// Expands a trip id into its lookup variants, in lookup order.
///
/// Variants: the trimmed id, the part after the last `:`, the part before the
/// first `_`, the digits only, and the 2-, 3- and 4-character prefixes.
/// Empty and repeated variants are dropped.
pub fn trip_id_variants(trip_id: &str) -> Vec<String> {
    let s = trip_id.trim();
    if s.is_empty() {
        return Vec::new();
    }

    let mut variants: IndexSet<String> = IndexSet::new();
    variants.insert(s.to_string());
    variants.insert(s.rsplit(':').next().unwrap_or(s).to_string());
    variants.insert(s.split('_').next().unwrap_or(s).to_string());
    variants.insert(s.chars().filter(char::is_ascii_digit).collect());

    let len = s.chars().count();
    for n in 2..=4 {
        if len >= n {
            variants.insert(s.chars().take(n).collect());
        }
    }

    variants.into_iter().filter(|v| !v.is_empty()).collect()
}

/// Per-run trip id resolver over the static trips table.
#[derive(Debug)]
pub struct TripMatcher<'a> {
    trips: &'a IndexMap<String, String>,
    index: IndexMap<String, String>,
    unmatched: IndexSet<String>,
}

impl<'a> TripMatcher<'a> {
    /// Builds the variant index; the first trip to produce a variant owns it.
    pub fn new(trips: &'a IndexMap<String, String>) -> Self {
        let mut index = IndexMap::new();
        for (trip_id, route_id) in trips {
            for variant in trip_id_variants(trip_id) {
                index.entry(variant).or_insert_with(|| route_id.clone());
            }
        }
        debug!(entries = index.len(), "Trip id index built");

        Self {
            trips,
            index,
            unmatched: IndexSet::new(),
        }
    }

    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// Resolves `trip_id` to a route id, recording it as unmatched on a miss.
    pub fn lookup_route(&mut self, trip_id: &str) -> Option<String> {
        let t = trip_id.trim();
        if t.is_empty() {
            return None;
        }

        if let Some(route_id) = self.trips.get(t) {
            return Some(route_id.clone());
        }

        if let Some(route_id) = trip_id_variants(t)
            .iter()
            .find_map(|variant| self.index.get(variant))
        {
            return Some(route_id.clone());
        }

        if let Some(route_id) = self
            .index
            .iter()
            .find(|(key, _)| t.contains(key.as_str()) || key.contains(t))
            .map(|(_, route_id)| route_id)
        {
            return Some(route_id.clone());
        }

        self.record_unmatched(t);
        None
    }

    fn record_unmatched(&mut self, trip_id: &str) {
        self.unmatched.insert(trip_id.to_string());
        if self.unmatched.len() > UNMATCHED_SOFT_CAP {
            self.unmatched.clear();
        }
    }

    /// Unmatched ids seen so far, oldest first.
    pub fn unmatched(&self) -> impl Iterator<Item = &str> {
        self.unmatched.iter().map(String::as_str)
    }

    pub fn unmatched_count(&self) -> usize {
        self.unmatched.len()
    }
}
