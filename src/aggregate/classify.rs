use super::types::{RouteStatus, Thresholds};
use super::utility::{fraction, whole_percent};

/// Delay statistics for one route bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketStats {
    pub total_active_trips: usize,
    pub delayed_trips: usize,
    /// Delayed share as a 0.0–1.0 fraction, unrounded.
    pub delayed_fraction: f64,
    pub major_delay: bool,
}

impl BucketStats {
    /// Computes stats over normalised delays (missing delays already 0).
    pub fn from_delays(delays: &[i64], thresholds: &Thresholds) -> Self {
        let delayed_trips = delays
            .iter()
            .filter(|d| **d > thresholds.delay_minutes_threshold)
            .count();
        let major_delay = delays.iter().any(|d| *d > thresholds.major_delay_minutes);

        Self {
            total_active_trips: delays.len(),
            delayed_trips,
            delayed_fraction: fraction(delayed_trips, delays.len()),
            major_delay,
        }
    }

    pub fn percent_delayed(&self) -> u32 {
        whole_percent(self.delayed_fraction)
    }

    /// | Condition                                   | Status    |
    /// |---------------------------------------------|-----------|
    /// | any trip above the major-delay cut-off      | Delayed   |
    /// | delayed share >= percent-delayed threshold  | Delayed   |
    /// | otherwise                                   | On Time   |
    ///
    /// The share is compared unrounded.
    pub fn status(&self, thresholds: &Thresholds) -> RouteStatus {
        if self.major_delay || self.delayed_fraction >= thresholds.percent_delayed_threshold {
            RouteStatus::Delayed
        } else {
            RouteStatus::OnTime
        }
    }
}
