//! Service-alert overlay.

use std::collections::HashSet;
use tracing::info;

use crate::aggregate::types::{RouteStatus, RouteStatusResult};
use crate::gtfs_rt::FeedMessage;

/// Route ids (or short names) named by any alert's informed entities.
pub fn alerted_routes(feed: &FeedMessage) -> HashSet<String> {
    feed.entity
        .iter()
        .filter_map(|e| e.alert.as_ref())
        .flat_map(|alert| alert.informed_entity.iter())
        .filter_map(|selector| selector.route_id.as_deref())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Marks every result whose route id or short name is alerted as
/// [`RouteStatus::ServiceAlert`]. Counts and samples are left as computed.
pub fn apply_alerts(results: &mut [RouteStatusResult], alert_feed: Option<&FeedMessage>) {
    let Some(feed) = alert_feed else {
        return;
    };

    let alerted = alerted_routes(feed);
    if alerted.is_empty() {
        return;
    }

    let mut marked = 0;
    for result in results.iter_mut() {
        if alerted.contains(&result.route_id) || alerted.contains(&result.route_short_name) {
            result.status = RouteStatus::ServiceAlert;
            marked += 1;
        }
    }
    info!(alerted = alerted.len(), marked, "Service alerts applied");
}
