//! Protobuf parser for GTFS Realtime feeds.

use anyhow::{Context, Result};
use prost::Message;

use crate::gtfs_rt::FeedMessage;

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// The whole message is decoded in memory; there is no streaming path.
///
/// # Errors
///
/// Returns an error if the bytes are not valid protobuf for a `FeedMessage`.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage> {
    FeedMessage::decode(bytes).context("malformed GTFS-RT feed message")
}
