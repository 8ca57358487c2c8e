//! Pulse snapshot persistence.
//!
//! The snapshot is always replaced as a whole: it is written to a temporary
//! file beside the target and renamed over it, so a reader sees either the
//! previous snapshot or the new one.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::aggregate::types::RouteStatusResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PulseSnapshot {
    pub updated_at: DateTime<Utc>,
    pub routes: Vec<RouteStatusResult>,
}

impl PulseSnapshot {
    /// Snapshot with no routes, written when a run fails.
    pub fn degraded(updated_at: DateTime<Utc>) -> Self {
        Self {
            updated_at,
            routes: Vec::new(),
        }
    }
}

/// Atomically writes `snapshot` as pretty-printed JSON to `path`.
pub fn write_snapshot(path: &Path, snapshot: &PulseSnapshot) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create '{}'", dir.display()))?;

    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in '{}'", dir.display()))?;
    serde_json::to_writer_pretty(&mut file, snapshot)?;
    file.write_all(b"\n")?;
    file.flush()?;
    debug!(temp = %file.path().display(), "Snapshot staged");

    file.persist(path)
        .with_context(|| format!("failed to replace '{}'", path.display()))?;

    info!(path = %path.display(), routes = snapshot.routes.len(), "Snapshot written");
    Ok(())
}
