//! Output formatting and local persistence for dashboard documents.
//!
//! Each run is written as a dated snapshot plus a `latest.json` copy.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const LATEST_FILE: &str = "latest.json";

/// File name of the snapshot for `date`, e.g. `2024-03-22.json`.
pub fn snapshot_name(date: NaiveDate) -> String {
    format!("{}.json", date.format("%Y-%m-%d"))
}

/// Logs a value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes `value` to `<dir>/<date>.json` and `<dir>/latest.json`.
///
/// Creates `dir` if needed. Returns the snapshot path.
pub fn write_snapshot(dir: &Path, date: NaiveDate, value: &impl Serialize) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let body = serde_json::to_vec(value)?;

    let snapshot = dir.join(snapshot_name(date));
    std::fs::write(&snapshot, &body).with_context(|| format!("writing {}", snapshot.display()))?;
    debug!(path = %snapshot.display(), bytes = body.len(), "Snapshot written");

    let latest = dir.join(LATEST_FILE);
    std::fs::write(&latest, &body).with_context(|| format!("writing {}", latest.display()))?;

    Ok(snapshot)
}
