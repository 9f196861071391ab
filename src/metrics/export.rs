use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

use super::logger::MetricsSnapshot;

pub fn snapshot_file_name(at: &DateTime<Local>) -> String {
    format!("quality_metrics_{}.txt", at.format("%Y%m%d_%H%M%S_%3f"))
}

/// スナップショットをテキストとして `dir` に書き出す
pub fn write_snapshot(dir: &Path, snapshot: &MetricsSnapshot, at: &DateTime<Local>) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create metrics directory: {}", dir.display()))?;
    let path = dir.join(snapshot_file_name(at));
    fs::write(&path, snapshot.to_record(at))
        .with_context(|| format!("Failed to write metrics snapshot: {}", path.display()))?;
    Ok(path)
}
