//! Writing exported artifacts to disk without clobbering earlier exports.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// `genre_history_<unix-millis>.json`
pub fn metadata_file_name(millis: i64) -> String {
    format!("genre_history_{}.json", millis)
}

/// `Media_AI_Report_<unix-millis>.zip`
pub fn bundle_file_name(millis: i64) -> String {
    format!("Media_AI_Report_{}.zip", millis)
}

/// Write `bytes` to `dir/name`, appending `_N` before the extension when
/// the name is taken. Returns the path actually written.
pub fn write_artifact(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let mut target = dir.join(name);
    if target.exists() {
        target = resolve_conflict(&target);
    }
    fs::write(&target, bytes).with_context(|| format!("write {}", target.display()))?;
    tracing::debug!(path = %target.display(), bytes = bytes.len(), "artifact written");
    Ok(target)
}

fn resolve_conflict(dest: &Path) -> PathBuf {
    let stem = dest
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("export")
        .to_string();
    let ext = dest
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_string();
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut counter = 1;
    loop {
        let name = if ext.is_empty() {
            format!("{}_{}", stem, counter)
        } else {
            format!("{}_{}.{}", stem, counter, ext)
        };
        let candidate = parent.join(name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}
