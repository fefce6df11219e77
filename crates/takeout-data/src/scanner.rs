//! Export directory traversal.
//!
//! Finds the JSON files belonging to a metric anywhere below the Takeout
//! root. Matching looks at the file name only, never at parent directories.

use std::path::{Path, PathBuf};

use regex::Regex;
use takeout_core::{Result, TakeoutError};
use tracing::{debug, warn};

// ── Public API ────────────────────────────────────────────────────────────────

/// Find every file below `root` whose name matches `pattern`, sorted by path.
///
/// A root without any matching file yields an empty vec. Fails with
/// [`TakeoutError::NotFound`] when `root` is missing or not a directory.
pub fn find_metric_files(root: &Path, pattern: &Regex) -> Result<Vec<PathBuf>> {
    let files = walk_files(root, |name| pattern.is_match(name))?;
    debug!(
        "Scanner: {} file(s) under {} match {}",
        files.len(),
        root.display(),
        pattern.as_str()
    );
    Ok(files)
}

/// Find every `.json` file below `root`, sorted by path.
pub fn find_json_files(root: &Path) -> Result<Vec<PathBuf>> {
    walk_files(root, |name| name.to_ascii_lowercase().ends_with(".json"))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn ensure_root(root: &Path) -> Result<()> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(TakeoutError::NotFound(root.to_path_buf()))
    }
}

fn walk_files(root: &Path, accept: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    ensure_root(root)?;

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                None
            }
        })
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_str()
                    .map(&accept)
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    Ok(files)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
