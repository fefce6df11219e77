//! Structure inspection for unfamiliar exports.
//!
//! Reports how each JSON file is laid out so that a user can tell which
//! metric families an export contains and whether the flattener will
//! recognise them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use takeout_core::{Result, TakeoutError};
use tracing::{debug, warn};

use crate::flattener::{RecordShape, ShapeKind};
use crate::scanner::find_json_files;

// ── Public types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    List,
    Object,
    Scalar,
}

/// Layout summary of one JSON file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileStructure {
    pub kind: FileKind,
    /// Elements of a list, or of an object's first non-empty list (else its
    /// key count), `1` for a scalar.
    pub record_count: usize,
    /// Top-level keys of an object, or keys of a list's first record.
    pub keys: Vec<String>,
    /// Layout the flattener would use, if it recognises the file.
    pub shape: Option<ShapeKind>,
    pub sample: Option<Value>,
}

/// Files sharing a name prefix, e.g. every `heart_rate-*.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct FileCategory {
    pub name: String,
    /// Number of files in the category, including ones not examined.
    pub file_count: usize,
    /// Up to `limit` examined files, sorted by path.
    pub files: Vec<(PathBuf, FileStructure)>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Read and describe a single JSON file.
pub fn examine_file(path: &Path) -> Result<FileStructure> {
    let content = std::fs::read_to_string(path).map_err(|source| TakeoutError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content)?;
    Ok(describe(&value))
}

/// Group every JSON file below `root` by category and examine up to `limit`
/// files per category. Files that fail to parse are logged and left out of
/// `files` but still counted in `file_count`.
pub fn inspect_archive(root: &Path, limit: usize) -> Result<Vec<FileCategory>> {
    let mut grouped: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for path in find_json_files(root)? {
        grouped.entry(category_of(&path)).or_default().push(path);
    }

    debug!(
        "Inspector: {} categor(ies) under {}",
        grouped.len(),
        root.display()
    );

    let categories = grouped
        .into_iter()
        .map(|(name, paths)| {
            let files = paths
                .iter()
                .take(limit)
                .filter_map(|path| match examine_file(path) {
                    Ok(structure) => Some((path.clone(), structure)),
                    Err(e) => {
                        warn!("Could not examine {}: {}", path.display(), e);
                        None
                    }
                })
                .collect();
            FileCategory {
                name,
                file_count: paths.len(),
                files,
            }
        })
        .collect();

    Ok(categories)
}

/// Category name for a file: its stem up to the first `-`.
pub fn category_of(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    stem.split('-').next().unwrap_or(stem).to_string()
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn describe(value: &Value) -> FileStructure {
    let shape = RecordShape::sniff(value).map(|s| s.kind());
    match value {
        Value::Array(items) => FileStructure {
            kind: FileKind::List,
            record_count: items.len(),
            keys: items.first().map(object_keys).unwrap_or_default(),
            shape,
            sample: items.first().cloned(),
        },
        Value::Object(map) => {
            // Wrapped exports keep their records in the first non-empty list.
            let records = map.values().find_map(|v| match v {
                Value::Array(items) if !items.is_empty() => Some(items),
                _ => None,
            });
            let (record_count, sample) = match records {
                Some(items) => (items.len(), items.first()),
                None => (map.len(), map.values().next()),
            };
            FileStructure {
                kind: FileKind::Object,
                record_count,
                keys: map.keys().cloned().collect(),
                shape,
                sample: sample.cloned(),
            }
        }
        other => FileStructure {
            kind: FileKind::Scalar,
            record_count: 1,
            keys: Vec::new(),
            shape,
            sample: Some(other.clone()),
        },
    }
}

fn object_keys(value: &Value) -> Vec<String> {
    value
        .as_object()
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
