use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context};
use takeout_core::TakeoutError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How many directories (starting with the working directory) are searched
/// for a `Takeout` folder when no path is given.
pub const MAX_SEARCH_LEVELS: usize = 5;

const TAKEOUT_DIR_NAME: &str = "Takeout";

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map the CLI level names onto `tracing` filter directives.
fn normalise_level(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_lowercase(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Output goes to stderr, or is appended to `log_file` (without ANSI colours)
/// when one is given. Unknown level names fall back to `info`.
pub fn setup_logging(log_level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(normalise_level(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };
    let stderr_layer = file_layer
        .is_none()
        .then(|| fmt::layer().with_target(false).with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

// ── Takeout discovery ──────────────────────────────────────────────────────────

/// Look for a `Takeout` directory in `start` and up to `max_levels - 1` of
/// its parents, nearest first.
pub fn discover_takeout_dir(start: &Path, max_levels: usize) -> Option<PathBuf> {
    start
        .ancestors()
        .take(max_levels)
        .map(|dir| dir.join(TAKEOUT_DIR_NAME))
        .find(|candidate| candidate.is_dir())
}

/// `Takeout` folders in the usual download locations.
fn well_known_takeout_dir() -> Option<PathBuf> {
    [dirs::download_dir(), dirs::home_dir()]
        .into_iter()
        .flatten()
        .map(|dir| dir.join(TAKEOUT_DIR_NAME))
        .find(|candidate| candidate.is_dir())
}

/// Resolve the export root from `--takeout`, or search for one.
///
/// An explicit path that is not a directory fails with
/// [`TakeoutError::NotFound`] naming it.
pub fn resolve_takeout(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    let root = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let cwd = std::env::current_dir().context("Failed to read the working directory")?;
            discover_takeout_dir(&cwd, MAX_SEARCH_LEVELS)
                .or_else(well_known_takeout_dir)
                .ok_or_else(|| {
                    anyhow!(
                        "Could not find a Takeout directory near {}; pass --takeout or set FITBIT_TAKEOUT_DIR",
                        cwd.display()
                    )
                })?
        }
    };

    if !root.is_dir() {
        return Err(TakeoutError::NotFound(root).into());
    }
    tracing::debug!("Using Takeout directory {}", root.display());
    Ok(root)
}

/// Create the output directory (and parents) if it does not exist yet.
pub fn ensure_output_dir(dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalise_level() {
        assert_eq!(normalise_level("DEBUG"), "debug");
        assert_eq!(normalise_level("WARNING"), "warn");
        assert_eq!(normalise_level("CRITICAL"), "error");
        assert_eq!(normalise_level("trace"), "trace");
    }

    #[test]
    fn test_setup_logging_unwritable_log_file() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("missing").join("run.log");
        assert!(setup_logging("INFO", Some(&path)).is_err());
    }

    // ── discover_takeout_dir ──────────────────────────────────────────────────

    #[test]
    fn test_discover_takeout_in_start_dir() {
        let tmp = TempDir::new().expect("tempdir");
        let takeout = tmp.path().join("Takeout");
        std::fs::create_dir_all(&takeout).expect("create Takeout");

        assert_eq!(discover_takeout_dir(tmp.path(), MAX_SEARCH_LEVELS), Some(takeout));
    }

    #[test]
    fn test_discover_takeout_in_parent() {
        let tmp = TempDir::new().expect("tempdir");
        let takeout = tmp.path().join("Takeout");
        let nested = tmp.path().join("a").join("b").join("c");
        std::fs::create_dir_all(&takeout).expect("create Takeout");
        std::fs::create_dir_all(&nested).expect("create nested");

        assert_eq!(discover_takeout_dir(&nested, MAX_SEARCH_LEVELS), Some(takeout));
    }

    #[test]
    fn test_discover_takeout_respects_level_limit() {
        let tmp = TempDir::new().expect("tempdir");
        std::fs::create_dir_all(tmp.path().join("Takeout")).expect("create Takeout");
        let nested = tmp.path().join("a").join("b").join("c").join("d").join("e");
        std::fs::create_dir_all(&nested).expect("create nested");

        assert_eq!(discover_takeout_dir(&nested, MAX_SEARCH_LEVELS), None);
    }

    #[test]
    fn test_discover_takeout_ignores_plain_files() {
        let tmp = TempDir::new().expect("tempdir");
        std::fs::write(tmp.path().join("Takeout"), "not a dir").expect("write file");

        assert_eq!(discover_takeout_dir(tmp.path(), 1), None);
    }

    // ── resolve_takeout / ensure_output_dir ───────────────────────────────────

    #[test]
    fn test_resolve_takeout_explicit() {
        let tmp = TempDir::new().expect("tempdir");
        let resolved = resolve_takeout(Some(tmp.path())).expect("resolve");
        assert_eq!(resolved, tmp.path());
    }

    #[test]
    fn test_resolve_takeout_missing_path_names_it() {
        let err = resolve_takeout(Some(Path::new("/tmp/no-such-takeout-dir-xyz"))).unwrap_err();
        assert!(err.to_string().contains("/tmp/no-such-takeout-dir-xyz"));
        assert!(matches!(
            err.downcast_ref::<TakeoutError>(),
            Some(TakeoutError::NotFound(_))
        ));
    }

    #[test]
    fn test_ensure_output_dir_creates_parents() {
        let tmp = TempDir::new().expect("tempdir");
        let out = tmp.path().join("out").join("fitbit");
        ensure_output_dir(&out).expect("create output");
        assert!(out.is_dir());
    }
}
