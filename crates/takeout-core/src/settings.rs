use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::models::{DuplicatePolicy, Metric, Reduction};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Extract heart rate and calories time series from a Fitbit Google Takeout export
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fitbit-takeout",
    about = "Extract heart rate and calories time series from a Fitbit Google Takeout export",
    version
)]
pub struct Settings {
    /// Logging level
    #[arg(
        long,
        global = true,
        default_value = "INFO",
        value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"]
    )]
    pub log_level: String,

    /// Append log output to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Extract heart rate data
    HeartRate(ExtractArgs),
    /// Extract calories data
    Calories(ExtractArgs),
    /// Summarise the layout of every JSON file in the export
    Inspect(InspectArgs),
}

/// Options shared by the metric extraction commands.
#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Path to the Google Takeout directory (searched for when omitted)
    #[arg(short, long, env = "FITBIT_TAKEOUT_DIR")]
    pub takeout: Option<PathBuf>,

    /// Output directory for CSV files and plots
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Write per-day aggregates
    #[arg(short, long)]
    pub daily: bool,

    /// Write per-hour aggregates and the hour-of-day profile
    #[arg(long)]
    pub hourly: bool,

    /// Render SVG plots for the requested aggregates
    #[arg(short, long)]
    pub plot: bool,

    /// Process at most this many matching files (0 means all)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Which sample wins when several share a timestamp
    #[arg(long, value_enum, default_value_t = DuplicatePolicy::FirstSeen)]
    pub duplicates: DuplicatePolicy,

    /// Reduction for aggregates (defaults to mean for heart rate, sum for calories)
    #[arg(long, value_enum)]
    pub reduction: Option<Reduction>,

    /// Override the file-name regex used to find the metric's files
    #[arg(long)]
    pub pattern: Option<String>,
}

/// Options for the `inspect` command.
#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Path to the Google Takeout directory (searched for when omitted)
    #[arg(short, long, env = "FITBIT_TAKEOUT_DIR")]
    pub takeout: Option<PathBuf>,

    /// Examine at most this many files per category
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

// ── ExtractorConfig ────────────────────────────────────────────────────────────

/// Per-extractor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Reduction applied by daily/hourly aggregation.
    pub reduction: Reduction,
    /// Conflict resolution for repeated timestamps.
    pub duplicate_policy: DuplicatePolicy,
    /// Only the first N matching files (in path order) are read. Never
    /// `Some(0)`; zero means no limit.
    pub file_limit: Option<usize>,
    /// File-name regex replacing the metric's default pattern.
    pub file_pattern: Option<String>,
}

impl ExtractorConfig {
    /// Defaults for `metric`: its natural reduction, first-seen duplicates,
    /// no file limit, default pattern.
    pub fn for_metric(metric: Metric) -> Self {
        Self {
            reduction: metric.default_reduction(),
            duplicate_policy: DuplicatePolicy::default(),
            file_limit: None,
            file_pattern: None,
        }
    }

    pub fn with_reduction(mut self, reduction: Reduction) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Limit the number of files read; `0` removes the limit.
    pub fn with_file_limit(mut self, limit: usize) -> Self {
        self.file_limit = (limit > 0).then_some(limit);
        self
    }

    pub fn with_file_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.file_pattern = Some(pattern.into());
        self
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments.
    pub fn load() -> Self {
        Settings::parse()
    }

    /// The log level after applying `--debug`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }
}

impl ExtractArgs {
    /// Merge the command-line options over the defaults for `metric`.
    pub fn extractor_config(&self, metric: Metric) -> ExtractorConfig {
        let mut config = ExtractorConfig::for_metric(metric).with_duplicate_policy(self.duplicates);
        if let Some(reduction) = self.reduction {
            config = config.with_reduction(reduction);
        }
        if let Some(limit) = self.limit {
            config = config.with_file_limit(limit);
        }
        if let Some(pattern) = &self.pattern {
            config = config.with_file_pattern(pattern.clone());
        }
        config
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn extract_args(settings: Settings) -> ExtractArgs {
        match settings.command {
            Command::HeartRate(args) | Command::Calories(args) => args,
            Command::Inspect(_) => panic!("expected an extraction command"),
        }
    }

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["fitbit-takeout", "heart-rate", "--takeout", "/data/Takeout"]);
        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.debug);
        assert!(settings.log_file.is_none());

        let args = extract_args(settings);
        assert_eq!(args.takeout, Some(PathBuf::from("/data/Takeout")));
        assert_eq!(args.output, PathBuf::from("."));
        assert!(!args.daily);
        assert!(!args.hourly);
        assert!(!args.plot);
        assert!(args.limit.is_none());
        assert_eq!(args.duplicates, DuplicatePolicy::FirstSeen);
        assert!(args.reduction.is_none());
    }

    #[test]
    fn test_settings_short_flags() {
        let settings = Settings::parse_from([
            "fitbit-takeout", "calories", "-t", "/t", "-o", "/out", "-d", "-p", "-l", "3",
        ]);
        assert!(matches!(settings.command, Command::Calories(_)));
        let args = extract_args(settings);
        assert_eq!(args.output, PathBuf::from("/out"));
        assert!(args.daily);
        assert!(args.plot);
        assert_eq!(args.limit, Some(3));
    }

    #[test]
    fn test_settings_enum_flags() {
        let settings = Settings::parse_from([
            "fitbit-takeout", "heart-rate", "--duplicates", "last", "--reduction", "max", "--hourly",
        ]);
        let args = extract_args(settings);
        assert!(args.hourly);
        assert_eq!(args.duplicates, DuplicatePolicy::LastSeen);
        assert_eq!(args.reduction, Some(Reduction::Max));
    }

    #[test]
    fn test_settings_rejects_unknown_reduction() {
        let result = Settings::try_parse_from(["fitbit-takeout", "calories", "--reduction", "median"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_debug_overrides_log_level() {
        let settings = Settings::parse_from(["fitbit-takeout", "--debug", "inspect"]);
        assert_eq!(settings.effective_log_level(), "DEBUG");

        let settings = Settings::parse_from(["fitbit-takeout", "inspect", "--log-level", "WARNING"]);
        assert_eq!(settings.effective_log_level(), "WARNING");
    }

    #[test]
    fn test_inspect_defaults() {
        let settings = Settings::parse_from(["fitbit-takeout", "inspect", "-t", "/t"]);
        match settings.command {
            Command::Inspect(args) => {
                assert_eq!(args.limit, 20);
                assert_eq!(args.takeout, Some(PathBuf::from("/t")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_extractor_config_defaults_per_metric() {
        let hr = ExtractorConfig::for_metric(Metric::HeartRate);
        assert_eq!(hr.reduction, Reduction::Mean);
        assert_eq!(hr.duplicate_policy, DuplicatePolicy::FirstSeen);
        assert!(hr.file_limit.is_none());

        let cal = ExtractorConfig::for_metric(Metric::Calories);
        assert_eq!(cal.reduction, Reduction::Sum);
    }

    #[test]
    fn test_extract_args_to_config() {
        let settings = Settings::parse_from([
            "fitbit-takeout", "calories", "--limit", "5", "--pattern", "^kcal.*\\.json$", "--duplicates", "mean",
        ]);
        let config = extract_args(settings).extractor_config(Metric::Calories);
        assert_eq!(config.reduction, Reduction::Sum);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Mean);
        assert_eq!(config.file_limit, Some(5));
        assert_eq!(config.file_pattern.as_deref(), Some("^kcal.*\\.json$"));
    }

    #[test]
    fn test_zero_file_limit_means_no_limit() {
        let config = ExtractorConfig::for_metric(Metric::Calories).with_file_limit(0);
        assert!(config.file_limit.is_none());

        let settings = Settings::parse_from(["fitbit-takeout", "calories", "--limit", "0"]);
        let config = extract_args(settings).extractor_config(Metric::Calories);
        assert!(config.file_limit.is_none());
    }
}
