mod bootstrap;

use std::path::Path;

use anyhow::Result;
use takeout_core::formatting::{format_number, format_optional, format_timestamp, percentage};
use takeout_core::models::{AggregateRow, ExtractionReport, Metric, Reduction, Statistics, Window};
use takeout_core::settings::{Command, ExtractArgs, InspectArgs, Settings};
use takeout_data::aggregator::SeriesAggregator;
use takeout_data::extractor::{Extraction, Extractor};
use takeout_data::flattener::ShapeKind;
use takeout_data::inspector::{inspect_archive, FileKind};
use takeout_export::charts::{plot_aggregate_svg, plot_hour_of_day_svg};
use takeout_export::tables::{write_aggregate_csv, write_series_csv};

const RULE_WIDTH: usize = 50;
const SAMPLE_PREVIEW_CHARS: usize = 160;
const KEY_PREVIEW: usize = 10;

fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(settings.effective_log_level(), settings.log_file.as_deref())?;
    tracing::info!("Fitbit Takeout extractor v{} starting", env!("CARGO_PKG_VERSION"));

    match &settings.command {
        Command::HeartRate(args) => run_extract(Metric::HeartRate, args),
        Command::Calories(args) => run_extract(Metric::Calories, args),
        Command::Inspect(args) => run_inspect(args),
    }
}

// ── heart-rate / calories ──────────────────────────────────────────────────────

fn run_extract(metric: Metric, args: &ExtractArgs) -> Result<()> {
    let root = bootstrap::resolve_takeout(args.takeout.as_deref())?;
    bootstrap::ensure_output_dir(&args.output)?;
    let extractor = Extractor::new(metric, args.extractor_config(metric))?;

    println!("Fitbit Takeout Extractor - {}", capitalise(metric.label()));
    println!("{}", "-".repeat(RULE_WIDTH));
    println!("Extracting {} data from {}...", metric.label(), root.display());

    let Extraction { series, report } = extractor.extract_all(&root)?;
    print_report(&report);
    if series.is_empty() {
        println!("\nNo {} data found!", metric.label());
        println!("Run `fitbit-takeout inspect` to check the file layout.");
        return Ok(());
    }

    print_statistics(metric, &extractor.get_statistics(&series));

    let column = metric.value_column();
    let data_path = args.output.join(format!("{column}_data.csv"));
    let written = write_series_csv(&data_path, &series)?;
    println!("\nSaved {} {} records to {}", written, metric.label(), data_path.display());

    if args.daily {
        let daily = extractor.daily(&series);
        let path = args.output.join(format!("daily_{column}.csv"));
        write_aggregate_csv(&path, Window::Day, &daily, &extractor.aggregate_column())?;
        println!("Saved {} daily rows to {}", daily.len(), path.display());

        if args.plot {
            let title = format!("Daily {}", aggregate_title(&extractor));
            save_line_plot(&args.output.join(format!("daily_{column}.svg")), &daily, &title, metric)?;
        }
    }

    if args.hourly {
        let hourly = extractor.hourly(&series);
        let path = args.output.join(format!("hourly_{column}.csv"));
        write_aggregate_csv(&path, Window::Hour, &hourly, &extractor.aggregate_column())?;
        println!("Saved {} hourly rows to {}", hourly.len(), path.display());

        let profile = SeriesAggregator::hour_of_day(&series, Reduction::Mean);
        let profile_column = format!("{}_{}", Reduction::Mean.column_prefix(), column);
        let profile_path = args.output.join(format!("hour_of_day_{column}.csv"));
        write_aggregate_csv(&profile_path, Window::HourOfDay, &profile, &profile_column)?;
        println!("Saved hour-of-day profile to {}", profile_path.display());

        if args.plot {
            let title = format!("Hourly {}", aggregate_title(&extractor));
            save_line_plot(&args.output.join(format!("hourly_{column}.svg")), &hourly, &title, metric)?;

            let plot_path = args.output.join(format!("hour_of_day_{column}.svg"));
            let title = format!("Average {} by hour of day", metric.label());
            plot_hour_of_day_svg(&plot_path, &profile, &title, metric.unit())?;
            println!("Saved plot to {}", plot_path.display());
        }
    }

    Ok(())
}

fn save_line_plot(
    path: &Path,
    rows: &[AggregateRow],
    title: &str,
    metric: Metric,
) -> Result<()> {
    plot_aggregate_svg(path, rows, title, metric.unit())?;
    println!("Saved plot to {}", path.display());
    Ok(())
}

/// e.g. "average heart rate", "total calories".
fn aggregate_title(extractor: &Extractor) -> String {
    format!(
        "{} {}",
        extractor.config().reduction.column_prefix(),
        extractor.metric().label()
    )
}

fn print_statistics(metric: Metric, stats: &Statistics) {
    let unit = metric.unit();
    println!("\n{} statistics:", capitalise(metric.label()));
    println!("  records:        {}", format_number(stats.count as f64, 0));
    println!("  start:          {}", format_timestamp(stats.start));
    println!("  end:            {}", format_timestamp(stats.end));
    println!("  days covered:   {}", stats.days_covered);
    println!("  mean:           {} {unit}", format_optional(stats.mean, 2));
    println!("  std deviation:  {} {unit}", format_optional(stats.stddev, 2));
    println!("  min:            {} {unit}", format_optional(stats.min, 2));
    println!("  max:            {} {unit}", format_optional(stats.max, 2));
    println!("  daily average:  {} {unit}", format_optional(stats.daily_average, 2));
}

fn print_report(report: &ExtractionReport) {
    println!(
        "Parsed {} of {} file(s) ({}%)",
        report.files_parsed,
        report.files_matched,
        percentage(report.files_parsed as f64, report.files_matched as f64, 1)
    );
    if report.files_skipped > 0 {
        println!("  skipped files:      {}", report.files_skipped);
    }
    if report.records_skipped > 0 {
        println!("  skipped records:    {}", report.records_skipped);
    }
    if report.duplicates_removed > 0 {
        println!("  duplicates removed: {}", report.duplicates_removed);
    }
}

// ── inspect ────────────────────────────────────────────────────────────────────

fn run_inspect(args: &InspectArgs) -> Result<()> {
    let root = bootstrap::resolve_takeout(args.takeout.as_deref())?;
    let categories = inspect_archive(&root, args.limit)?;

    println!("Fitbit Takeout File Explorer");
    println!("{}", "-".repeat(RULE_WIDTH));
    if categories.is_empty() {
        println!("No JSON files found under {}", root.display());
        return Ok(());
    }

    for category in &categories {
        println!("\n{} ({} file(s))", category.name, category.file_count);
        for (path, structure) in &category.files {
            let name = path.strip_prefix(&root).unwrap_or(path);
            println!("  {}", name.display());

            let kind = match structure.kind {
                FileKind::List => "list",
                FileKind::Object => "object",
                FileKind::Scalar => "scalar",
            };
            let layout = match structure.shape {
                Some(ShapeKind::NestedByDate) => "nested by date",
                Some(ShapeKind::FlatList) => "flat list",
                None => "unrecognised",
            };
            println!(
                "    {kind}, {} record(s), layout: {layout}",
                structure.record_count
            );

            if !structure.keys.is_empty() {
                let mut keys: Vec<&str> = structure.keys.iter().take(KEY_PREVIEW).map(String::as_str).collect();
                if structure.keys.len() > KEY_PREVIEW {
                    keys.push("...");
                }
                println!("    keys: {}", keys.join(", "));
            }
            if let Some(sample) = &structure.sample {
                let text = sample.to_string();
                let preview: String = text.chars().take(SAMPLE_PREVIEW_CHARS).collect();
                let ellipsis = if text.chars().count() > SAMPLE_PREVIEW_CHARS { "..." } else { "" };
                println!("    sample: {preview}{ellipsis}");
            }
        }
    }

    Ok(())
}

fn capitalise(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
