pub mod analysis;
pub mod classification;
pub mod cli;
pub mod filter;
pub mod pipeline;
pub mod record;

use anyhow::Context;
use std::io::Write;
use std::path::Path;

use crate::classification::{Classification, ClassificationTable};
use crate::filter::{FilterOptions, RecordFilter, parse_time_bound, print_filter_warnings};
use crate::pipeline::{
    CsvSink, JsonSink, PipelineError, PipelineSummary, RecordReader, RecordSink, run_pipeline,
};
use crate::record::EventRecord;
pub use classification::{ClassificationEntry, Severity};
pub use cli::{Cli, ColorMode, Commands, FilterArgs, OutputFormat, SinkFormat, cli_parse};
pub use filter::{TimeWindow, WeekdaySelection};
pub use record::RecordError;

/// Build the structured filter options from the parsed CLI criteria. Time
/// bound literals are the only fields needing conversion; everything else
/// maps across directly.
fn build_filter_options(args: &cli::FilterArgs) -> anyhow::Result<FilterOptions> {
    let start_time = args
        .start_time
        .as_deref()
        .map(parse_time_bound)
        .transpose()?;
    let end_time = args.end_time.as_deref().map(parse_time_bound).transpose()?;

    Ok(FilterOptions::new()
        .with_log_types(args.log_types.clone())
        .with_sources(args.sources.clone())
        .with_event_types(args.event_types.clone())
        .with_event_ids(args.event_ids.clone())
        .with_message_contains(args.message_contains.as_deref())
        .with_message_regex(args.message_regex.as_deref())
        .with_time_bounds(start_time, end_time)
        .with_last_minutes(args.last_minutes)
        .with_last_hours(args.last_hours)
        .with_today(args.today)
        .with_days(args.day_of_week.clone()))
}

/// Resolve the classification table: an explicit path replaces the built-in
/// table entirely.
fn load_classification_table(
    path: Option<&Path>,
) -> anyhow::Result<std::borrow::Cow<'static, ClassificationTable>> {
    match path {
        Some(path) => {
            let table = ClassificationTable::from_path(path).with_context(|| {
                format!("failed to load classification table '{}'", path.display())
            })?;
            tracing::debug!(
                entries = table.len(),
                duplicates = table.duplicate_count(),
                "loaded classification table from {}",
                path.display()
            );
            Ok(std::borrow::Cow::Owned(table))
        }
        None => Ok(std::borrow::Cow::Borrowed(ClassificationTable::builtin())),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    // RUST_LOG wins over the CLI flags when set.
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::new(match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        })
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn apply_color_mode(mode: ColorMode) {
    match mode {
        ColorMode::Always => unsafe {
            std::env::set_var("CLICOLOR_FORCE", "1");
        },
        ColorMode::Never => unsafe {
            std::env::set_var("NO_COLOR", "1");
        },
        ColorMode::Auto => {
            // Let the terminal decide.
        }
    }
}

fn write_output_file(path: &Path, content: &str) -> anyhow::Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("failed to write output file '{}'", path.display()))
}

/// Spinner shown while streaming records, hidden when quiet (indicatif
/// already hides itself when stderr is not a terminal).
fn progress_spinner(quiet: bool) -> indicatif::ProgressBar {
    if quiet {
        return indicatif::ProgressBar::hidden();
    }
    let spinner = indicatif::ProgressBar::new_spinner();
    spinner.set_message("reading records");
    spinner
}

/// Sink that keeps matched records in memory for the aggregation commands.
#[derive(Default)]
struct CollectSink {
    records: Vec<EventRecord>,
}

impl RecordSink for CollectSink {
    fn write(
        &mut self,
        record: &EventRecord,
        _classification: Classification<'_>,
    ) -> Result<(), PipelineError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// Run the pipeline collecting matched records, shared by `analyze` and
/// `info`.
fn collect_matching(
    input: &Path,
    filter: &RecordFilter,
    table: &ClassificationTable,
    quiet: bool,
) -> anyhow::Result<(Vec<EventRecord>, PipelineSummary)> {
    let reader = RecordReader::from_path(input)?;
    let spinner = progress_spinner(quiet);
    let mut sink = CollectSink::default();
    let summary = run_pipeline(spinner.wrap_iter(reader), &mut sink, filter, table)?;
    spinner.finish_and_clear();
    Ok((sink.records, summary))
}

fn log_summary(summary: &PipelineSummary) {
    tracing::info!(
        "matched {} of {} records ({} malformed rows skipped)",
        summary.matched,
        summary.rows_read,
        summary.skipped
    );
}

pub fn run(cli: &Cli) -> anyhow::Result<()> {
    init_logging(cli.verbose, cli.quiet);
    apply_color_mode(cli.color);

    let table = load_classification_table(cli.classification.as_deref())?;
    let now = chrono::Local::now().naive_local();

    match &cli.command {
        Commands::Filter {
            input,
            criteria,
            format,
        } => {
            let options = build_filter_options(criteria)?;
            print_filter_warnings(&options);
            let filter = RecordFilter::compile(&options, now)?;
            tracing::debug!(window = ?filter.window(), "compiled record filter");

            let reader = RecordReader::from_path(input)?;
            let spinner = progress_spinner(cli.quiet);
            let writer: Box<dyn Write> = match &cli.output {
                Some(path) => Box::new(std::fs::File::create(path).with_context(|| {
                    format!("failed to create output file '{}'", path.display())
                })?),
                None => Box::new(std::io::stdout()),
            };

            let summary = match format {
                SinkFormat::Csv => {
                    let mut sink = CsvSink::new(writer);
                    run_pipeline(spinner.wrap_iter(reader), &mut sink, &filter, &table)?
                }
                SinkFormat::Json => {
                    let mut sink = JsonSink::new(writer);
                    run_pipeline(spinner.wrap_iter(reader), &mut sink, &filter, &table)?
                }
            };
            spinner.finish_and_clear();
            log_summary(&summary);
        }
        Commands::Analyze {
            input,
            criteria,
            format,
        } => {
            let options = build_filter_options(criteria)?;
            print_filter_warnings(&options);
            let filter = RecordFilter::compile(&options, now)?;

            let (records, summary) = collect_matching(input, &filter, &table, cli.quiet)?;
            let report = analysis::analyze(&records, &table, summary.skipped);

            let rendered = match format {
                OutputFormat::Text => analysis::render_analysis_text(&report),
                OutputFormat::Json => {
                    let mut json = serde_json::to_string_pretty(&report)
                        .context("failed to serialize analysis report")?;
                    json.push('\n');
                    json
                }
            };
            print!("{rendered}");
            if let Some(path) = &cli.output {
                write_output_file(path, &rendered)?;
            }
            log_summary(&summary);
        }
        Commands::Info {
            input,
            criteria,
            format,
        } => {
            let options = build_filter_options(criteria)?;
            print_filter_warnings(&options);
            let filter = RecordFilter::compile(&options, now)?;

            let (records, summary) = collect_matching(input, &filter, &table, cli.quiet)?;
            let stats = analysis::collect_stats(&records, &table, &summary);

            let rendered = match format {
                OutputFormat::Text => analysis::render_stats_text(&stats),
                OutputFormat::Json => {
                    let mut json = serde_json::to_string_pretty(&stats)
                        .context("failed to serialize dataset overview")?;
                    json.push('\n');
                    json
                }
            };
            print!("{rendered}");
            if let Some(path) = &cli.output {
                write_output_file(path, &rendered)?;
            }
        }
    }

    Ok(())
}
