use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Filter and classify exported Windows event-log records
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Classification reference table (CSV) replacing the built-in one
    #[arg(long, global = true, env = "WINLOG_TRIAGE_CLASSIFICATION")]
    pub classification: Option<PathBuf>,

    /// When to use colored output
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress and diagnostics, errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stream matching records to stdout or a file
    Filter {
        /// Input record CSV file
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        criteria: FilterArgs,

        /// Output format for matching records
        #[arg(short = 'F', long, value_enum, default_value_t = SinkFormat::Csv)]
        format: SinkFormat,
    },
    /// Aggregate matching records per event id and join the classification table
    Analyze {
        /// Input record CSV file
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        criteria: FilterArgs,

        /// Report format
        #[arg(short = 'F', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show dataset statistics for the matching records
    Info {
        /// Input record CSV file
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        criteria: FilterArgs,

        /// Overview format
        #[arg(short = 'F', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// Filter criteria shared by every subcommand. All optional; present
/// criteria are ANDed together.
#[derive(Debug, Clone, clap::Args)]
pub struct FilterArgs {
    /// Restrict to the given log types (e.g. "System", "Security")
    #[arg(long, num_args = 1.., value_name = "TYPE")]
    pub log_types: Vec<String>,

    /// Restrict to the given sources (provider names)
    #[arg(long, num_args = 1.., value_name = "SOURCE")]
    pub sources: Vec<String>,

    /// Restrict to the given event types (e.g. "ERROR", "WARNING")
    #[arg(long, num_args = 1.., value_name = "TYPE")]
    pub event_types: Vec<String>,

    /// Restrict to the given numeric event ids
    #[arg(long, num_args = 1.., value_name = "ID")]
    pub event_ids: Vec<u32>,

    /// Only records whose message contains this text (case-insensitive)
    #[arg(long, value_name = "TEXT")]
    pub message_contains: Option<String>,

    /// Only records whose message matches this regex (case-insensitive)
    #[arg(long, value_name = "PATTERN")]
    pub message_regex: Option<String>,

    /// Absolute window start (YYYY-MM-DD [HH:MM[:SS]])
    #[arg(long, value_name = "DATETIME")]
    pub start_time: Option<String>,

    /// Absolute window end, exclusive (YYYY-MM-DD [HH:MM[:SS]])
    #[arg(long, value_name = "DATETIME")]
    pub end_time: Option<String>,

    /// Only records from the last N minutes (adds to --last-hours)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..=1_000_000_000))]
    pub last_minutes: Option<u64>,

    /// Only records from the last N hours (adds to --last-minutes)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..=10_000_000))]
    pub last_hours: Option<u64>,

    /// Only records from today (midnight to now)
    #[arg(long)]
    pub today: bool,

    /// Weekday tokens: one day, a two-day cyclic range, or an explicit set
    #[arg(long, num_args = 1.., value_name = "DAY")]
    pub day_of_week: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Colors when stdout is a terminal
    Auto,
    /// Always emit colors
    Always,
    /// Never emit colors
    Never,
}

/// Report output formats (analyze, info).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Record output formats (filter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkFormat {
    Csv,
    Json,
}

pub fn cli_parse() -> Cli {
    Cli::parse()
}
