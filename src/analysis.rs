//! Post-filter aggregation: per-event analysis report and dataset overview

use crate::classification::{ClassificationTable, Severity};
use crate::pipeline::PipelineSummary;
use crate::record::{EventRecord, serialize_timestamp};
use chrono::NaiveDateTime;
use colored::{ColoredString, Colorize};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::{Cell, ContentArrangement, Table};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

/// One matched record kept in a report, in record-column order.
#[derive(Debug, Clone, Serialize)]
pub struct EventSample {
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: NaiveDateTime,
    pub log_type: String,
    pub source: String,
    pub event_type: String,
    pub message: String,
}

impl From<&EventRecord> for EventSample {
    fn from(record: &EventRecord) -> Self {
        EventSample {
            timestamp: record.timestamp,
            log_type: record.log_type.clone(),
            source: record.source.clone(),
            event_type: record.event_type.clone(),
            message: record.message.clone(),
        }
    }
}

/// Aggregated view of one event id.
#[derive(Debug, Clone, Serialize)]
pub struct EventGroup {
    pub event_id: u32,
    pub occurrences: u64,
    pub severity: Severity,
    pub description: String,
    pub samples: Vec<EventSample>,
}

/// The full analysis report, ordered by ascending event id.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub total_records: u64,
    pub skipped_rows: u64,
    pub events: Vec<EventGroup>,
}

/// Group matched records by event id and join each group against the
/// classification table. Samples keep their arrival order, which is
/// timestamp order for chronologically exported inputs.
pub fn analyze(
    records: &[EventRecord],
    table: &ClassificationTable,
    skipped_rows: u64,
) -> AnalysisReport {
    let mut groups: BTreeMap<u32, EventGroup> = BTreeMap::new();

    for record in records {
        let group = groups.entry(record.event_id).or_insert_with(|| {
            let classification = table.classify(record.event_id);
            EventGroup {
                event_id: record.event_id,
                occurrences: 0,
                severity: classification.severity,
                description: classification.description.to_string(),
                samples: Vec::new(),
            }
        });
        group.occurrences += 1;
        group.samples.push(EventSample::from(record));
    }

    let mut events: Vec<EventGroup> = groups.into_values().collect();
    for group in &mut events {
        group
            .samples
            .sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    }

    AnalysisReport {
        total_records: records.len() as u64,
        skipped_rows,
        events,
    }
}

/// Render the analysis report for the terminal.
pub fn render_analysis_text(report: &AnalysisReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", "EVENT ANALYSIS".bold());
    let _ = writeln!(out, "{}", "-".repeat(72).bright_black());
    let _ = writeln!(
        out,
        "Matched records: {}   Distinct event ids: {}   Skipped rows: {}",
        report.total_records.to_string().green().bold(),
        report.events.len(),
        report.skipped_rows
    );

    if report.events.is_empty() {
        let _ = writeln!(out, "\nNo records matched the given criteria.");
        return out;
    }

    let mut table = styled_table(&["Event ID", "Occurrences", "Severity", "Description"]);
    for group in &report.events {
        table.add_row(vec![
            Cell::new(group.event_id),
            Cell::new(group.occurrences),
            Cell::new(severity_colored(group.severity)),
            Cell::new(&group.description),
        ]);
    }
    let _ = writeln!(out, "\n{table}");

    let classified: Vec<&EventGroup> = report
        .events
        .iter()
        .filter(|group| group.severity != Severity::Unknown)
        .collect();
    if !classified.is_empty() {
        let _ = writeln!(out, "\n{}", "CLASSIFIED EVENTS".bold());
        let _ = writeln!(out, "{}", "-".repeat(72).bright_black());
        for group in classified {
            let _ = writeln!(
                out,
                "  {} {} x{} - {}",
                severity_colored(group.severity),
                group.event_id.to_string().cyan(),
                group.occurrences,
                group.description
            );
        }
    }

    out
}

/// Dataset statistics for one run, shown by the `info` command.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetStats {
    pub total_records: u64,
    pub skipped_rows: u64,
    pub first_timestamp: Option<String>,
    pub last_timestamp: Option<String>,
    pub event_type_counts: BTreeMap<String, u64>,
    pub log_type_counts: BTreeMap<String, u64>,
    pub source_counts: BTreeMap<String, u64>,
    pub distinct_event_ids: Vec<u32>,
    pub classified_records: u64,
}

/// Collect overview statistics from the matched records.
pub fn collect_stats(
    records: &[EventRecord],
    table: &ClassificationTable,
    summary: &PipelineSummary,
) -> DatasetStats {
    let mut stats = DatasetStats {
        total_records: records.len() as u64,
        skipped_rows: summary.skipped,
        first_timestamp: None,
        last_timestamp: None,
        event_type_counts: BTreeMap::new(),
        log_type_counts: BTreeMap::new(),
        source_counts: BTreeMap::new(),
        distinct_event_ids: Vec::new(),
        classified_records: 0,
    };

    let mut ids: BTreeSet<u32> = BTreeSet::new();
    let mut first: Option<NaiveDateTime> = None;
    let mut last: Option<NaiveDateTime> = None;

    for record in records {
        first = Some(first.map_or(record.timestamp, |t| t.min(record.timestamp)));
        last = Some(last.map_or(record.timestamp, |t| t.max(record.timestamp)));

        *stats
            .event_type_counts
            .entry(label_or_blank(&record.event_type))
            .or_insert(0) += 1;
        *stats
            .log_type_counts
            .entry(label_or_blank(&record.log_type))
            .or_insert(0) += 1;
        *stats
            .source_counts
            .entry(label_or_blank(&record.source))
            .or_insert(0) += 1;
        ids.insert(record.event_id);
        if table.get(record.event_id).is_some() {
            stats.classified_records += 1;
        }
    }

    stats.first_timestamp =
        first.map(|t| t.format(crate::record::TIMESTAMP_FORMAT).to_string());
    stats.last_timestamp = last.map(|t| t.format(crate::record::TIMESTAMP_FORMAT).to_string());
    stats.distinct_event_ids = ids.into_iter().collect();
    stats
}

/// Render the dataset overview for the terminal.
pub fn render_stats_text(stats: &DatasetStats) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", "DATASET OVERVIEW".bold());
    let _ = writeln!(out, "{}", "-".repeat(72).bright_black());
    let _ = writeln!(
        out,
        "Records: {}   Skipped rows: {}",
        stats.total_records.to_string().green().bold(),
        stats.skipped_rows
    );

    if let (Some(first), Some(last)) = (&stats.first_timestamp, &stats.last_timestamp) {
        let _ = writeln!(out, "\n{}", "TIME RANGE".bold());
        let _ = writeln!(out, "{}", "-".repeat(72).bright_black());
        let _ = writeln!(out, "  Earliest: {}", first.cyan());
        let _ = writeln!(out, "  Latest:   {}", last.cyan());
        if let (Some(a), Some(b)) = (parse_canonical(first), parse_canonical(last)) {
            let _ = writeln!(out, "  Span:     {}", format_span(b - a));
        }
    }

    let _ = write!(
        out,
        "{}",
        counts_section("EVENT TYPES", &stats.event_type_counts, stats.total_records)
    );
    let _ = write!(
        out,
        "{}",
        counts_section("LOG TYPES", &stats.log_type_counts, stats.total_records)
    );
    let _ = write!(
        out,
        "{}",
        counts_section("TOP SOURCES", &stats.source_counts, stats.total_records)
    );

    let _ = writeln!(out, "\n{}", "EVENT IDS".bold());
    let _ = writeln!(out, "{}", "-".repeat(72).bright_black());
    let _ = writeln!(
        out,
        "  Distinct ids: {} ({})",
        stats.distinct_event_ids.len(),
        id_preview(&stats.distinct_event_ids, 12)
    );
    let _ = writeln!(
        out,
        "  Records with a known classification: {} of {}",
        stats.classified_records, stats.total_records
    );

    out
}

fn label_or_blank(value: &str) -> String {
    if value.is_empty() {
        "(blank)".to_string()
    } else {
        value.to_string()
    }
}

fn parse_canonical(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, crate::record::TIMESTAMP_FORMAT).ok()
}

/// Shared table styling for report output.
fn styled_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h)).collect::<Vec<_>>());
    table
}

fn severity_colored(severity: Severity) -> ColoredString {
    let label = severity.as_str();
    match severity {
        Severity::High => label.red().bold(),
        Severity::MediumToHigh => label.red(),
        Severity::Medium => label.yellow(),
        Severity::Low => label.green(),
        Severity::Unknown => label.bright_black(),
    }
}

/// One "NAME / count / percent" section, sorted by count descending.
fn counts_section(title: &str, counts: &BTreeMap<String, u64>, total: u64) -> String {
    let mut out = String::new();
    if counts.is_empty() || total == 0 {
        return out;
    }

    let mut items: Vec<(&String, &u64)> = counts.iter().collect();
    items.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let _ = writeln!(out, "\n{}", title.bold());
    let _ = writeln!(out, "{}", "-".repeat(72).bright_black());

    let mut table = styled_table(&["Name", "Count", "Percent"]);
    for (name, count) in items.into_iter().take(10) {
        let percentage = (*count as f64 / total as f64) * 100.0;
        table.add_row(vec![
            Cell::new(name),
            Cell::new(count),
            Cell::new(format!("{:>6.2}%", percentage)),
        ]);
    }
    let _ = writeln!(out, "{table}");
    out
}

fn id_preview(ids: &[u32], max_items: usize) -> String {
    let mut preview: Vec<String> = ids.iter().take(max_items).map(u32::to_string).collect();
    if ids.len() > max_items {
        preview.push(format!("... +{} more", ids.len() - max_items));
    }
    preview.join(", ")
}

fn format_span(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);

    if total_seconds < 60 {
        format!("{} seconds", total_seconds)
    } else if total_seconds < 3600 {
        format!("{} minutes, {} seconds", total_seconds / 60, total_seconds % 60)
    } else if total_seconds < 86400 {
        format!(
            "{} hours, {} minutes",
            total_seconds / 3600,
            (total_seconds % 3600) / 60
        )
    } else {
        format!(
            "{} days, {} hours",
            total_seconds / 86400,
            (total_seconds % 86400) / 3600
        )
    }
}
