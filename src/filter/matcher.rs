use super::{FilterError, FilterOptions, TimeWindow, WeekdaySelection};
use crate::record::EventRecord;
use chrono::{Datelike, NaiveDateTime};
use regex::{Regex, RegexBuilder};

/// Compiled record predicate: the AND-combination of every active
/// criterion. Built once per run by [`RecordFilter::compile`], which
/// validates all inputs up front; evaluation itself cannot fail.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    log_types: Option<Vec<String>>,
    sources: Option<Vec<String>>,
    event_types: Option<Vec<String>>,
    event_ids: Option<Vec<u32>>,
    message_contains: Option<String>,
    message_pattern: Option<Regex>,
    window: TimeWindow,
    days: WeekdaySelection,
}

impl RecordFilter {
    /// A filter with no active criteria; matches every record.
    pub fn match_all() -> Self {
        Self::default()
    }

    /// Validate the options against the reference instant `now` and build
    /// the predicate. Set values are lowercased here so evaluation compares
    /// without re-normalizing.
    pub fn compile(
        options: &FilterOptions,
        now: NaiveDateTime,
    ) -> Result<RecordFilter, FilterError> {
        let window = TimeWindow::resolve(options, now)?;
        let days = WeekdaySelection::parse(&options.day_of_week)?;
        let message_pattern = options
            .message_regex
            .as_deref()
            .map(|pattern| RegexBuilder::new(pattern).case_insensitive(true).build())
            .transpose()?;

        Ok(RecordFilter {
            log_types: lowercase_set(&options.log_types),
            sources: lowercase_set(&options.sources),
            event_types: lowercase_set(&options.event_types),
            event_ids: (!options.event_ids.is_empty()).then(|| options.event_ids.clone()),
            message_contains: options.message_contains.as_ref().map(|t| t.to_lowercase()),
            message_pattern,
            window,
            days,
        })
    }

    /// The resolved time window (for diagnostics).
    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    /// Whether the record satisfies every active criterion.
    pub fn matches(&self, record: &EventRecord) -> bool {
        let log_type_match = self
            .log_types
            .as_ref()
            .map(|set| set_matches(set, &record.log_type))
            .unwrap_or(true);

        let source_match = self
            .sources
            .as_ref()
            .map(|set| set_matches(set, &record.source))
            .unwrap_or(true);

        let event_type_match = self
            .event_types
            .as_ref()
            .map(|set| set_matches(set, &record.event_type))
            .unwrap_or(true);

        let event_id_match = self
            .event_ids
            .as_ref()
            .map(|ids| ids.contains(&record.event_id))
            .unwrap_or(true);

        let contains_match = self
            .message_contains
            .as_ref()
            .map(|needle| record.message.to_lowercase().contains(needle))
            .unwrap_or(true);

        let pattern_match = self
            .message_pattern
            .as_ref()
            .map(|pattern| pattern.is_match(&record.message))
            .unwrap_or(true);

        log_type_match
            && source_match
            && event_type_match
            && event_id_match
            && contains_match
            && pattern_match
            && self.window.contains(record.timestamp)
            && self.days.matches(record.timestamp.weekday())
    }
}

/// Case-insensitive exact membership test. An empty record field never
/// matches a non-empty filter set.
fn set_matches(set: &[String], value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    let value = value.to_lowercase();
    set.iter().any(|candidate| candidate == &value)
}

fn lowercase_set(values: &[String]) -> Option<Vec<String>> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().map(|v| v.to_lowercase()).collect())
}
