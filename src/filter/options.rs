use super::FilterError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Accepted formats for `--start-time`/`--end-time` literals.
const BOUND_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Filtering criteria for one run, one optional field per criterion. An
/// unset field places no restriction. Values are held as given; validation
/// and normalization happen once, in
/// [`RecordFilter::compile`](super::RecordFilter::compile).
#[derive(Debug, Default, Clone)]
pub struct FilterOptions {
    pub log_types: Vec<String>,
    pub sources: Vec<String>,
    pub event_types: Vec<String>,
    pub event_ids: Vec<u32>,
    pub message_contains: Option<String>,
    pub message_regex: Option<String>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub last_minutes: Option<u64>,
    pub last_hours: Option<u64>,
    pub today: bool,
    pub day_of_week: Vec<String>,
}

impl FilterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_types(mut self, values: Vec<String>) -> Self {
        self.log_types = values;
        self
    }

    pub fn with_sources(mut self, values: Vec<String>) -> Self {
        self.sources = values;
        self
    }

    pub fn with_event_types(mut self, values: Vec<String>) -> Self {
        self.event_types = values;
        self
    }

    pub fn with_event_ids(mut self, values: Vec<u32>) -> Self {
        self.event_ids = values;
        self
    }

    pub fn with_message_contains(mut self, text: Option<impl Into<String>>) -> Self {
        self.message_contains = text.map(|t| t.into());
        self
    }

    pub fn with_message_regex(mut self, pattern: Option<impl Into<String>>) -> Self {
        self.message_regex = pattern.map(|p| p.into());
        self
    }

    pub fn with_time_bounds(
        mut self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    pub fn with_last_minutes(mut self, minutes: Option<u64>) -> Self {
        self.last_minutes = minutes;
        self
    }

    pub fn with_last_hours(mut self, hours: Option<u64>) -> Self {
        self.last_hours = hours;
        self
    }

    pub fn with_today(mut self, today: bool) -> Self {
        self.today = today;
        self
    }

    pub fn with_days(mut self, tokens: Vec<String>) -> Self {
        self.day_of_week = tokens;
        self
    }

    /// A relative span (`--last-minutes`/`--last-hours`) is requested.
    pub fn has_relative_span(&self) -> bool {
        self.last_minutes.is_some() || self.last_hours.is_some()
    }

    /// At least one absolute bound is requested.
    pub fn has_absolute_bounds(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some()
    }
}

/// Parse a time-bound literal. A bare date means midnight of that day.
pub fn parse_time_bound(value: &str) -> Result<NaiveDateTime, FilterError> {
    let value = value.trim();
    for format in BOUND_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    Err(FilterError::InvalidTimeBound(value.to_string()))
}

/// Warn about time options that are present but overridden by a
/// higher-precedence one. They never combine silently.
pub fn print_filter_warnings(options: &FilterOptions) {
    if options.has_relative_span() {
        if options.today {
            tracing::warn!("--today is ignored because a relative window takes precedence");
        }
        if options.has_absolute_bounds() {
            tracing::warn!(
                "--start-time/--end-time are ignored because a relative window takes precedence"
            );
        }
    } else if options.today && options.has_absolute_bounds() {
        tracing::warn!("--start-time/--end-time are ignored because --today takes precedence");
    }
}
