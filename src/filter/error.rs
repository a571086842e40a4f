use chrono::NaiveDateTime;
use thiserror::Error;

/// Errors produced while building a [`RecordFilter`](super::RecordFilter).
/// All of these are configuration errors: they are raised before any record
/// is read and they abort the run.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error(
        "Invalid time bound '{0}'. Valid formats are: YYYY-MM-DD HH:MM:SS, YYYY-MM-DD HH:MM, YYYY-MM-DD"
    )]
    InvalidTimeBound(String),

    #[error("Start time {start} is after end time {end}")]
    StartAfterEnd {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("Relative window duration must be at least one minute")]
    EmptySpan,

    #[error("Relative window duration is too large")]
    SpanOutOfRange,

    #[error("Unknown day of week '{0}'. Valid values are: Mon, Tue, Wed, Thu, Fri, Sat, Sun")]
    UnknownWeekday(String),

    #[error("Invalid message pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}
