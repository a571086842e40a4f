use chrono::NaiveDateTime;
use csv::StringRecord;
use serde::Serializer;
use thiserror::Error;

/// Column layout of a record CSV, in order.
pub const CSV_HEADER: [&str; 6] = [
    "timestamp",
    "log_type",
    "source",
    "event_id",
    "event_type",
    "message",
];

/// Canonical timestamp format, also used when writing records back out.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Accepted input timestamp formats, tried in order.
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Errors for a single malformed row. These never abort a run; the row is
/// skipped and processing continues (see the pipeline module).
#[derive(Debug, Error)]
pub enum RecordError {
    /// The row does not carry all six expected columns.
    #[error("row {row}: expected {expected} columns, found {found}")]
    MissingColumns {
        row: u64,
        expected: usize,
        found: usize,
    },
    /// The timestamp field could not be parsed with any accepted format.
    #[error("row {row}: invalid timestamp '{value}'")]
    InvalidTimestamp { row: u64, value: String },
    /// The event id field is not a non-negative integer.
    #[error("row {row}: invalid event id '{value}'")]
    InvalidEventId { row: u64, value: String },
    /// The CSV reader could not decode the row at all.
    #[error("row {row}: {source}")]
    Csv {
        row: u64,
        #[source]
        source: csv::Error,
    },
}

/// One normalized event-log record.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// When the event was recorded, in source-local wall-clock time
    pub timestamp: NaiveDateTime,
    /// Log channel the event came from (e.g. "System", "Security")
    pub log_type: String,
    /// Provider name (e.g. "Microsoft-Windows-Security-Auditing")
    pub source: String,
    /// Numeric event identifier
    pub event_id: u32,
    /// Declared level label (e.g. "ERROR", "WARNING", "INFORMATION")
    pub event_type: String,
    /// Free-text message
    pub message: String,
}

impl EventRecord {
    /// Build a record from one CSV data row. `row` is the 1-based data row
    /// number, used only for diagnostics.
    pub fn from_csv_row(row: u64, raw: &StringRecord) -> Result<EventRecord, RecordError> {
        if raw.len() < CSV_HEADER.len() {
            return Err(RecordError::MissingColumns {
                row,
                expected: CSV_HEADER.len(),
                found: raw.len(),
            });
        }

        let field = |index: usize| raw.get(index).unwrap_or_default().trim();

        let timestamp_raw = field(0);
        let timestamp =
            parse_timestamp(timestamp_raw).ok_or_else(|| RecordError::InvalidTimestamp {
                row,
                value: timestamp_raw.to_string(),
            })?;

        let event_id_raw = field(3);
        let event_id = event_id_raw
            .parse::<u32>()
            .map_err(|_| RecordError::InvalidEventId {
                row,
                value: event_id_raw.to_string(),
            })?;

        // Unescaped commas in the message spill into extra fields; stitch
        // them back together verbatim, trimming only the outer ends.
        let message = if raw.len() > CSV_HEADER.len() {
            raw.iter()
                .skip(CSV_HEADER.len() - 1)
                .collect::<Vec<_>>()
                .join(",")
                .trim()
                .to_string()
        } else {
            field(5).to_string()
        };

        Ok(EventRecord {
            timestamp,
            log_type: field(1).to_string(),
            source: field(2).to_string(),
            event_id,
            event_type: field(4).to_string(),
            message,
        })
    }

    /// The record's fields in CSV column order, timestamp in canonical form.
    pub fn csv_fields(&self) -> [String; 6] {
        [
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            self.log_type.clone(),
            self.source.clone(),
            self.event_id.to_string(),
            self.event_type.clone(),
            self.message.clone(),
        ]
    }
}

/// Parse a record timestamp, accepting second or minute precision.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Serialize a timestamp in the canonical record format (for report types).
pub fn serialize_timestamp<S: Serializer>(
    timestamp: &NaiveDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&timestamp.format(TIMESTAMP_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_of(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    #[test]
    fn test_parse_full_row() {
        let raw = row_of(&[
            "2025-04-20 09:15:00",
            "Security",
            "Microsoft-Windows-Security-Auditing",
            "4625",
            "WARNING",
            "failed logon",
        ]);
        let record = EventRecord::from_csv_row(1, &raw).unwrap();

        assert_eq!(record.log_type, "Security");
        assert_eq!(record.source, "Microsoft-Windows-Security-Auditing");
        assert_eq!(record.event_id, 4625);
        assert_eq!(record.event_type, "WARNING");
        assert_eq!(record.message, "failed logon");
        assert_eq!(
            record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            "2025-04-20 09:15:00"
        );
    }

    #[test]
    fn test_parse_minute_precision_timestamp() {
        let raw = row_of(&["2025-04-20 09:15", "System", "", "4608", "", ""]);
        let record = EventRecord::from_csv_row(1, &raw).unwrap();
        assert_eq!(
            record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            "2025-04-20 09:15:00"
        );
    }

    #[test]
    fn test_empty_fields_are_allowed_except_timestamp() {
        let raw = row_of(&["2025-04-20 09:15:00", "", "", "4608", "", ""]);
        let record = EventRecord::from_csv_row(1, &raw).unwrap();
        assert_eq!(record.log_type, "");
        assert_eq!(record.source, "");
        assert_eq!(record.event_type, "");
        assert_eq!(record.message, "");
    }

    #[test]
    fn test_extra_fields_fold_back_into_the_message() {
        let raw = row_of(&[
            "2025-04-20 09:15:00",
            "Security",
            "src",
            "4625",
            "WARNING",
            "failed logon",
            "account: guest",
        ]);
        let record = EventRecord::from_csv_row(1, &raw).unwrap();
        assert_eq!(record.message, "failed logon,account: guest");
    }

    #[test]
    fn test_stitched_message_keeps_inner_spacing() {
        let raw = row_of(&[
            "2025-04-20 09:15:00",
            "Security",
            "src",
            "4625",
            "WARNING",
            "failed logon",
            " code: 0xC000006A",
        ]);
        let record = EventRecord::from_csv_row(1, &raw).unwrap();
        assert_eq!(record.message, "failed logon, code: 0xC000006A");
    }

    #[test]
    fn test_missing_columns_is_an_error() {
        let raw = row_of(&["2025-04-20 09:15:00", "System", "src"]);
        let err = EventRecord::from_csv_row(7, &raw).unwrap_err();
        assert!(matches!(
            err,
            RecordError::MissingColumns { row: 7, found: 3, .. }
        ));
    }

    #[test]
    fn test_bad_timestamp_is_an_error() {
        let raw = row_of(&["not a date", "System", "src", "4608", "INFO", "m"]);
        let err = EventRecord::from_csv_row(2, &raw).unwrap_err();
        assert!(matches!(err, RecordError::InvalidTimestamp { row: 2, .. }));
        assert!(err.to_string().contains("not a date"));
    }

    #[test]
    fn test_bad_event_id_is_an_error() {
        for bad in ["abc", "-3", "4.5", ""] {
            let raw = row_of(&["2025-04-20 09:15:00", "System", "src", bad, "INFO", "m"]);
            let err = EventRecord::from_csv_row(1, &raw).unwrap_err();
            assert!(matches!(err, RecordError::InvalidEventId { .. }), "{bad}");
        }
    }

    #[test]
    fn test_csv_fields_round_trip_order() {
        let raw = row_of(&[
            "2025-04-20 09:15:00",
            "Security",
            "Microsoft-Windows-Security-Auditing",
            "4625",
            "WARNING",
            "failed logon",
        ]);
        let record = EventRecord::from_csv_row(1, &raw).unwrap();
        let fields = record.csv_fields();
        assert_eq!(fields[0], "2025-04-20 09:15:00");
        assert_eq!(fields[3], "4625");
        assert_eq!(fields[5], "failed logon");
    }
}
