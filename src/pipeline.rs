//! Streaming pipeline: source -> classify -> filter -> sink
//!
//! The pipeline holds one record in memory at a time. Records flow from a
//! [`RecordReader`] through the classifier and the compiled filter into a
//! [`RecordSink`], preserving arrival order. Malformed rows are skipped
//! with a warning; fatal errors are resource problems only.

use crate::classification::{Classification, ClassificationTable};
use crate::filter::RecordFilter;
use crate::record::{CSV_HEADER, EventRecord, RecordError};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

/// Fatal pipeline errors. Per-record problems are [`RecordError`]s and
/// never surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read input '{path}': {source}")]
    InputUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read input header: {0}")]
    Header(#[from] csv::Error),
    #[error(
        "input header mismatch: expected '{expected}', found '{found}'"
    )]
    HeaderMismatch { expected: String, found: String },
    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),
}

/// Streaming CSV source yielding one parsed record per data row. The header
/// is validated when the reader is built, so a malformed file fails before
/// any record is processed.
pub struct RecordReader<R: Read> {
    rows: csv::StringRecordsIntoIter<R>,
    row: u64,
}

impl<R: Read> std::fmt::Debug for RecordReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordReader")
            .field("row", &self.row)
            .finish_non_exhaustive()
    }
}

impl RecordReader<std::fs::File> {
    /// Open a record CSV file and validate its header.
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let file = std::fs::File::open(path).map_err(|e| PipelineError::InputUnreadable {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_reader(file)
    }
}

impl<R: Read> RecordReader<R> {
    /// Wrap any CSV source. The six expected columns must appear in order
    /// (case-insensitive, a leading UTF-8 BOM is tolerated). Rows may carry
    /// unescaped commas in the trailing message field, so field-count
    /// checking is left to the per-row conversion.
    pub fn from_reader(reader: R) -> Result<Self, PipelineError> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers = csv_reader.headers()?;
        let found: Vec<&str> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim())
            .collect();
        let matches = found.len() == CSV_HEADER.len()
            && found
                .iter()
                .zip(CSV_HEADER)
                .all(|(f, expected)| f.eq_ignore_ascii_case(expected));
        if !matches {
            return Err(PipelineError::HeaderMismatch {
                expected: CSV_HEADER.join(","),
                found: found.join(","),
            });
        }

        Ok(RecordReader {
            rows: csv_reader.into_records(),
            row: 0,
        })
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<EventRecord, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = self.rows.next()?;
        self.row += 1;
        Some(match raw {
            Ok(raw) => EventRecord::from_csv_row(self.row, &raw),
            Err(source) => Err(RecordError::Csv {
                row: self.row,
                source,
            }),
        })
    }
}

/// Destination for matching records. Sinks receive records in arrival
/// order, one at a time, together with their classification.
pub trait RecordSink {
    fn write(
        &mut self,
        record: &EventRecord,
        classification: Classification<'_>,
    ) -> Result<(), PipelineError>;

    /// Finalize the output. Called once, after the last record.
    fn finish(&mut self) -> Result<(), PipelineError>;
}

/// CSV sink writing the six record columns, header first.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    header_written: bool,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        CsvSink {
            writer: csv::Writer::from_writer(writer),
            header_written: false,
        }
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn write(
        &mut self,
        record: &EventRecord,
        _classification: Classification<'_>,
    ) -> Result<(), PipelineError> {
        if !self.header_written {
            self.writer
                .write_record(CSV_HEADER)
                .map_err(csv_io_error)?;
            self.header_written = true;
        }
        self.writer
            .write_record(record.csv_fields())
            .map_err(csv_io_error)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), PipelineError> {
        if !self.header_written {
            self.writer
                .write_record(CSV_HEADER)
                .map_err(csv_io_error)?;
            self.header_written = true;
        }
        self.writer.flush().map_err(PipelineError::Output)
    }
}

fn csv_io_error(error: csv::Error) -> PipelineError {
    match error.into_kind() {
        csv::ErrorKind::Io(io) => PipelineError::Output(io),
        other => PipelineError::Output(std::io::Error::other(format!("{:?}", other))),
    }
}

/// JSON sink writing an array of objects, one per record, each carrying the
/// looked-up severity and description alongside the record fields. Objects
/// are written as they arrive; the full output is never buffered.
pub struct JsonSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        JsonSink { writer, written: 0 }
    }
}

impl<W: Write> RecordSink for JsonSink<W> {
    fn write(
        &mut self,
        record: &EventRecord,
        classification: Classification<'_>,
    ) -> Result<(), PipelineError> {
        let object = serde_json::json!({
            "timestamp": record.timestamp.format(crate::record::TIMESTAMP_FORMAT).to_string(),
            "log_type": record.log_type,
            "source": record.source,
            "event_id": record.event_id,
            "event_type": record.event_type,
            "message": record.message,
            "severity": classification.severity,
            "description": classification.description,
        });
        let separator = if self.written == 0 { "[\n" } else { ",\n" };
        write!(self.writer, "{separator}  {object}").map_err(PipelineError::Output)?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), PipelineError> {
        if self.written == 0 {
            write!(self.writer, "[]").map_err(PipelineError::Output)?;
        } else {
            write!(self.writer, "\n]").map_err(PipelineError::Output)?;
        }
        writeln!(self.writer).map_err(PipelineError::Output)?;
        self.writer.flush().map_err(PipelineError::Output)
    }
}

/// Counters accumulated over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    /// Rows read from the source, well-formed or not
    pub rows_read: u64,
    /// Records that passed the filter and were written to the sink
    pub matched: u64,
    /// Malformed rows skipped with a warning
    pub skipped: u64,
    /// Matched records per severity label
    pub matched_by_severity: BTreeMap<String, u64>,
}

/// Run the pipeline to completion: classify each record, evaluate the
/// filter, and write matches to the sink in arrival order. Malformed rows
/// are logged and counted, never fatal. The sink is finalized before
/// returning on success.
pub fn run_pipeline<I, S>(
    source: I,
    sink: &mut S,
    filter: &RecordFilter,
    table: &ClassificationTable,
) -> Result<PipelineSummary, PipelineError>
where
    I: IntoIterator<Item = Result<EventRecord, RecordError>>,
    S: RecordSink,
{
    let mut summary = PipelineSummary::default();

    for item in source {
        summary.rows_read += 1;
        let record = match item {
            Ok(record) => record,
            Err(error) => {
                summary.skipped += 1;
                tracing::warn!("skipping malformed row: {error}");
                continue;
            }
        };

        let classification = table.classify(record.event_id);
        if !filter.matches(&record) {
            continue;
        }

        sink.write(&record, classification)?;
        summary.matched += 1;
        *summary
            .matched_by_severity
            .entry(classification.severity.to_string())
            .or_insert(0) += 1;
    }

    sink.finish()?;
    tracing::debug!(
        rows = summary.rows_read,
        matched = summary.matched,
        skipped = summary.skipped,
        "pipeline finished"
    );
    Ok(summary)
}
