use serde::Serialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// Reference table bundled with the binary (Microsoft "events to monitor").
const BUILTIN_TABLE_CSV: &str = include_str!("../data/events-to-monitor.csv");

static BUILTIN_TABLE: LazyLock<ClassificationTable> = LazyLock::new(|| {
    ClassificationTable::from_reader(BUILTIN_TABLE_CSV.as_bytes())
        .expect("built-in classification table is valid")
});

/// Errors raised while loading a classification table. Individual bad rows
/// are not errors; they are skipped with a warning.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("failed to read classification table '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse classification table: {0}")]
    Csv(#[from] csv::Error),
    #[error(
        "classification table is missing required columns \
         (expected: event_id, severity, description; found: {found})"
    )]
    MissingColumns { found: String },
}

/// Ordered severity labels of the reference table, lowest first. `Unknown`
/// is synthetic and only produced for lookup misses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub enum Severity {
    #[default]
    Unknown,
    Low,
    Medium,
    #[serde(rename = "Medium to High")]
    MediumToHigh,
    High,
}

impl Severity {
    /// The label as it appears in the reference table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Unknown => "Unknown",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::MediumToHigh => "Medium to High",
            Severity::High => "High",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown severity label '{0}'. Valid labels are: Low, Medium, Medium to High, High")]
pub struct ParseSeverityError(String);

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        // Normalize case and inner whitespace ("medium  to high" still parses).
        let normalized = value.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "medium to high" => Ok(Severity::MediumToHigh),
            "high" => Ok(Severity::High),
            _ => Err(ParseSeverityError(value.to_string())),
        }
    }
}

/// One row of the reference table.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationEntry {
    pub event_id: u32,
    pub severity: Severity,
    pub description: String,
}

/// Borrowed classification result attached to a record. Lookup misses yield
/// [`UNKNOWN`]; classification never rejects a record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification<'a> {
    pub severity: Severity,
    pub description: &'a str,
}

/// The synthetic classification for event ids absent from the table.
pub const UNKNOWN: Classification<'static> = Classification {
    severity: Severity::Unknown,
    description: "",
};

/// Immutable event-id → (severity, description) mapping, loaded once at
/// startup and passed by reference wherever classification happens.
#[derive(Debug, Clone, Default)]
pub struct ClassificationTable {
    entries: HashMap<u32, ClassificationEntry>,
    duplicates: usize,
}

impl ClassificationTable {
    /// Load a table from a CSV file.
    pub fn from_path(path: &Path) -> Result<ClassificationTable, ClassificationError> {
        let file = std::fs::File::open(path).map_err(|e| ClassificationError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_reader(file)
    }

    /// Load a table from any CSV source. Columns are addressed by name, so
    /// order does not matter and extra columns are ignored. Rows with a bad
    /// id or severity are skipped with a warning; a duplicate id keeps the
    /// first row seen.
    pub fn from_reader<R: Read>(reader: R) -> Result<ClassificationTable, ClassificationError> {
        let mut csv_reader = csv::Reader::from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim().eq_ignore_ascii_case(name))
        };
        let (id_col, severity_col, description_col) = match (
            column("event_id"),
            column("severity"),
            column("description"),
        ) {
            (Some(id), Some(severity), Some(description)) => (id, severity, description),
            _ => {
                return Err(ClassificationError::MissingColumns {
                    found: headers.iter().collect::<Vec<_>>().join(", "),
                });
            }
        };

        let mut table = ClassificationTable::default();
        for (index, row) in csv_reader.records().enumerate() {
            let row = row?;
            let cell = |col: usize| row.get(col).unwrap_or_default().trim();

            let event_id = match cell(id_col).parse::<u32>() {
                Ok(id) => id,
                Err(_) => {
                    tracing::warn!(
                        row = index + 1,
                        value = cell(id_col),
                        "skipping classification row with invalid event id"
                    );
                    continue;
                }
            };
            let severity = match cell(severity_col).parse::<Severity>() {
                Ok(severity) => severity,
                Err(e) => {
                    tracing::warn!(row = index + 1, event_id, "skipping classification row: {e}");
                    continue;
                }
            };

            table.insert(ClassificationEntry {
                event_id,
                severity,
                description: cell(description_col).to_string(),
            });
        }

        Ok(table)
    }

    /// The table embedded in the binary, used when no override is given.
    pub fn builtin() -> &'static ClassificationTable {
        &BUILTIN_TABLE
    }

    /// Insert an entry, keeping the first one seen for each event id.
    pub fn insert(&mut self, entry: ClassificationEntry) {
        match self.entries.entry(entry.event_id) {
            Entry::Occupied(existing) => {
                self.duplicates += 1;
                tracing::debug!(
                    event_id = entry.event_id,
                    kept = %existing.get().description,
                    ignored = %entry.description,
                    "duplicate classification entry ignored"
                );
            }
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
        }
    }

    /// Look up the entry for an event id.
    pub fn get(&self, event_id: u32) -> Option<&ClassificationEntry> {
        self.entries.get(&event_id)
    }

    /// Classify an event id, falling back to [`UNKNOWN`] on a miss.
    pub fn classify(&self, event_id: u32) -> Classification<'_> {
        self.get(event_id)
            .map(|entry| Classification {
                severity: entry.severity,
                description: &entry.description,
            })
            .unwrap_or(UNKNOWN)
    }

    /// Number of distinct event ids in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of duplicate rows ignored while loading.
    pub fn duplicate_count(&self) -> usize {
        self.duplicates
    }
}
