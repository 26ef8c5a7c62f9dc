//! Error handling for CDM sequence processing.

use std::io;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Errors raised while reading, joining and sequencing CDM tables
#[derive(Debug, thiserror::Error)]
pub enum CdmError {
    /// Error opening, reading or writing a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error decoding or encoding Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error in an Arrow compute kernel
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// A table lacks an expected column, or the column has an unusable type
    #[error("Malformed table '{table}': column '{column}' {reason}")]
    MalformedTable {
        table: String,
        column: String,
        reason: String,
    },

    /// More than one row where exactly one is expected
    #[error("Expected exactly one row in '{table}' for person {person_id}, found {rows}")]
    CardinalityViolation {
        table: String,
        person_id: i64,
        rows: usize,
    },

    /// A table stream is not sorted ascending by person id
    #[error(
        "Table '{table}' in partition {partition} is not sorted by person_id: {current} follows {previous}"
    )]
    OrderingViolation {
        table: String,
        partition: usize,
        previous: i64,
        current: i64,
    },

    /// Rows for a person that is absent from the person table
    #[error("Table '{table}' in partition {partition} has {rows} rows for person {person_id}, who is not in the person table")]
    OrphanRows {
        table: String,
        partition: usize,
        person_id: i64,
        rows: usize,
    },

    /// A value that cannot be interpreted (e.g. an impossible date of birth)
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Invalid configuration or input layout
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error converting rows to or from Arrow
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_arrow::Error),

    /// Error writing the run summary
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Any error, tagged with the partition (and person, when known) it occurred in
    #[error("Partition {partition}{}: {source}", person_context(.person_id))]
    Partition {
        partition: usize,
        person_id: Option<i64>,
        #[source]
        source: Box<CdmError>,
    },
}

fn person_context(person_id: &Option<i64>) -> String {
    person_id.map_or_else(String::new, |id| format!(" (person {id})"))
}

impl CdmError {
    /// Create a `MalformedTable` error
    pub fn malformed(table: &str, column: &str, reason: impl Into<String>) -> Self {
        Self::MalformedTable {
            table: table.to_string(),
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    /// Attach partition context, keeping existing context if already present
    #[must_use]
    pub fn in_partition(self, partition: usize, person_id: Option<i64>) -> Self {
        match self {
            already @ Self::Partition { .. } => already,
            other => Self::Partition {
                partition,
                person_id,
                source: Box::new(other),
            },
        }
    }
}

/// Result type for CDM processing operations
pub type Result<T> = std::result::Result<T, CdmError>;
