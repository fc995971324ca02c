//! Core data types for the water-level forecast evaluation service.
//!
//! This module defines the shared domain model imported by all other
//! modules. It contains no logic, no I/O, and no external dependencies —
//! only types.

// ---------------------------------------------------------------------------
// Flood thresholds
// ---------------------------------------------------------------------------

/// Flood level used as the horizontal reference line on charts and as the
/// cut line for exceedance analysis, in the dataset's water-level units.
pub const DEFAULT_FLOOD_LEVEL: f64 = 4.0;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise while loading or re-emitting the feature table.
#[derive(Debug)]
pub enum DatasetError {
    /// The CSV file could not be opened or read.
    Io(std::io::Error),
    /// The CSV layer rejected the file (encoding, quoting, etc.).
    Parse(String),
    /// A row had a different number of columns than the first row.
    RaggedRow { row: usize, expected: usize, found: usize },
    /// A cell could not be parsed as a number.
    BadCell { row: usize, column: usize, value: String },
    /// The file parsed but contained no rows.
    Empty,
    /// The table has too few columns to carry a baseline and a target.
    TooFewColumns(usize),
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::Io(e) => write!(f, "I/O error: {}", e),
            DatasetError::Parse(msg) => write!(f, "CSV parse error: {}", msg),
            DatasetError::RaggedRow { row, expected, found } => {
                write!(f, "Row {} has {} columns, expected {}", row, found, expected)
            }
            DatasetError::BadCell { row, column, value } => {
                write!(f, "Row {}, column {}: cannot parse '{}' as a number", row, column, value)
            }
            DatasetError::Empty => write!(f, "Dataset contains no rows"),
            DatasetError::TooFewColumns(n) => {
                write!(f, "Dataset has {} columns; need at least 2 (baseline + target)", n)
            }
        }
    }
}

impl std::error::Error for DatasetError {}

impl From<std::io::Error> for DatasetError {
    fn from(e: std::io::Error) -> Self {
        DatasetError::Io(e)
    }
}

/// Errors that can arise while streaming instances from the temp CSV.
#[derive(Debug)]
pub enum StreamError {
    /// The stream file could not be opened.
    Io(std::io::Error),
    /// A record did not match the schema's feature count.
    SchemaMismatch { record: usize, expected: usize, found: usize },
    /// A record cell could not be parsed as a number.
    BadValue { record: usize, value: String },
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamError::Io(e) => write!(f, "I/O error: {}", e),
            StreamError::SchemaMismatch { record, expected, found } => {
                write!(
                    f,
                    "Record {} has {} values, schema expects {} features + 1 target",
                    record, found, expected
                )
            }
            StreamError::BadValue { record, value } => {
                write!(f, "Record {}: cannot parse '{}' as a number", record, value)
            }
        }
    }
}

impl std::error::Error for StreamError {}

impl From<std::io::Error> for StreamError {
    fn from(e: std::io::Error) -> Self {
        StreamError::Io(e)
    }
}

/// Errors that can arise while rendering charts.
#[derive(Debug)]
pub enum ChartError {
    /// One of the input series was empty.
    EmptySeries,
    /// Actual and predicted series lengths differ.
    LengthMismatch { actual: usize, predicted: usize },
    /// The drawing backend reported a failure.
    Backend(String),
}

impl std::fmt::Display for ChartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartError::EmptySeries => write!(f, "Cannot render a chart from an empty series"),
            ChartError::LengthMismatch { actual, predicted } => {
                write!(
                    f,
                    "Series length mismatch: {} actual vs {} predicted",
                    actual, predicted
                )
            }
            ChartError::Backend(msg) => write!(f, "Chart backend error: {}", msg),
        }
    }
}

impl std::error::Error for ChartError {}
