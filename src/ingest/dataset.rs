//! Feature-table ingestion: headerless CSV of numeric rows.
//!
//! The preprocessed water-level dataset carries one instance per row.
//! All columns are numeric; the last column is the regression target and
//! the last-but-one column is the current water level (baseline offset).
//! The table is read once and immutable thereafter.

use std::path::Path;

use crate::model::DatasetError;

/// An immutable, fully-loaded table of numeric feature rows.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    rows: Vec<Vec<f64>>,
    n_columns: usize,
}

impl FeatureTable {
    /// Loads a headerless CSV into memory, validating that every row has
    /// the same column count and every cell parses as a number.
    ///
    /// # Errors
    /// - `DatasetError::RaggedRow` — a row's column count differs from the
    ///   first row's.
    /// - `DatasetError::BadCell` — a cell failed to parse as `f64`.
    /// - `DatasetError::Empty` — the file contained no rows.
    /// - `DatasetError::TooFewColumns` — fewer than 2 columns, so there is
    ///   no room for both a baseline and a target.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path.as_ref())
            .map_err(|e| DatasetError::Parse(e.to_string()))?;

        let mut rows: Vec<Vec<f64>> = Vec::new();
        let mut n_columns = 0usize;

        for (row_idx, record) in reader.records().enumerate() {
            let record = record.map_err(|e| DatasetError::Parse(e.to_string()))?;

            if row_idx == 0 {
                n_columns = record.len();
            } else if record.len() != n_columns {
                return Err(DatasetError::RaggedRow {
                    row: row_idx,
                    expected: n_columns,
                    found: record.len(),
                });
            }

            let mut row = Vec::with_capacity(n_columns);
            for (col_idx, cell) in record.iter().enumerate() {
                let value: f64 = cell.trim().parse().map_err(|_| DatasetError::BadCell {
                    row: row_idx,
                    column: col_idx,
                    value: cell.to_string(),
                })?;
                row.push(value);
            }
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(DatasetError::Empty);
        }
        if n_columns < 2 {
            return Err(DatasetError::TooFewColumns(n_columns));
        }

        Ok(FeatureTable { rows, n_columns })
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.n_columns
    }

    /// Number of feature attributes: every column except the target.
    pub fn n_features(&self) -> usize {
        self.n_columns - 1
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Extracts a full column by index.
    pub fn column(&self, idx: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[idx]).collect()
    }

    /// The baseline water-level column: last-but-one column of the table.
    /// Added back to relative predictions to reconstruct absolute levels.
    pub fn baseline_column(&self) -> Vec<f64> {
        self.column(self.n_columns - 2)
    }

    /// The regression target column: last column of the table.
    pub fn target_column(&self) -> Vec<f64> {
        self.column(self.n_columns - 1)
    }

    /// Re-emits the table as a headerless CSV at `path`, creating parent
    /// directories as needed. The written file has exactly the same row
    /// and column counts as the table; values round-trip through Rust's
    /// shortest-representation float formatting.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), DatasetError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path.as_ref())
            .map_err(|e| DatasetError::Parse(e.to_string()))?;

        for row in &self.rows {
            let record: Vec<String> = row.iter().map(|v| format!("{}", v)).collect();
            writer
                .write_record(&record)
                .map_err(|e| DatasetError::Parse(e.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
