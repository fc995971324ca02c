//! Record-at-a-time streaming over the re-emitted dataset.
//!
//! The evaluation loop never touches the in-memory feature table; it
//! consumes a `CsvStream`, a sequential, single-pass, read-only view that
//! produces one instance per record from the temp CSV. This mirrors how
//! the data would arrive in live operation: one observation at a time,
//! no lookahead.

use std::fs::File;
use std::path::Path;

use crate::model::StreamError;

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Static declaration of the stream's attributes: feature names plus the
/// regression flag. Derived once from the feature table's column count.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    feature_names: Vec<String>,
    regression: bool,
}

impl Schema {
    /// Builds a regression schema with generated feature names
    /// `attrib_0 .. attrib_{n-1}`.
    pub fn for_regression(n_features: usize) -> Self {
        Schema {
            feature_names: (0..n_features).map(|i| format!("attrib_{}", i)).collect(),
            regression: true,
        }
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn is_regression(&self) -> bool {
        self.regression
    }
}

// ---------------------------------------------------------------------------
// Instances
// ---------------------------------------------------------------------------

/// A single stream record: feature vector plus regression target.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub features: Vec<f64>,
    pub target: f64,
}

// ---------------------------------------------------------------------------
// CSV stream
// ---------------------------------------------------------------------------

/// A file-based instance stream over a headerless CSV.
///
/// Each record must carry `schema.n_features()` feature values followed by
/// one target value. Records are surfaced in file order, exactly once.
pub struct CsvStream {
    records: csv::StringRecordsIntoIter<File>,
    schema: Schema,
    position: usize,
}

impl CsvStream {
    /// Opens the stream file. Reading is lazy; schema violations surface
    /// from the iterator at the offending record.
    pub fn open<P: AsRef<Path>>(path: P, schema: Schema) -> Result<Self, StreamError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path.as_ref())
            .map_err(|e| StreamError::Io(std::io::Error::other(e.to_string())))?;

        Ok(CsvStream {
            records: reader.into_records(),
            schema,
            position: 0,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of records yielded so far.
    pub fn position(&self) -> usize {
        self.position
    }

    fn parse_record(&self, record: &csv::StringRecord) -> Result<Instance, StreamError> {
        let expected = self.schema.n_features();
        if record.len() != expected + 1 {
            return Err(StreamError::SchemaMismatch {
                record: self.position,
                expected,
                found: record.len(),
            });
        }

        let mut features = Vec::with_capacity(expected);
        for cell in record.iter().take(expected) {
            let value: f64 = cell.trim().parse().map_err(|_| StreamError::BadValue {
                record: self.position,
                value: cell.to_string(),
            })?;
            features.push(value);
        }

        let target_cell = &record[expected];
        let target: f64 = target_cell.trim().parse().map_err(|_| StreamError::BadValue {
            record: self.position,
            value: target_cell.to_string(),
        })?;

        Ok(Instance { features, target })
    }
}

impl Iterator for CsvStream {
    type Item = Result<Instance, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(r) => r,
            Err(e) => {
                return Some(Err(StreamError::Io(std::io::Error::other(e.to_string()))));
            }
        };

        let parsed = self.parse_record(&record);
        self.position += 1;
        Some(parsed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::*;
    use std::io::Write;

    fn write_temp_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write fixture");
        file.flush().expect("flush fixture");
        file
    }

    #[test]
    fn test_schema_names_are_generated_in_order() {
        let schema = Schema::for_regression(4);
        assert_eq!(schema.n_features(), 4);
        assert!(schema.is_regression());
        assert_eq!(
            schema.feature_names(),
            &["attrib_0", "attrib_1", "attrib_2", "attrib_3"]
        );
    }

    #[test]
    fn test_stream_yields_every_record_in_order() {
        let file = write_temp_csv(fixture_normalized_csv());
        let stream =
            CsvStream::open(file.path(), Schema::for_regression(4)).expect("open stream");

        let instances: Vec<Instance> = stream.map(|r| r.expect("valid record")).collect();
        assert_eq!(instances.len(), 8, "one instance per CSV row");

        // Instances arrive in file order: first row's target is 0.05.
        assert!((instances[0].target - 0.05).abs() < 1e-12);
        assert!((instances[7].target - (-0.02)).abs() < 1e-12);
        // Baseline column rides along as a regular feature.
        assert!((instances[0].features[3] - 3.61).abs() < 1e-12);
    }

    #[test]
    fn test_stream_is_single_pass() {
        let file = write_temp_csv(fixture_normalized_csv());
        let mut stream =
            CsvStream::open(file.path(), Schema::for_regression(4)).expect("open stream");

        let mut count = 0;
        while let Some(item) = stream.next() {
            item.expect("valid record");
            count += 1;
        }
        assert_eq!(count, 8);
        assert_eq!(stream.position(), 8);
        assert!(stream.next().is_none(), "exhausted stream stays exhausted");
    }

    #[test]
    fn test_schema_mismatch_surfaces_at_offending_record() {
        let file = write_temp_csv(fixture_ragged_csv());
        let mut stream =
            CsvStream::open(file.path(), Schema::for_regression(4)).expect("open stream");

        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().unwrap().is_ok());
        match stream.next().unwrap() {
            Err(StreamError::SchemaMismatch { record, expected, found }) => {
                assert_eq!(record, 2);
                assert_eq!(expected, 4);
                assert_eq!(found, 4); // 4 values where 4 features + 1 target expected
            }
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_value_surfaces_with_record_index() {
        let file = write_temp_csv(fixture_bad_cell_csv());
        let mut stream =
            CsvStream::open(file.path(), Schema::for_regression(4)).expect("open stream");

        assert!(stream.next().unwrap().is_ok());
        match stream.next().unwrap() {
            Err(StreamError::BadValue { record, value }) => {
                assert_eq!(record, 1);
                assert_eq!(value, "missing");
            }
            other => panic!("expected BadValue, got {:?}", other),
        }
    }

    #[test]
    fn test_open_missing_file_is_an_error() {
        assert!(CsvStream::open("no/such/stream.csv", Schema::for_regression(4)).is_err());
    }
}
