//! Test fixtures: representative headerless CSV payloads.
//!
//! These fixtures are structurally complete but tiny — the minimum needed
//! to exercise the loader and the stream reader. They reflect the real
//! preprocessed dataset layout:
//!
//!   col 0..n-3  — lagged/derived numeric features
//!   col n-2     — current water level (baseline offset)
//!   col n-1     — regression target (relative change over the horizon)
//!
//! Note: the real dataset is normalized, so feature magnitudes are small
//! and targets hover around zero. Fixtures keep that shape.

/// Eight well-formed rows, five columns (4 features + target).
/// Baseline column (index 3) rises past the flood level of 4.0 at row 5.
pub(crate) fn fixture_normalized_csv() -> &'static str {
    "0.12,0.08,-0.03,3.61,0.05\n\
     0.15,0.09,-0.01,3.66,0.07\n\
     0.18,0.11,0.02,3.73,0.09\n\
     0.22,0.14,0.05,3.82,0.12\n\
     0.27,0.18,0.09,3.94,0.14\n\
     0.33,0.22,0.12,4.08,0.11\n\
     0.31,0.21,0.10,4.19,0.04\n\
     0.26,0.17,0.06,4.23,-0.02\n"
}

/// Row 2 drops a column (4 values instead of 5).
pub(crate) fn fixture_ragged_csv() -> &'static str {
    "0.12,0.08,-0.03,3.61,0.05\n\
     0.15,0.09,-0.01,3.66,0.07\n\
     0.18,0.11,3.73,0.09\n\
     0.22,0.14,0.05,3.82,0.12\n"
}

/// Row 1, column 2 holds a non-numeric sentinel.
pub(crate) fn fixture_bad_cell_csv() -> &'static str {
    "0.12,0.08,-0.03,3.61,0.05\n\
     0.15,0.09,missing,3.66,0.07\n"
}
