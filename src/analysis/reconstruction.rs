//! Baseline re-addition: relative forecast to absolute water level.
//!
//! The model predicts the *change* in water level over the forecast
//! horizon. Adding the current water level (the last-but-one dataset
//! column) back to each prediction reconstructs the absolute forecast
//! level. The baseline is sliced to the prediction sequence's length;
//! positional alignment with stream order is assumed and preserved.

/// Baseline column too short to cover the prediction sequence.
#[derive(Debug)]
pub struct BaselineTooShort {
    pub needed: usize,
    pub available: usize,
}

impl std::fmt::Display for BaselineTooShort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Baseline has {} entries but {} predictions need offsetting",
            self.available, self.needed
        )
    }
}

impl std::error::Error for BaselineTooShort {}

/// Adds `baseline[i]` to `relative[i]` for every i, slicing the baseline
/// down to the relative sequence's length.
pub fn reconstruct_levels(
    relative: &[f64],
    baseline: &[f64],
) -> Result<Vec<f64>, BaselineTooShort> {
    if baseline.len() < relative.len() {
        return Err(BaselineTooShort {
            needed: relative.len(),
            available: baseline.len(),
        });
    }
    Ok(relative
        .iter()
        .zip(baseline.iter())
        .map(|(r, b)| r + b)
        .collect())
}
