//! Flood-level exceedance summary over a water-level series.
//!
//! An exceedance event is a maximal contiguous run of instances strictly
//! above the flood level. Computed for both the observed and predicted
//! series so the report can show whether the forecast would have called
//! the same flood episodes the river actually produced.

use serde::Serialize;

/// Summary of how a level series relates to the flood level.
///
/// Meaningful only for non-empty series; an empty series yields the
/// zeroed summary.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExceedanceSummary {
    pub flood_level: f64,
    /// Instances strictly above the flood level.
    pub instances_above: usize,
    /// Maximal contiguous runs above the flood level.
    pub events: usize,
    /// Length of the longest run, in instances.
    pub longest_event: usize,
    pub peak_level: f64,
    pub peak_instance: usize,
}

/// Scans the series once, counting exceedance runs and locating the peak.
pub fn summarize(series: &[f64], flood_level: f64) -> ExceedanceSummary {
    let mut instances_above = 0;
    let mut events = 0;
    let mut longest_event = 0;
    let mut current_run = 0;
    let mut peak_level = f64::NEG_INFINITY;
    let mut peak_instance = 0;

    for (i, &level) in series.iter().enumerate() {
        if level > peak_level {
            peak_level = level;
            peak_instance = i;
        }
        if level > flood_level {
            instances_above += 1;
            if current_run == 0 {
                events += 1;
            }
            current_run += 1;
            longest_event = longest_event.max(current_run);
        } else {
            current_run = 0;
        }
    }

    ExceedanceSummary {
        flood_level,
        instances_above,
        events,
        longest_event,
        peak_level: if series.is_empty() { 0.0 } else { peak_level },
        peak_instance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_crossing_counts_one_event() {
        let series = [3.0, 3.5, 4.2, 4.6, 4.1, 3.8];
        let summary = summarize(&series, 4.0);

        assert_eq!(summary.events, 1);
        assert_eq!(summary.instances_above, 3);
        assert_eq!(summary.longest_event, 3);
        assert_eq!(summary.peak_level, 4.6);
        assert_eq!(summary.peak_instance, 3);
    }

    #[test]
    fn test_separate_crossings_count_separate_events() {
        let series = [4.5, 3.0, 4.5, 3.0, 4.5];
        let summary = summarize(&series, 4.0);
        assert_eq!(summary.events, 3);
        assert_eq!(summary.longest_event, 1);
    }

    #[test]
    fn test_exactly_at_flood_level_is_not_an_exceedance() {
        let summary = summarize(&[4.0, 4.0, 4.0], 4.0);
        assert_eq!(summary.events, 0);
        assert_eq!(summary.instances_above, 0);
    }

    #[test]
    fn test_series_entirely_above_is_one_long_event() {
        let series = [4.1, 4.2, 4.3, 4.4];
        let summary = summarize(&series, 4.0);
        assert_eq!(summary.events, 1);
        assert_eq!(summary.longest_event, 4);
        assert_eq!(summary.instances_above, 4);
    }

    #[test]
    fn test_empty_series_yields_zeroed_summary() {
        let summary = summarize(&[], 4.0);
        assert_eq!(summary.events, 0);
        assert_eq!(summary.instances_above, 0);
        assert_eq!(summary.peak_level, 0.0);
    }

    #[test]
    fn test_peak_below_flood_level_is_still_reported() {
        let summary = summarize(&[1.0, 2.5, 2.0], 4.0);
        assert_eq!(summary.events, 0);
        assert_eq!(summary.peak_level, 2.5);
        assert_eq!(summary.peak_instance, 1);
    }
}
