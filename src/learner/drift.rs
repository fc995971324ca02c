//! ADWIN change detection over a member's absolute prediction error.
//!
//! ADWIN (ADaptive WINdowing) keeps a variable-length window of recent
//! values compressed into an exponential histogram of buckets. Whenever
//! the means of two adjacent sub-windows differ by more than a
//! delta-dependent bound, the older sub-window is dropped and a change is
//! reported. The ensemble wires one detector per member for warnings and
//! one for drifts, with different deltas; both are off by default for this
//! dataset (wave movement made drift detection worse to have).

use std::collections::VecDeque;

/// Max buckets kept per row before two oldest merge into the next row.
const MAX_BUCKETS_PER_ROW: usize = 5;

/// Minimum length of either sub-window before a cut is considered.
const MIN_SUBWINDOW: f64 = 5.0;

/// Minimum total window length before any cut is considered.
const MIN_WINDOW: u64 = 10;

/// One histogram bucket: `2^row` elements summarized by sum and internal
/// variance.
#[derive(Debug, Clone)]
struct Bucket {
    sum: f64,
    variance: f64,
}

/// Adaptive windowing change detector.
#[derive(Debug, Clone)]
pub struct AdwinDetector {
    delta: f64,
    /// rows[i] holds buckets of 2^i elements; front = newest, back = oldest.
    rows: Vec<VecDeque<Bucket>>,
    width: u64,
    total: f64,
    variance: f64,
    n_detections: u64,
}

impl AdwinDetector {
    /// `delta` is the allowed false-positive probability; smaller deltas
    /// make the detector more conservative.
    pub fn new(delta: f64) -> Self {
        AdwinDetector {
            delta,
            rows: vec![VecDeque::new()],
            width: 0,
            total: 0.0,
            variance: 0.0,
            n_detections: 0,
        }
    }

    /// Feeds one value. Returns `true` if a distribution change was
    /// detected (and the window shrunk to the recent regime).
    pub fn add_element(&mut self, value: f64) -> bool {
        // Incremental variance over the whole window, before widening.
        if self.width > 0 {
            let mean = self.total / self.width as f64;
            self.variance += self.width as f64 * (value - mean) * (value - mean)
                / (self.width + 1) as f64;
        }
        self.width += 1;
        self.total += value;

        self.rows[0].push_front(Bucket { sum: value, variance: 0.0 });
        self.compress();

        let changed = self.reduce_window();
        if changed {
            self.n_detections += 1;
        }
        changed
    }

    /// Mean of the current window.
    pub fn estimation(&self) -> f64 {
        if self.width == 0 {
            0.0
        } else {
            self.total / self.width as f64
        }
    }

    /// Current window length.
    pub fn width(&self) -> u64 {
        self.width
    }

    /// Number of changes reported so far.
    pub fn n_detections(&self) -> u64 {
        self.n_detections
    }

    /// Merges overflowing rows upward, preserving sums and variances via
    /// the pairwise variance combination rule.
    fn compress(&mut self) {
        let mut row = 0;
        while row < self.rows.len() {
            if self.rows[row].len() > MAX_BUCKETS_PER_ROW {
                if row + 1 == self.rows.len() {
                    self.rows.push(VecDeque::new());
                }
                let b2 = self.rows[row].pop_back().expect("overflowing row"); // oldest
                let b1 = self.rows[row].pop_back().expect("overflowing row");
                let n = (1u64 << row) as f64;
                let mean1 = b1.sum / n;
                let mean2 = b2.sum / n;
                let merged = Bucket {
                    sum: b1.sum + b2.sum,
                    variance: b1.variance
                        + b2.variance
                        + n * n / (2.0 * n) * (mean1 - mean2) * (mean1 - mean2),
                };
                self.rows[row + 1].push_front(merged);
            } else {
                row += 1;
            }
        }
    }

    /// Scans sub-window boundaries oldest-first; on a significant mean
    /// difference, drops the oldest bucket and rescans until stable.
    fn reduce_window(&mut self) -> bool {
        if self.width < MIN_WINDOW {
            return false;
        }

        let mut changed = false;
        loop {
            match self.find_cut() {
                Some(()) => {
                    self.drop_oldest_bucket();
                    changed = true;
                    if self.width < MIN_WINDOW {
                        break;
                    }
                }
                None => break,
            }
        }
        changed
    }

    /// Returns `Some(())` if any boundary separates two sub-windows whose
    /// means differ beyond the ADWIN bound.
    fn find_cut(&self) -> Option<()> {
        let n = self.width as f64;
        let dd = (2.0 * n.ln() / self.delta).ln();
        let v = self.variance / n;

        let mut n0 = 0.0;
        let mut u0 = 0.0;

        // Oldest bucket first: highest row, back of the deque.
        for row in (0..self.rows.len()).rev() {
            let size = (1u64 << row) as f64;
            for k in (0..self.rows[row].len()).rev() {
                n0 += size;
                u0 += self.rows[row][k].sum;

                let n1 = n - n0;
                if n1 < MIN_SUBWINDOW {
                    return None; // later boundaries only shrink the recent side
                }
                if n0 < MIN_SUBWINDOW {
                    continue;
                }

                let u1 = self.total - u0;
                let m = 1.0 / (n0 - MIN_SUBWINDOW + 1.0) + 1.0 / (n1 - MIN_SUBWINDOW + 1.0);
                let eps = (2.0 * m * v * dd).sqrt() + (2.0 / 3.0) * dd * m;
                if (u0 / n0 - u1 / n1).abs() > eps {
                    return Some(());
                }
            }
        }
        None
    }

    /// Removes the oldest bucket, keeping width/total/variance coherent.
    fn drop_oldest_bucket(&mut self) {
        let row = match (0..self.rows.len()).rev().find(|&r| !self.rows[r].is_empty()) {
            Some(r) => r,
            None => return,
        };
        let bucket = self.rows[row].pop_back().expect("non-empty row");
        let n1 = (1u64 << row) as f64;

        self.width -= 1u64 << row;
        self.total -= bucket.sum;

        if self.width > 0 {
            let mu1 = bucket.sum / n1;
            let rest_mean = self.total / self.width as f64;
            let removed = bucket.variance
                + n1 * self.width as f64 * (mu1 - rest_mean) * (mu1 - rest_mean)
                    / (n1 + self.width as f64);
            self.variance = (self.variance - removed).max(0.0);
        } else {
            self.variance = 0.0;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_stable_stream_reports_no_change() {
        let mut adwin = AdwinDetector::new(0.002);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..2000 {
            let v = 0.2 + rng.gen_range(0.0..0.05);
            assert!(!adwin.add_element(v), "stationary stream must not trip ADWIN");
        }
        assert_eq!(adwin.n_detections(), 0);
        assert_eq!(adwin.width(), 2000);
        assert!((adwin.estimation() - 0.225).abs() < 0.02);
    }

    #[test]
    fn test_mean_shift_is_detected_and_window_shrinks() {
        let mut adwin = AdwinDetector::new(0.002);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..1000 {
            adwin.add_element(0.2 + rng.gen_range(0.0..0.05));
        }

        let mut detected = false;
        for _ in 0..1000 {
            if adwin.add_element(0.8 + rng.gen_range(0.0..0.05)) {
                detected = true;
            }
        }

        assert!(detected, "a 0.2 -> 0.8 mean shift must be detected");
        // 2000 values went in; the pre-shift regime must have been dropped.
        assert!(
            adwin.width() < 1900,
            "window should have shed the pre-shift regime, width is {}",
            adwin.width()
        );
        // After the shift, the estimate should track the new regime.
        assert!(
            adwin.estimation() > 0.6,
            "estimation {} should reflect the post-shift mean",
            adwin.estimation()
        );
    }

    #[test]
    fn test_detection_counter_accumulates() {
        let mut adwin = AdwinDetector::new(0.01);
        let mut rng = StdRng::seed_from_u64(11);

        for block in 0..4 {
            let level = if block % 2 == 0 { 0.1 } else { 0.9 };
            for _ in 0..600 {
                adwin.add_element(level + rng.gen_range(0.0..0.05));
            }
        }
        assert!(
            adwin.n_detections() >= 2,
            "alternating regimes should trip the detector repeatedly, got {}",
            adwin.n_detections()
        );
    }

    #[test]
    fn test_short_window_never_cuts() {
        let mut adwin = AdwinDetector::new(0.002);
        for i in 0..(MIN_WINDOW - 1) {
            // Wildly alternating values, but the window is too short to cut.
            assert!(!adwin.add_element(if i % 2 == 0 { 0.0 } else { 1.0 }));
        }
    }

    #[test]
    fn test_estimation_of_constant_stream_is_exact() {
        let mut adwin = AdwinDetector::new(0.002);
        for _ in 0..100 {
            adwin.add_element(3.5);
        }
        assert!((adwin.estimation() - 3.5).abs() < 1e-9);
        assert_eq!(adwin.width(), 100);
    }
}
