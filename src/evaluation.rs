//! Prequential (test-then-train) evaluation over an instance stream.
//!
//! Each instance is first predicted, then used to update the learner, so
//! every prediction is made by a model that has never seen that instance.
//! Ground truth and predictions are collected index-aligned with stream
//! order, and RMSE/MAE/R² are maintained both cumulatively and over
//! disjoint windows of a configurable size.

use serde::Serialize;

use crate::config::EvaluationConfig;
use crate::learner::Regressor;
use crate::logging::{self, Stage};
use crate::model::StreamError;
use crate::stream::Instance;

// ---------------------------------------------------------------------------
// Metric helpers
// ---------------------------------------------------------------------------

/// Root mean squared error: sqrt(mean((pred - truth)²)). 0.0 when empty.
pub fn rmse(predictions: &[f64], ground_truth: &[f64]) -> f64 {
    if predictions.is_empty() {
        return 0.0;
    }
    let mse: f64 = predictions
        .iter()
        .zip(ground_truth.iter())
        .map(|(p, t)| (p - t) * (p - t))
        .sum::<f64>()
        / predictions.len() as f64;
    mse.sqrt()
}

/// Mean absolute error. 0.0 when empty.
pub fn mae(predictions: &[f64], ground_truth: &[f64]) -> f64 {
    if predictions.is_empty() {
        return 0.0;
    }
    predictions
        .iter()
        .zip(ground_truth.iter())
        .map(|(p, t)| (p - t).abs())
        .sum::<f64>()
        / predictions.len() as f64
}

/// Coefficient of determination. 0.0 when the ground truth is constant
/// (no variance to explain) or the input is empty.
pub fn r_squared(predictions: &[f64], ground_truth: &[f64]) -> f64 {
    if predictions.is_empty() {
        return 0.0;
    }
    let n = ground_truth.len() as f64;
    let mean = ground_truth.iter().sum::<f64>() / n;
    let sst: f64 = ground_truth.iter().map(|t| (t - mean) * (t - mean)).sum();
    if sst <= 1e-12 {
        return 0.0;
    }
    let sse: f64 = predictions
        .iter()
        .zip(ground_truth.iter())
        .map(|(p, t)| (p - t) * (p - t))
        .sum();
    1.0 - sse / sst
}

// ---------------------------------------------------------------------------
// Incremental accumulator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct MetricAccumulator {
    n: f64,
    sum_sq_err: f64,
    sum_abs_err: f64,
    sum_truth: f64,
    sum_truth_sq: f64,
}

impl MetricAccumulator {
    fn add(&mut self, prediction: f64, truth: f64) {
        let err = prediction - truth;
        self.n += 1.0;
        self.sum_sq_err += err * err;
        self.sum_abs_err += err.abs();
        self.sum_truth += truth;
        self.sum_truth_sq += truth * truth;
    }

    fn snapshot(&self) -> MetricsSnapshot {
        if self.n <= 0.0 {
            return MetricsSnapshot { rmse: 0.0, mae: 0.0, r2: 0.0 };
        }
        let sst = self.sum_truth_sq - self.sum_truth * self.sum_truth / self.n;
        let r2 = if sst > 1e-12 {
            1.0 - self.sum_sq_err / sst
        } else {
            0.0
        };
        MetricsSnapshot {
            rmse: (self.sum_sq_err / self.n).sqrt(),
            mae: self.sum_abs_err / self.n,
            r2,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Point-in-time regression quality.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricsSnapshot {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

/// Metrics over one disjoint evaluation window `[start, end)`.
#[derive(Debug, Clone, Serialize)]
pub struct WindowMetrics {
    pub start: usize,
    pub end: usize,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

/// The evaluation bundle: parallel ground-truth/prediction sequences plus
/// cumulative and windowed metrics.
#[derive(Debug, Clone)]
pub struct EvaluationResults {
    pub instances: usize,
    /// Index-aligned with stream order; empty if `store_y` was off.
    pub ground_truth: Vec<f64>,
    /// Index-aligned with stream order; empty if `store_predictions` was off.
    pub predictions: Vec<f64>,
    pub cumulative: MetricsSnapshot,
    pub windows: Vec<WindowMetrics>,
}

/// Evaluation options; mirrors the `[evaluation]` config section.
#[derive(Debug, Clone)]
pub struct EvaluationOptions {
    pub window_size: usize,
    pub store_predictions: bool,
    pub store_y: bool,
    pub progress_interval: usize,
}

impl From<&EvaluationConfig> for EvaluationOptions {
    fn from(config: &EvaluationConfig) -> Self {
        EvaluationOptions {
            window_size: config.window_size,
            store_predictions: config.store_predictions,
            store_y: config.store_y,
            progress_interval: config.progress_interval,
        }
    }
}

// ---------------------------------------------------------------------------
// The evaluation loop
// ---------------------------------------------------------------------------

/// Runs test-then-train evaluation until the stream is exhausted.
///
/// The learner sees instances exactly in stream order. A stream error
/// aborts the run and propagates; results up to that point are dropped,
/// matching the fail-fast posture of the pipeline.
pub fn prequential_evaluation<S, R>(
    stream: &mut S,
    learner: &mut R,
    options: &EvaluationOptions,
) -> Result<EvaluationResults, StreamError>
where
    S: Iterator<Item = Result<Instance, StreamError>>,
    R: Regressor,
{
    let window_size = options.window_size.max(1);

    let mut ground_truth = Vec::new();
    let mut predictions = Vec::new();
    let mut cumulative = MetricAccumulator::default();
    let mut window = MetricAccumulator::default();
    let mut windows = Vec::new();
    let mut window_start = 0usize;
    let mut instances = 0usize;

    for item in stream {
        let instance = item?;

        let prediction = learner.predict(&instance.features);
        if options.store_predictions {
            predictions.push(prediction);
        }
        if options.store_y {
            ground_truth.push(instance.target);
        }
        cumulative.add(prediction, instance.target);
        window.add(prediction, instance.target);

        learner.train(&instance.features, instance.target, 1.0);
        instances += 1;

        if instances - window_start == window_size {
            let snapshot = window.snapshot();
            windows.push(WindowMetrics {
                start: window_start,
                end: instances,
                rmse: snapshot.rmse,
                mae: snapshot.mae,
                r2: snapshot.r2,
            });
            window = MetricAccumulator::default();
            window_start = instances;
        }

        if options.progress_interval > 0 && instances % options.progress_interval == 0 {
            let snapshot = cumulative.snapshot();
            logging::info(
                Stage::Evaluation,
                &format!(
                    "{} instances processed, cumulative RMSE {:.4}, MAE {:.4}",
                    instances, snapshot.rmse, snapshot.mae
                ),
            );
        }
    }

    // Final partial window, if any instances landed in it.
    if instances > window_start {
        let snapshot = window.snapshot();
        windows.push(WindowMetrics {
            start: window_start,
            end: instances,
            rmse: snapshot.rmse,
            mae: snapshot.mae,
            r2: snapshot.r2,
        });
    }

    Ok(EvaluationResults {
        instances,
        ground_truth,
        predictions,
        cumulative: cumulative.snapshot(),
        windows,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Always predicts zero and learns nothing.
    struct ZeroLearner;

    impl Regressor for ZeroLearner {
        fn predict(&self, _features: &[f64]) -> f64 {
            0.0
        }
        fn train(&mut self, _features: &[f64], _target: f64, _weight: f64) {}
    }

    /// Records the order of predict/train calls to verify test-then-train.
    #[derive(Default)]
    struct OrderProbe {
        trained: std::cell::Cell<usize>,
        prediction_log: std::cell::RefCell<Vec<usize>>,
    }

    impl Regressor for OrderProbe {
        fn predict(&self, _features: &[f64]) -> f64 {
            // Record how many instances had been trained on when this
            // prediction was made.
            self.prediction_log.borrow_mut().push(self.trained.get());
            0.0
        }
        fn train(&mut self, _features: &[f64], _target: f64, _weight: f64) {
            self.trained.set(self.trained.get() + 1);
        }
    }

    fn instance_stream(targets: &[f64]) -> Vec<Result<Instance, StreamError>> {
        targets
            .iter()
            .map(|&t| Ok(Instance { features: vec![t, 1.0], target: t }))
            .collect()
    }

    fn options(window_size: usize) -> EvaluationOptions {
        EvaluationOptions {
            window_size,
            store_predictions: true,
            store_y: true,
            progress_interval: 0,
        }
    }

    #[test]
    fn test_prediction_count_matches_stream_length() {
        let mut stream = instance_stream(&[0.1, 0.2, 0.3, 0.4, 0.5]).into_iter();
        let results =
            prequential_evaluation(&mut stream, &mut ZeroLearner, &options(10)).unwrap();

        assert_eq!(results.instances, 5);
        assert_eq!(results.predictions.len(), 5);
        assert_eq!(results.ground_truth.len(), 5);
    }

    #[test]
    fn test_each_prediction_precedes_training_on_that_instance() {
        let mut stream = instance_stream(&[1.0, 2.0, 3.0, 4.0]).into_iter();
        let mut probe = OrderProbe::default();
        prequential_evaluation(&mut stream, &mut probe, &options(10)).unwrap();

        // Prediction for instance i must happen after training on exactly
        // the i preceding instances.
        assert_eq!(*probe.prediction_log.borrow(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_ground_truth_preserves_stream_order() {
        let targets = [0.5, -0.2, 0.9, 0.0];
        let mut stream = instance_stream(&targets).into_iter();
        let results =
            prequential_evaluation(&mut stream, &mut ZeroLearner, &options(10)).unwrap();
        assert_eq!(results.ground_truth, targets.to_vec());
    }

    #[test]
    fn test_windows_are_disjoint_and_cover_everything() {
        let targets: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let mut stream = instance_stream(&targets).into_iter();
        let results =
            prequential_evaluation(&mut stream, &mut ZeroLearner, &options(3)).unwrap();

        let spans: Vec<(usize, usize)> =
            results.windows.iter().map(|w| (w.start, w.end)).collect();
        assert_eq!(spans, vec![(0, 3), (3, 6), (6, 8)], "final partial window included");
    }

    #[test]
    fn test_cumulative_rmse_of_zero_predictor_is_target_rms() {
        let targets = [3.0, 4.0];
        let mut stream = instance_stream(&targets).into_iter();
        let results =
            prequential_evaluation(&mut stream, &mut ZeroLearner, &options(10)).unwrap();

        // sqrt((9 + 16) / 2)
        let expected = (25.0f64 / 2.0).sqrt();
        assert!((results.cumulative.rmse - expected).abs() < 1e-12);
        assert!((results.cumulative.mae - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_stream_error_propagates() {
        let mut stream = vec![
            Ok(Instance { features: vec![0.0], target: 0.0 }),
            Err(StreamError::BadValue { record: 1, value: "x".into() }),
        ]
        .into_iter();
        let result = prequential_evaluation(&mut stream, &mut ZeroLearner, &options(10));
        assert!(matches!(result, Err(StreamError::BadValue { record: 1, .. })));
    }

    #[test]
    fn test_store_flags_suppress_collection() {
        let mut stream = instance_stream(&[1.0, 2.0]).into_iter();
        let opts = EvaluationOptions {
            store_predictions: false,
            store_y: false,
            ..options(10)
        };
        let results = prequential_evaluation(&mut stream, &mut ZeroLearner, &opts).unwrap();
        assert_eq!(results.instances, 2);
        assert!(results.predictions.is_empty());
        assert!(results.ground_truth.is_empty());
        // Metrics are still maintained.
        assert!(results.cumulative.rmse > 0.0);
    }

    // --- free metric functions ----------------------------------------------

    #[test]
    fn test_rmse_known_value() {
        // sqrt((1 + 4) / 2)
        assert!((rmse(&[1.0, 2.0], &[0.0, 0.0]) - 2.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_mae_known_value() {
        assert!((mae(&[1.0, 2.0], &[0.0, 0.0]) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_r_squared_of_perfect_predictions_is_one() {
        let truth = [1.0, 2.0, 3.0, 4.0];
        assert!((r_squared(&truth, &truth) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_r_squared_of_constant_truth_is_zero() {
        assert_eq!(r_squared(&[1.0, 2.0], &[5.0, 5.0]), 0.0);
    }

    #[test]
    fn test_metrics_of_empty_slices_are_zero() {
        assert_eq!(rmse(&[], &[]), 0.0);
        assert_eq!(mae(&[], &[]), 0.0);
        assert_eq!(r_squared(&[], &[]), 0.0);
    }
}
