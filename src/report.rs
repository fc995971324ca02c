//! Evaluation report: a JSON bundle written alongside the charts.
//!
//! Captures everything needed to compare runs without rerunning them:
//! dataset shape, learner parameters, cumulative and windowed metrics,
//! and the exceedance summaries for the observed and forecast series.

use std::error::Error;
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use crate::analysis::exceedance::ExceedanceSummary;
use crate::config::LearnerConfig;
use crate::evaluation::{EvaluationResults, MetricsSnapshot, WindowMetrics};

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub path: String,
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LearnerSummary {
    pub ensemble_size: usize,
    pub max_features: f64,
    pub lambda: f64,
    pub grace_period: usize,
    pub split_confidence: f64,
    pub drift_detection: bool,
    pub seed: u64,
}

impl From<&LearnerConfig> for LearnerSummary {
    fn from(config: &LearnerConfig) -> Self {
        LearnerSummary {
            ensemble_size: config.ensemble_size,
            max_features: config.max_features,
            lambda: config.lambda,
            grace_period: config.grace_period,
            split_confidence: config.split_confidence,
            drift_detection: !config.disable_drift_detection,
            seed: config.seed,
        }
    }
}

/// The full report, serialized as pretty-printed JSON.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub generated_at: String,
    pub dataset: DatasetSummary,
    pub learner: LearnerSummary,
    pub instances: usize,
    pub metrics: MetricsSnapshot,
    pub windows: Vec<WindowMetrics>,
    pub observed_exceedance: ExceedanceSummary,
    pub predicted_exceedance: ExceedanceSummary,
}

impl EvaluationReport {
    pub fn new(
        dataset: DatasetSummary,
        learner: LearnerSummary,
        results: &EvaluationResults,
        observed_exceedance: ExceedanceSummary,
        predicted_exceedance: ExceedanceSummary,
    ) -> Self {
        EvaluationReport {
            generated_at: Utc::now().to_rfc3339(),
            dataset,
            learner,
            instances: results.instances,
            metrics: results.cumulative,
            windows: results.windows.clone(),
            observed_exceedance,
            predicted_exceedance,
        }
    }
}

/// Writes the report as pretty JSON, creating parent directories.
pub fn write_report(report: &EvaluationReport, path: &str) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}
