//! Evaluation configuration loader - parses forecast.toml
//!
//! Separates run parameters from code, making it easy to change ensemble
//! sizing, evaluation windows, or chart output without recompiling the
//! service. Every section and field has a default mirroring the 6-hour
//! horizon evaluation run, so a partial file is fine.

use serde::Deserialize;
use std::fs;

use crate::model::DEFAULT_FLOOD_LEVEL;

/// Root configuration structure for TOML parsing
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ForecastConfig {
    pub dataset: DatasetConfig,
    pub learner: LearnerConfig,
    pub evaluation: EvaluationConfig,
    pub charts: ChartsConfig,
    pub report: ReportConfig,
}

/// Input/intermediate file locations.
///
/// The dataset is a headerless CSV: last column is the regression target
/// (relative water-level change over the forecast horizon), last-but-one
/// column is the current water level used as the baseline offset.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub path: String,
    pub temp_path: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: "data/preprocess_normalized.csv".to_string(),
            temp_path: "data/preprocessed_temp.csv".to_string(),
        }
    }
}

/// Adaptive random forest parameters, including the FIMT base-tree
/// configuration shared by every ensemble member.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    pub ensemble_size: usize,
    /// Fraction of features each leaf considers for splitting (0, 1].
    pub max_features: f64,
    /// Poisson λ for per-member instance weighting.
    pub lambda: f64,
    /// Instances a leaf accumulates between split attempts.
    pub grace_period: usize,
    /// Allowed error probability in the Hoeffding split decision.
    pub split_confidence: f64,
    /// Below this bound, near-equal split candidates are broken by force.
    pub tie_threshold: f64,
    pub max_depth: usize,
    pub leaf_learning_rate: f64,
    pub disable_drift_detection: bool,
    pub disable_background_learner: bool,
    pub drift_delta: f64,
    pub warning_delta: f64,
    pub seed: u64,
    /// 1 = train members inline; >1 = dispatch member updates to a pool.
    pub workers: usize,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            ensemble_size: 25,
            max_features: 0.6,
            lambda: 6.0,
            grace_period: 200,
            split_confidence: 0.1,
            tie_threshold: 0.05,
            max_depth: 20,
            leaf_learning_rate: 0.01,
            disable_drift_detection: true,
            disable_background_learner: false,
            drift_delta: 0.001,
            warning_delta: 0.01,
            seed: 1,
            workers: 1,
        }
    }
}

/// Prequential evaluation parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub window_size: usize,
    pub store_predictions: bool,
    pub store_y: bool,
    pub progress_interval: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            window_size: 4500,
            store_predictions: true,
            store_y: true,
            progress_interval: 5000,
        }
    }
}

/// Chart output configuration: the full-series chart and the zoom window.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChartsConfig {
    pub flood_level: f64,
    pub zoom_start: usize,
    pub zoom_end: usize,
    pub full_path: String,
    pub zoom_path: String,
    pub full_width: u32,
    pub full_height: u32,
    pub zoom_width: u32,
    pub zoom_height: u32,
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            flood_level: DEFAULT_FLOOD_LEVEL,
            zoom_start: 56_000,
            zoom_end: 57_000,
            full_path: "results/water_levels_full.png".to_string(),
            zoom_path: "results/water_levels_zoom.png".to_string(),
            full_width: 1800,
            full_height: 500,
            zoom_width: 1200,
            zoom_height: 600,
        }
    }
}

/// Evaluation report output location.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub path: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: "results/evaluation.json".to_string(),
        }
    }
}

/// Loads the run configuration from a forecast.toml file.
///
/// # Panics
/// Panics if the configuration file is missing or malformed. This is
/// intentional — the service cannot evaluate without valid parameters,
/// and a half-applied configuration would silently change the run.
pub fn load_config(path: &str) -> ForecastConfig {
    let contents = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e));

    toml::from_str(&contents).unwrap_or_else(|e| panic!("Failed to parse {}: {}", path, e))
}
