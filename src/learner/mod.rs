//! Streaming regression learners.
//!
//! Submodules:
//! - `fimt`   — incremental model tree base learner (FIMT-style).
//! - `forest` — adaptive random forest ensemble over FIMT trees.
//! - `drift`  — ADWIN change detection for member error streams.
//!
//! Everything here learns one instance at a time; there is no batch fit.

pub mod drift;
pub mod fimt;
pub mod forest;

/// A regressor that can be driven prequentially: predict first, then
/// train on the same instance.
///
/// `weight` scales the instance's influence; the ensemble uses Poisson
/// weights for online bagging. A weight of zero must leave the learner
/// unchanged.
pub trait Regressor {
    fn predict(&self, features: &[f64]) -> f64;
    fn train(&mut self, features: &[f64], target: f64, weight: f64);
}
