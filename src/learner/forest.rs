//! Adaptive random forest regressor over FIMT base trees.
//!
//! Each ensemble member owns an incremental model tree plus, optionally,
//! a pair of ADWIN detectors over its absolute prediction error and a
//! background tree. Per instance, a member predicts, draws a Poisson(λ)
//! weight for online bagging, and trains. A warning starts a background
//! tree; a drift swaps it in (or resets the member when none is ready).
//! The forest's prediction is the plain mean of member predictions.
//!
//! Member updates are independent, so with `workers > 1` they are
//! dispatched to a thread pool and collected over a channel; results are
//! identical to the inline path because every member keeps its own RNG.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use threadpool::ThreadPool;

use crate::config::LearnerConfig;
use crate::learner::drift::AdwinDetector;
use crate::learner::fimt::{FimtRegressionTree, TreeParams};
use crate::learner::Regressor;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Ensemble-level configuration, resolved against the stream's feature
/// count.
#[derive(Debug, Clone)]
pub struct ForestParams {
    pub ensemble_size: usize,
    /// Poisson λ for per-member instance weighting.
    pub lambda: f64,
    pub drift_enabled: bool,
    pub background_enabled: bool,
    pub drift_delta: f64,
    pub warning_delta: f64,
    pub tree: TreeParams,
}

impl ForestParams {
    pub fn from_config(config: &LearnerConfig, n_features: usize) -> Self {
        let subspace_size = ((config.max_features * n_features as f64).ceil() as usize)
            .clamp(1, n_features.max(1));
        ForestParams {
            ensemble_size: config.ensemble_size.max(1),
            lambda: config.lambda,
            drift_enabled: !config.disable_drift_detection,
            background_enabled: !config.disable_background_learner,
            drift_delta: config.drift_delta,
            warning_delta: config.warning_delta,
            tree: TreeParams {
                grace_period: config.grace_period,
                split_confidence: config.split_confidence,
                tie_threshold: config.tie_threshold,
                max_depth: config.max_depth,
                learning_rate: config.leaf_learning_rate,
                n_features,
                subspace_size,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Ensemble members
// ---------------------------------------------------------------------------

struct Member {
    tree: FimtRegressionTree,
    background: Option<FimtRegressionTree>,
    warning_detector: Option<AdwinDetector>,
    drift_detector: Option<AdwinDetector>,
    rng: StdRng,
    resets: u64,
}

impl Member {
    fn new(params: &ForestParams, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let tree_seed = rng.next_u64();
        Member {
            tree: FimtRegressionTree::new(params.tree.clone(), tree_seed),
            background: None,
            warning_detector: params
                .drift_enabled
                .then(|| AdwinDetector::new(params.warning_delta)),
            drift_detector: params
                .drift_enabled
                .then(|| AdwinDetector::new(params.drift_delta)),
            rng,
            resets: 0,
        }
    }

    /// One prequential step for this member: predict, bag, train, and run
    /// the detectors over the pre-train error.
    fn step(&mut self, params: &ForestParams, features: &[f64], target: f64, weight: f64) {
        let prediction = self.tree.predict(features);

        let k = poisson(params.lambda, &mut self.rng) as f64 * weight;
        if k > 0.0 {
            self.tree.train(features, target, k);
            if let Some(background) = self.background.as_mut() {
                background.train(features, target, k);
            }
        }

        if !params.drift_enabled {
            return;
        }
        let error = (prediction - target).abs();

        let warned = self
            .warning_detector
            .as_mut()
            .is_some_and(|d| d.add_element(error));
        if warned && params.background_enabled && self.background.is_none() {
            let seed = self.rng.next_u64();
            self.background = Some(FimtRegressionTree::new(params.tree.clone(), seed));
        }

        let drifted = self
            .drift_detector
            .as_mut()
            .is_some_and(|d| d.add_element(error));
        if drifted {
            self.tree = match self.background.take() {
                Some(background) => background,
                None => {
                    let seed = self.rng.next_u64();
                    FimtRegressionTree::new(params.tree.clone(), seed)
                }
            };
            self.warning_detector = Some(AdwinDetector::new(params.warning_delta));
            self.drift_detector = Some(AdwinDetector::new(params.drift_delta));
            self.resets += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// The forest
// ---------------------------------------------------------------------------

/// Adaptive random forest regressor. Opaque model state: the pipeline
/// only ever calls `predict` and `train`.
pub struct ForestRegressor {
    params: Arc<ForestParams>,
    members: Vec<Arc<Mutex<Member>>>,
    pool: Option<ThreadPool>,
}

impl ForestRegressor {
    /// Builds the ensemble from run configuration and the stream's
    /// feature count. `workers > 1` attaches a thread pool for member
    /// updates; member RNGs derive from `config.seed`, so results do not
    /// depend on the worker count.
    pub fn from_config(config: &LearnerConfig, n_features: usize) -> Self {
        let params = Arc::new(ForestParams::from_config(config, n_features));
        let mut seeder = StdRng::seed_from_u64(config.seed);
        let members = (0..params.ensemble_size)
            .map(|_| Arc::new(Mutex::new(Member::new(&params, seeder.next_u64()))))
            .collect();
        let pool = (config.workers > 1).then(|| ThreadPool::new(config.workers));
        ForestRegressor { params, members, pool }
    }

    pub fn n_members(&self) -> usize {
        self.members.len()
    }

    /// Total member resets triggered by drift detection.
    pub fn total_resets(&self) -> u64 {
        self.members
            .iter()
            .map(|m| m.lock().unwrap().resets)
            .sum()
    }

    /// Leaves across all member trees; a cheap structure indicator for
    /// logging.
    pub fn total_leaves(&self) -> usize {
        self.members
            .iter()
            .map(|m| m.lock().unwrap().tree.n_leaves())
            .sum()
    }
}

impl Regressor for ForestRegressor {
    fn predict(&self, features: &[f64]) -> f64 {
        if self.members.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .members
            .iter()
            .map(|m| m.lock().unwrap().tree.predict(features))
            .sum();
        sum / self.members.len() as f64
    }

    fn train(&mut self, features: &[f64], target: f64, weight: f64) {
        if weight <= 0.0 {
            return;
        }
        match &self.pool {
            Some(pool) => {
                let shared: Arc<Vec<f64>> = Arc::new(features.to_vec());
                let (tx, rx) = mpsc::channel();
                for member in &self.members {
                    let member = Arc::clone(member);
                    let params = Arc::clone(&self.params);
                    let features = Arc::clone(&shared);
                    let tx = tx.clone();
                    pool.execute(move || {
                        member
                            .lock()
                            .unwrap()
                            .step(&params, &features, target, weight);
                        let _ = tx.send(());
                    });
                }
                drop(tx);
                // Block until every member finished this instance.
                for _ in rx {}
            }
            None => {
                for member in &self.members {
                    member
                        .lock()
                        .unwrap()
                        .step(&self.params, features, target, weight);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Poisson sampling
// ---------------------------------------------------------------------------

/// Draws from Poisson(λ) by Knuth's product method. λ of 6 keeps the
/// loop short; zero or negative λ yields 0.
fn poisson(lambda: f64, rng: &mut StdRng) -> u64 {
    if lambda <= 0.0 {
        return 0;
    }
    let limit = (-lambda).exp();
    let mut k = 0u64;
    let mut product = 1.0;
    loop {
        product *= rng.gen_range(0.0..1.0);
        if product <= limit {
            return k;
        }
        k += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
