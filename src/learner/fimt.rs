//! Incremental model tree for streaming regression (FIMT-style).
//!
//! Each tree grows from a single leaf. Leaves buffer their first
//! `grace_period` instances to calibrate per-feature bin observers, then
//! accumulate target statistics per bin. Every `grace_period` instances a
//! leaf evaluates candidate splits by standard-deviation reduction and
//! splits when the Hoeffding bound separates the best candidate from the
//! runner-up (or the two are close enough to call a tie). Leaves predict
//! with a linear perceptron trained by stochastic gradient descent on
//! standardized inputs, anchored at the leaf's running target mean.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::learner::Regressor;

/// Candidate thresholds tracked per feature observer.
const N_BINS: usize = 16;

// ---------------------------------------------------------------------------
// Tree parameters
// ---------------------------------------------------------------------------

/// Per-tree configuration, shared by every leaf.
#[derive(Debug, Clone)]
pub struct TreeParams {
    /// Instances a leaf accumulates between split attempts (and the
    /// calibration buffer length for new leaves).
    pub grace_period: usize,
    /// Allowed error probability in the Hoeffding split decision.
    pub split_confidence: f64,
    /// Bound below which near-equal candidates are split anyway.
    pub tie_threshold: f64,
    pub max_depth: usize,
    /// SGD step size for the leaf perceptrons.
    pub learning_rate: f64,
    /// Total feature count of the stream.
    pub n_features: usize,
    /// Features each leaf draws for split consideration.
    pub subspace_size: usize,
}

// ---------------------------------------------------------------------------
// Incremental statistics
// ---------------------------------------------------------------------------

/// Weighted count / sum / sum-of-squares over observed targets.
#[derive(Debug, Clone, Default)]
struct TargetStats {
    n: f64,
    sum: f64,
    sum_sq: f64,
}

impl TargetStats {
    fn add(&mut self, y: f64, weight: f64) {
        self.n += weight;
        self.sum += y * weight;
        self.sum_sq += y * y * weight;
    }

    fn mean(&self) -> f64 {
        if self.n > 0.0 { self.sum / self.n } else { 0.0 }
    }

    fn variance(&self) -> f64 {
        if self.n <= 0.0 {
            return 0.0;
        }
        let mean = self.mean();
        (self.sum_sq / self.n - mean * mean).max(0.0)
    }

    fn sd(&self) -> f64 {
        self.variance().sqrt()
    }

    fn merged(&self, other: &TargetStats) -> TargetStats {
        TargetStats {
            n: self.n + other.n,
            sum: self.sum + other.sum,
            sum_sq: self.sum_sq + other.sum_sq,
        }
    }
}

/// Welford running mean/variance, used for input and target scaling.
#[derive(Debug, Clone, Default)]
struct RunningStats {
    n: f64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    fn add(&mut self, x: f64, weight: f64) {
        if weight <= 0.0 {
            return;
        }
        self.n += weight;
        let delta = x - self.mean;
        self.mean += delta * weight / self.n;
        self.m2 += weight * delta * (x - self.mean);
    }

    fn sd(&self) -> f64 {
        if self.n > 0.0 { (self.m2 / self.n).sqrt() } else { 0.0 }
    }
}

// ---------------------------------------------------------------------------
// Leaf perceptron
// ---------------------------------------------------------------------------

/// Linear model trained by SGD in standardized input/target space.
///
/// Predictions denormalize back through the running target statistics, so
/// an untrained perceptron falls back to the leaf's target mean.
#[derive(Debug, Clone)]
struct Perceptron {
    weights: Vec<f64>,
    bias: f64,
    learning_rate: f64,
    feature_stats: Vec<RunningStats>,
    target_stats: RunningStats,
}

impl Perceptron {
    fn new(n_features: usize, learning_rate: f64) -> Self {
        Perceptron {
            weights: vec![0.0; n_features],
            bias: 0.0,
            learning_rate,
            feature_stats: vec![RunningStats::default(); n_features],
            target_stats: RunningStats::default(),
        }
    }

    fn standardize(&self, features: &[f64]) -> Vec<f64> {
        features
            .iter()
            .zip(self.feature_stats.iter())
            .map(|(&x, s)| {
                let sd = s.sd();
                if sd > 1e-12 { (x - s.mean) / sd } else { 0.0 }
            })
            .collect()
    }

    fn predict(&self, features: &[f64]) -> f64 {
        let target_sd = self.target_stats.sd();
        if target_sd <= 1e-12 {
            return self.target_stats.mean;
        }
        let z = self.standardize(features);
        let raw: f64 = self
            .weights
            .iter()
            .zip(z.iter())
            .map(|(w, zi)| w * zi)
            .sum::<f64>()
            + self.bias;
        let prediction = self.target_stats.mean + raw * target_sd;
        if prediction.is_finite() {
            prediction
        } else {
            self.target_stats.mean
        }
    }

    fn train(&mut self, features: &[f64], target: f64, weight: f64) {
        if weight <= 0.0 {
            return;
        }
        for (s, &x) in self.feature_stats.iter_mut().zip(features.iter()) {
            s.add(x, weight);
        }
        self.target_stats.add(target, weight);

        let target_sd = self.target_stats.sd();
        if target_sd <= 1e-12 {
            return; // constant targets: the mean fallback is already exact
        }

        let z = self.standardize(features);
        let y_norm = (target - self.target_stats.mean) / target_sd;
        let raw: f64 = self
            .weights
            .iter()
            .zip(z.iter())
            .map(|(w, zi)| w * zi)
            .sum::<f64>()
            + self.bias;
        let error = (raw - y_norm).clamp(-1e3, 1e3);

        let step = self.learning_rate * weight;
        for (w, zi) in self.weights.iter_mut().zip(z.iter()) {
            *w -= step * error * zi;
        }
        self.bias -= step * error;
    }
}

// ---------------------------------------------------------------------------
// Split observers
// ---------------------------------------------------------------------------

/// Per-feature binned target statistics over a calibrated value range.
/// Candidate thresholds are the interior bin boundaries; values outside
/// the calibration range clamp into the edge bins.
#[derive(Debug, Clone)]
struct FeatureObserver {
    lo: f64,
    hi: f64,
    bins: Vec<TargetStats>,
}

impl FeatureObserver {
    fn new(lo: f64, hi: f64) -> Self {
        // Degenerate ranges still need a nonzero width for indexing.
        let (lo, hi) = if hi - lo > 1e-12 {
            (lo, hi)
        } else {
            (lo - 0.5, lo + 0.5)
        };
        FeatureObserver {
            lo,
            hi,
            bins: vec![TargetStats::default(); N_BINS],
        }
    }

    fn bin_index(&self, value: f64) -> usize {
        let relative = (value - self.lo) / (self.hi - self.lo);
        ((relative * N_BINS as f64).floor() as isize).clamp(0, N_BINS as isize - 1) as usize
    }

    fn observe(&mut self, value: f64, target: f64, weight: f64) {
        let idx = self.bin_index(value);
        self.bins[idx].add(target, weight);
    }

    /// Best candidate split on this feature by standard-deviation
    /// reduction. Returns `(sdr, threshold)`; `None` if no boundary leaves
    /// enough mass on both sides.
    fn best_split(&self, min_side_weight: f64) -> Option<(f64, f64)> {
        let total = self
            .bins
            .iter()
            .fold(TargetStats::default(), |acc, b| acc.merged(b));
        if total.n <= 0.0 {
            return None;
        }
        let sd_total = total.sd();

        let mut best: Option<(f64, f64)> = None;
        let mut left = TargetStats::default();
        for k in 1..N_BINS {
            left = left.merged(&self.bins[k - 1]);
            let right = TargetStats {
                n: total.n - left.n,
                sum: total.sum - left.sum,
                sum_sq: total.sum_sq - left.sum_sq,
            };
            if left.n < min_side_weight || right.n < min_side_weight {
                continue;
            }
            let sdr = sd_total
                - (left.n / total.n) * left.sd()
                - (right.n / total.n) * right.sd();
            let threshold = self.lo + (self.hi - self.lo) * k as f64 / N_BINS as f64;
            if best.map_or(true, |(b, _)| sdr > b) {
                best = Some((sdr, threshold));
            }
        }
        best
    }
}

// ---------------------------------------------------------------------------
// Tree nodes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
}

#[derive(Debug, Clone)]
struct LeafNode {
    depth: usize,
    stats: TargetStats,
    /// Global feature indices this leaf considers for splitting.
    active_features: Vec<usize>,
    /// Built once the calibration buffer fills; parallel to `active_features`.
    observers: Option<Vec<FeatureObserver>>,
    /// (features, target, weight) held until observers can be calibrated.
    warmup: Vec<(Vec<f64>, f64, f64)>,
    perceptron: Perceptron,
    seen_since_attempt: f64,
}

impl LeafNode {
    fn new_root(params: &TreeParams, rng: &mut StdRng) -> Self {
        LeafNode {
            depth: 0,
            stats: TargetStats::default(),
            active_features: sample_subspace(params, rng),
            observers: None,
            warmup: Vec::new(),
            perceptron: Perceptron::new(params.n_features, params.learning_rate),
            seen_since_attempt: 0.0,
        }
    }

    /// A fresh child leaf inheriting the parent's perceptron, with its own
    /// feature subspace and empty statistics.
    fn child_of(parent: &LeafNode, params: &TreeParams, rng: &mut StdRng) -> Self {
        LeafNode {
            depth: parent.depth + 1,
            stats: TargetStats::default(),
            active_features: sample_subspace(params, rng),
            observers: None,
            warmup: Vec::new(),
            perceptron: parent.perceptron.clone(),
            seen_since_attempt: 0.0,
        }
    }

    fn learn(&mut self, features: &[f64], target: f64, weight: f64, params: &TreeParams) {
        if weight <= 0.0 {
            return;
        }
        self.stats.add(target, weight);
        self.perceptron.train(features, target, weight);
        self.seen_since_attempt += weight;

        match self.observers.as_mut() {
            Some(observers) => {
                for (observer, &f) in observers.iter_mut().zip(self.active_features.iter()) {
                    observer.observe(features[f], target, weight);
                }
            }
            None => {
                self.warmup.push((features.to_vec(), target, weight));
                if self.warmup.len() >= params.grace_period {
                    self.build_observers();
                }
            }
        }
    }

    /// Calibrates bin ranges from the warm-up buffer, replays it, and
    /// drops the buffer.
    fn build_observers(&mut self) {
        let mut observers = Vec::with_capacity(self.active_features.len());
        for &f in &self.active_features {
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for (features, _, _) in &self.warmup {
                lo = lo.min(features[f]);
                hi = hi.max(features[f]);
            }
            observers.push(FeatureObserver::new(lo, hi));
        }
        for (features, target, weight) in std::mem::take(&mut self.warmup) {
            for (observer, &f) in observers.iter_mut().zip(self.active_features.iter()) {
                observer.observe(features[f], target, weight);
            }
        }
        self.observers = Some(observers);
    }

    fn ready_to_attempt(&self, params: &TreeParams) -> bool {
        self.observers.is_some()
            && self.depth < params.max_depth
            && self.seen_since_attempt >= params.grace_period as f64
    }

    /// Hoeffding split decision over the best and runner-up candidates.
    fn choose_split(&self, params: &TreeParams) -> Option<SplitCandidate> {
        let observers = self.observers.as_ref()?;
        let sd_total = self.stats.sd();
        if sd_total <= 1e-12 {
            return None; // constant targets: nothing to reduce
        }

        // Each side of a split must carry enough weight to be worth a leaf.
        let min_side_weight = (self.stats.n / N_BINS as f64).max(2.0);

        let mut candidates: Vec<(f64, SplitCandidate)> = Vec::new();
        for (observer, &f) in observers.iter().zip(self.active_features.iter()) {
            if let Some((sdr, threshold)) = observer.best_split(min_side_weight) {
                candidates.push((sdr, SplitCandidate { feature: f, threshold }));
            }
        }

        let (best_sdr, best) = candidates
            .iter()
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(sdr, c)| (*sdr, c.clone()))?;
        if best_sdr <= 0.0 {
            return None;
        }
        let second_sdr = candidates
            .iter()
            .filter(|(_, c)| c.feature != best.feature)
            .map(|(sdr, _)| *sdr)
            .fold(0.0, f64::max);

        // Hoeffding bound on the SDR ratio, which lives in [0, 1].
        let epsilon =
            ((1.0 / params.split_confidence).ln() / (2.0 * self.stats.n)).sqrt();
        let ratio = second_sdr / best_sdr;

        if ratio < 1.0 - epsilon || epsilon < params.tie_threshold {
            Some(best)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
struct SplitNode {
    feature: usize,
    threshold: f64,
    left: Box<Node>,
    right: Box<Node>,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(LeafNode),
    Split(SplitNode),
}

impl Node {
    fn n_leaves(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Split(s) => s.left.n_leaves() + s.right.n_leaves(),
        }
    }

    fn depth(&self) -> usize {
        match self {
            Node::Leaf(_) => 0,
            Node::Split(s) => 1 + s.left.depth().max(s.right.depth()),
        }
    }
}

fn sample_subspace(params: &TreeParams, rng: &mut StdRng) -> Vec<usize> {
    let k = params.subspace_size.clamp(1, params.n_features);
    if k == params.n_features {
        return (0..params.n_features).collect();
    }
    rand::seq::index::sample(rng, params.n_features, k).into_vec()
}

// ---------------------------------------------------------------------------
// The tree
// ---------------------------------------------------------------------------

/// A single incremental model tree.
#[derive(Debug, Clone)]
pub struct FimtRegressionTree {
    root: Node,
    params: TreeParams,
    rng: StdRng,
}

impl FimtRegressionTree {
    pub fn new(params: TreeParams, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let root = Node::Leaf(LeafNode::new_root(&params, &mut rng));
        FimtRegressionTree { root, params, rng }
    }

    pub fn n_leaves(&self) -> usize {
        self.root.n_leaves()
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

impl Regressor for FimtRegressionTree {
    fn predict(&self, features: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(leaf) => {
                    return if leaf.stats.n > 0.0 {
                        leaf.perceptron.predict(features)
                    } else {
                        leaf.perceptron.target_stats.mean
                    };
                }
                Node::Split(split) => {
                    node = if features[split.feature] <= split.threshold {
                        &*split.left
                    } else {
                        &*split.right
                    };
                }
            }
        }
    }

    fn train(&mut self, features: &[f64], target: f64, weight: f64) {
        if weight <= 0.0 {
            return;
        }
        let FimtRegressionTree { root, params, rng } = self;

        let mut node = root;
        loop {
            match node {
                Node::Split(split) => {
                    node = if features[split.feature] <= split.threshold {
                        &mut *split.left
                    } else {
                        &mut *split.right
                    };
                }
                Node::Leaf(leaf) => {
                    leaf.learn(features, target, weight, params);

                    let candidate = if leaf.ready_to_attempt(params) {
                        leaf.seen_since_attempt = 0.0;
                        leaf.choose_split(params)
                    } else {
                        None
                    };

                    if let Some(chosen) = candidate {
                        let left = LeafNode::child_of(leaf, params, rng);
                        let right = LeafNode::child_of(leaf, params, rng);
                        *node = Node::Split(SplitNode {
                            feature: chosen.feature,
                            threshold: chosen.threshold,
                            left: Box::new(Node::Leaf(left)),
                            right: Box::new(Node::Leaf(right)),
                        });
                    }
                    return;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_params(n_features: usize) -> TreeParams {
        TreeParams {
            grace_period: 50,
            split_confidence: 0.1,
            tie_threshold: 0.05,
            max_depth: 10,
            learning_rate: 0.02,
            n_features,
            subspace_size: n_features,
        }
    }

    #[test]
    fn test_untrained_tree_predicts_zero() {
        let tree = FimtRegressionTree::new(test_params(3), 42);
        assert_eq!(tree.predict(&[0.1, 0.2, 0.3]), 0.0);
        assert_eq!(tree.n_leaves(), 1);
    }

    #[test]
    fn test_tree_learns_a_constant_target_exactly() {
        let mut tree = FimtRegressionTree::new(test_params(2), 42);
        for i in 0..200 {
            let x = [i as f64 * 0.01, (200 - i) as f64 * 0.01];
            tree.train(&x, 5.0, 1.0);
        }
        let prediction = tree.predict(&[0.5, 0.5]);
        assert!(
            (prediction - 5.0).abs() < 1e-9,
            "constant target should be learned exactly, got {}",
            prediction
        );
        // Constant targets give zero SD reduction — the tree must not grow.
        assert_eq!(tree.n_leaves(), 1);
    }

    #[test]
    fn test_tree_splits_on_an_informative_feature() {
        let mut tree = FimtRegressionTree::new(test_params(2), 7);

        // Step function on feature 0; feature 1 is a scrambled copy that
        // bins poorly, so feature 0 wins the split.
        for i in 0..6000 {
            let x0 = (i % 100) as f64 / 100.0;
            let x1 = ((i * 37) % 100) as f64 / 100.0;
            let y = if x0 < 0.5 { 0.0 } else { 1.0 };
            tree.train(&[x0, x1], y, 1.0);
        }

        assert!(
            tree.n_leaves() > 1,
            "a clean step function should trigger at least one split"
        );

        let low = tree.predict(&[0.2, 0.5]);
        let high = tree.predict(&[0.8, 0.5]);
        assert!(
            high - low > 0.5,
            "leaves should specialize: low {} vs high {}",
            low,
            high
        );
    }

    #[test]
    fn test_zero_weight_is_a_noop() {
        let mut tree = FimtRegressionTree::new(test_params(2), 42);
        for _ in 0..100 {
            tree.train(&[0.1, 0.2], 3.0, 1.0);
        }
        let before = tree.predict(&[0.1, 0.2]);
        tree.train(&[9.0, 9.0], -100.0, 0.0);
        let after = tree.predict(&[0.1, 0.2]);
        assert_eq!(before, after);
    }

    #[test]
    fn test_max_depth_zero_never_splits() {
        let mut params = test_params(1);
        params.max_depth = 0;
        let mut tree = FimtRegressionTree::new(params, 7);

        for i in 0..2000 {
            let x0 = (i % 100) as f64 / 100.0;
            let y = if x0 < 0.5 { 0.0 } else { 1.0 };
            tree.train(&[x0], y, 1.0);
        }
        assert_eq!(tree.n_leaves(), 1, "max_depth 0 must pin the tree to its root");
    }

    #[test]
    fn test_subspace_is_clamped_and_distinct() {
        let mut params = test_params(8);
        params.subspace_size = 5;
        let mut rng = StdRng::seed_from_u64(3);
        let subspace = sample_subspace(&params, &mut rng);

        assert_eq!(subspace.len(), 5);
        let mut seen = std::collections::HashSet::new();
        for f in &subspace {
            assert!(*f < 8);
            assert!(seen.insert(*f), "feature {} drawn twice", f);
        }
    }

    #[test]
    fn test_predictions_stay_finite_on_wide_ranges() {
        let mut tree = FimtRegressionTree::new(test_params(2), 42);
        for i in 0..500 {
            let x = [i as f64 * 1e6, -(i as f64) * 1e6];
            tree.train(&x, i as f64, 1.0);
        }
        let prediction = tree.predict(&[1e9, -1e9]);
        assert!(prediction.is_finite());
    }
}
