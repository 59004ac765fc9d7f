//! Random forest regression.
//!
//! An ensemble of CART regression trees, each grown to full depth on a
//! bootstrap resample of the rows. Predictions average the trees.
//!
//! # Algorithm
//!
//! Reference: Breiman (2001). "Random Forests", Machine Learning 45.
//!
//! 1. For each tree, draw n row indices with replacement
//! 2. Grow the tree greedily: at each node pick the (feature, threshold)
//!    with the largest reduction in squared error, threshold at the
//!    midpoint between adjacent distinct values
//! 3. Stop when a node is pure, too small to split, or at `max_depth`
//! 4. Impurity decrease per feature gives mean-decrease-in-impurity (MDI)
//!    importances, normalized per tree, averaged, then normalized to sum 1
//!
//! All features are considered at every split.
//!
//! # Example
//!
//! ```
//! use insight_engine::forest::{RandomForest, ForestConfig};
//!
//! // y depends on the first feature only
//! let x1: Vec<f64> = (0..40).map(|i| i as f64).collect();
//! let x2: Vec<f64> = (0..40).map(|i| ((i * 7) % 5) as f64).collect();
//! let y: Vec<f64> = x1.iter().map(|v| 3.0 * v).collect();
//!
//! let forest = RandomForest::fit(&[x1, x2], &y, &ForestConfig::default().n_estimators(20)).unwrap();
//! let imp = forest.feature_importances();
//! assert!(imp[0] > 0.9);
//! ```

use crate::error::InsightError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

// ── Configuration ─────────────────────────────────────────────────────

/// Configuration for random forest regression.
#[derive(Debug, Clone)]
pub struct ForestConfig {
    /// Number of trees. Default: 100.
    pub n_estimators: usize,
    /// Maximum tree depth. Default: None (grow until pure).
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node. Default: 2.
    pub min_samples_split: usize,
    /// Draw a bootstrap resample per tree. Default: true.
    pub bootstrap: bool,
    /// Random seed. Default: 42.
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestConfig {
    pub fn n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn min_samples_split(mut self, n: usize) -> Self {
        self.min_samples_split = n;
        self
    }

    pub fn bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

// ── Model ─────────────────────────────────────────────────────────────

/// A fitted random forest regressor.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<TreeNode>,
    importances: Vec<f64>,
    n_features: usize,
}

impl RandomForest {
    /// Fits the forest. `features` is column-major, one `Vec` per feature,
    /// and must contain only finite values.
    pub fn fit(
        features: &[Vec<f64>],
        target: &[f64],
        config: &ForestConfig,
    ) -> Result<Self, InsightError> {
        let n = target.len();
        let d = features.len();
        if d == 0 {
            return Err(InsightError::NoFeatures);
        }
        if n == 0 {
            return Err(InsightError::insufficient_data("random forest", 1, 0));
        }
        for col in features {
            if col.len() != n {
                return Err(InsightError::DimensionMismatch {
                    expected: n,
                    actual: col.len(),
                });
            }
            if col.iter().any(|v| !v.is_finite()) {
                return Err(InsightError::DegenerateData {
                    reason: "feature values must be finite".into(),
                });
            }
        }
        if target.iter().any(|v| !v.is_finite()) {
            return Err(InsightError::DegenerateData {
                reason: "target values must be finite".into(),
            });
        }
        if config.n_estimators == 0 {
            return Err(InsightError::InvalidParameter {
                name: "n_estimators".into(),
                message: "must be at least 1".into(),
            });
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let grower = Grower {
            features,
            target,
            max_depth: config.max_depth.unwrap_or(usize::MAX),
            min_samples_split: config.min_samples_split.max(2),
        };

        let mut trees = Vec::with_capacity(config.n_estimators);
        let mut importance_sum = vec![0.0; d];
        let mut informative_trees = 0usize;

        for _ in 0..config.n_estimators {
            let mut indices: Vec<usize> = if config.bootstrap {
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };
            let mut decrease = vec![0.0; d];
            let tree = grower.grow(&mut indices, 0, &mut decrease);

            let total: f64 = decrease.iter().sum();
            if total > 0.0 {
                for (acc, v) in importance_sum.iter_mut().zip(&decrease) {
                    *acc += v / total;
                }
                informative_trees += 1;
            }
            trees.push(tree);
        }

        let mut importances = importance_sum;
        if informative_trees > 0 {
            let total: f64 = importances.iter().sum();
            if total > 0.0 {
                for v in &mut importances {
                    *v /= total;
                }
            }
        }
        debug!(
            trees = trees.len(),
            informative_trees, "random forest fitted"
        );

        Ok(Self {
            trees,
            importances,
            n_features: d,
        })
    }

    /// Predicts one row (length = number of features).
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        sum / self.trees.len() as f64
    }

    /// Predicts every row of a column-major feature matrix.
    pub fn predict(&self, features: &[Vec<f64>]) -> Vec<f64> {
        let n = features.first().map_or(0, Vec::len);
        (0..n)
            .map(|i| {
                let row: Vec<f64> = features.iter().map(|c| c[i]).collect();
                self.predict_row(&row)
            })
            .collect()
    }

    /// MDI importances, one per feature, summing to 1 (all zero when no
    /// tree ever split).
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

// ── Tree internals ────────────────────────────────────────────────────

/// Node in a regression tree.
#[derive(Debug, Clone)]
enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    Leaf {
        value: f64,
    },
}

impl TreeNode {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        left.as_ref()
                    } else {
                        right.as_ref()
                    };
                }
            }
        }
    }
}

struct Grower<'a> {
    features: &'a [Vec<f64>],
    target: &'a [f64],
    max_depth: usize,
    min_samples_split: usize,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    /// Reduction in summed squared error.
    gain: f64,
}

impl Grower<'_> {
    fn grow(&self, indices: &mut [usize], depth: usize, decrease: &mut [f64]) -> TreeNode {
        let n = indices.len();
        let (sum, sum_sq) = indices.iter().fold((0.0, 0.0), |(s, q), &i| {
            let y = self.target[i];
            (s + y, q + y * y)
        });
        let mean = sum / n as f64;
        let sse = (sum_sq - sum * sum / n as f64).max(0.0);

        if n < self.min_samples_split || depth >= self.max_depth || sse <= 1e-12 * n as f64 {
            return TreeNode::Leaf { value: mean };
        }

        let Some(best) = self.best_split(indices, sse) else {
            return TreeNode::Leaf { value: mean };
        };
        decrease[best.feature] += best.gain;

        let col = &self.features[best.feature];
        let split_at = partition(indices, |i| col[i] <= best.threshold);
        let (left_idx, right_idx) = indices.split_at_mut(split_at);

        TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.grow(left_idx, depth + 1, decrease)),
            right: Box::new(self.grow(right_idx, depth + 1, decrease)),
        }
    }

    fn best_split(&self, indices: &[usize], parent_sse: f64) -> Option<BestSplit> {
        let n = indices.len();
        let total_sum: f64 = indices.iter().map(|&i| self.target[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| self.target[i].powi(2)).sum();
        let mut best: Option<BestSplit> = None;
        let mut order = indices.to_vec();

        for (f, col) in self.features.iter().enumerate() {
            order.sort_by(|&a, &b| {
                col[a]
                    .partial_cmp(&col[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let (mut left_sum, mut left_sq) = (0.0, 0.0);
            for k in 0..n - 1 {
                let y = self.target[order[k]];
                left_sum += y;
                left_sq += y * y;

                let (x_here, x_next) = (col[order[k]], col[order[k + 1]]);
                if x_here >= x_next {
                    continue;
                }
                let n_left = (k + 1) as f64;
                let n_right = (n - k - 1) as f64;
                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let sse_left = (left_sq - left_sum * left_sum / n_left).max(0.0);
                let sse_right = (right_sq - right_sum * right_sum / n_right).max(0.0);
                let gain = parent_sse - sse_left - sse_right;

                if best.as_ref().map_or(true, |b| gain > b.gain) {
                    let mut threshold = (x_here + x_next) / 2.0;
                    if threshold >= x_next {
                        threshold = x_here;
                    }
                    best = Some(BestSplit {
                        feature: f,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best.filter(|b| b.gain > 0.0)
    }
}

/// Moves elements satisfying `pred` to the front; returns their count.
fn partition(indices: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut store = 0;
    for k in 0..indices.len() {
        if pred(indices[k]) {
            indices.swap(store, k);
            store += 1;
        }
    }
    store
}

// ── Tests ─────────────────────────────────────────────────────────────
