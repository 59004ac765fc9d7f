//! K-Means clustering with automatic choice of K.
//!
//! - **K-Means**: K-Means++ initialization (Arthur & Vassilvitskii, 2007),
//!   Lloyd's iterative refinement, several seeded restarts keeping the
//!   lowest inertia.
//! - **Elbow selection**: sweeps K and picks the K just before the largest
//!   drop in inertia.
//! - **Compactness selection**: sweeps K and scores each clustering by
//!   `Σ 1 / (1 + mean intra-cluster distance)` over clusters with more than
//!   one member.
//! - **Cluster summaries**: size, share of rows and per-feature profile of
//!   each cluster against the overall mean.
//!
//! Features are standardized with [`standardize`] before clustering.
//!
//! # Example
//!
//! ```
//! use insight_engine::clustering::{kmeans, KMeansConfig};
//!
//! // 2D data with 2 obvious clusters
//! let data = vec![
//!     vec![1.0, 1.0], vec![1.5, 1.5], vec![1.2, 1.3],
//!     vec![8.0, 8.0], vec![8.5, 8.5], vec![8.2, 8.3],
//! ];
//! let result = kmeans(&data, &KMeansConfig::new(2)).unwrap();
//!
//! assert_eq!(result.k, 2);
//! assert_eq!(result.labels.len(), 6);
//! assert!(result.inertia < 10.0); // tight clusters
//! ```

use crate::error::InsightError;
use crate::stats;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

// ── Configuration ─────────────────────────────────────────────────────

/// Configuration for K-Means clustering.
#[derive(Debug, Clone)]
pub struct KMeansConfig {
    /// Number of clusters.
    pub k: usize,
    /// Maximum iterations. Default: 300.
    pub max_iter: usize,
    /// Convergence tolerance (centroid movement). Default: 1e-6.
    pub tol: f64,
    /// Number of seeded restarts (best result kept). Default: 10.
    pub n_init: usize,
    /// Random seed. Default: 42.
    pub seed: u64,
}

impl KMeansConfig {
    /// Creates a config for a fixed number of clusters with default parameters.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 300,
            tol: 1e-6,
            n_init: 10,
            seed: 42,
        }
    }

    pub fn k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

// ── Result ────────────────────────────────────────────────────────────

/// Result of K-Means clustering.
#[derive(Debug, Clone)]
pub struct KMeansResult {
    /// Number of clusters.
    pub k: usize,
    /// Cluster centroids (k × d, row-major).
    pub centroids: Vec<Vec<f64>>,
    /// Cluster label for each data point (0..k).
    pub labels: Vec<usize>,
    /// Within-cluster sum of squared distances.
    pub inertia: f64,
    /// Iterations of the kept restart.
    pub iterations: usize,
    /// Number of points per cluster.
    pub cluster_sizes: Vec<usize>,
}

// ── Standardization ───────────────────────────────────────────────────

/// Scales each feature to zero mean and unit population variance.
///
/// Constant features are only centered. `data` is row-major.
///
/// ```
/// use insight_engine::clustering::standardize;
///
/// let z = standardize(&[vec![1.0, 5.0], vec![3.0, 5.0]]);
/// assert_eq!(z, vec![vec![-1.0, 0.0], vec![1.0, 0.0]]);
/// ```
pub fn standardize(data: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let Some(first) = data.first() else {
        return Vec::new();
    };
    let d = first.len();
    let (means, scales): (Vec<f64>, Vec<f64>) = (0..d)
        .map(|j| {
            let col: Vec<f64> = data.iter().map(|row| row[j]).collect();
            let sd = stats::population_std(&col);
            let scale = if sd.is_finite() && sd > 0.0 { sd } else { 1.0 };
            (stats::mean(&col), scale)
        })
        .unzip();

    data.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(j, &v)| (v - means[j]) / scales[j])
                .collect()
        })
        .collect()
}

// ── K-Means algorithm ─────────────────────────────────────────────────

/// Runs K-Means clustering with K-Means++ initialization.
///
/// ```
/// use insight_engine::clustering::{kmeans, KMeansConfig};
///
/// let data = vec![
///     vec![0.0, 0.0], vec![0.5, 0.5],
///     vec![10.0, 10.0], vec![10.5, 10.5],
/// ];
/// let result = kmeans(&data, &KMeansConfig::new(2)).unwrap();
/// assert_eq!(result.labels[0], result.labels[1]);
/// assert_eq!(result.labels[2], result.labels[3]);
/// assert_ne!(result.labels[0], result.labels[2]);
/// ```
pub fn kmeans(data: &[Vec<f64>], config: &KMeansConfig) -> Result<KMeansResult, InsightError> {
    let n = data.len();
    let k = config.k;

    if n == 0 {
        return Err(InsightError::DegenerateData {
            reason: "no data points provided".into(),
        });
    }
    if k == 0 || k > n {
        return Err(InsightError::InvalidParameter {
            name: "n_clusters".into(),
            message: format!("must be between 1 and {n} (number of data points), got {k}"),
        });
    }
    if config.n_init == 0 {
        return Err(InsightError::InvalidParameter {
            name: "n_init".into(),
            message: "must be at least 1".into(),
        });
    }

    let d = data[0].len();
    for point in data {
        if point.len() != d {
            return Err(InsightError::DimensionMismatch {
                expected: d,
                actual: point.len(),
            });
        }
        if point.iter().any(|v| !v.is_finite()) {
            return Err(InsightError::DegenerateData {
                reason: "points must be finite".into(),
            });
        }
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best: Option<KMeansResult> = None;
    for _ in 0..config.n_init {
        let result = kmeans_single(data, k, d, config.max_iter, config.tol, &mut rng);
        if best.as_ref().map_or(true, |b| result.inertia < b.inertia) {
            best = Some(result);
        }
    }

    best.ok_or_else(|| InsightError::ComputationFailed {
        operation: "k-means".into(),
        detail: "no restart produced a result".into(),
    })
}

// ── Choosing K ────────────────────────────────────────────────────────

/// Fallback when the elbow sweep yields fewer than two inertias.
pub const DEFAULT_K: usize = 3;

/// Inertia per candidate K and the K picked by the elbow rule.
#[derive(Debug, Clone)]
pub struct ElbowSelection {
    pub inertias: Vec<(usize, f64)>,
    pub k: usize,
}

/// Elbow rule over K in `2..min(8, n / 2)`.
///
/// Picks the K preceding the largest inertia drop (the first on ties),
/// or [`DEFAULT_K`] when fewer than two K values were tried.
pub fn elbow_select(data: &[Vec<f64>], config: &KMeansConfig) -> Result<ElbowSelection, InsightError> {
    let upper = 8.min(data.len() / 2);
    let mut inertias = Vec::new();
    for k in 2..upper {
        let result = kmeans(data, &config.clone().k(k))?;
        inertias.push((k, result.inertia));
    }

    let mut k = DEFAULT_K;
    if inertias.len() >= 2 {
        let mut best_drop = f64::NEG_INFINITY;
        for w in inertias.windows(2) {
            let drop = w[0].1 - w[1].1;
            if drop > best_drop {
                best_drop = drop;
                k = w[0].0;
            }
        }
    }
    debug!(k, candidates = inertias.len(), "elbow selection");
    Ok(ElbowSelection { inertias, k })
}

/// Compactness score per candidate K and the winning clustering.
#[derive(Debug, Clone)]
pub struct CompactnessSelection {
    pub scores: Vec<(usize, f64)>,
    pub k: usize,
    pub result: KMeansResult,
}

/// Sums `1 / (1 + mean pairwise distance)` over clusters with more than one
/// member. The mean runs over all ordered pairs, self-pairs included.
pub fn compactness_score(data: &[Vec<f64>], labels: &[usize], k: usize) -> f64 {
    let mut score = 0.0;
    for c in 0..k {
        let members: Vec<&Vec<f64>> = data
            .iter()
            .zip(labels)
            .filter(|(_, l)| **l == c)
            .map(|(p, _)| p)
            .collect();
        let m = members.len();
        if m <= 1 {
            continue;
        }
        let mut total = 0.0;
        for a in &members {
            for b in &members {
                total += euclidean_dist(a, b);
            }
        }
        score += 1.0 / (1.0 + total / (m * m) as f64);
    }
    score
}

/// Compactness rule over K in `2..min(6, n)`; the first best score wins.
/// With no candidates K is 2.
pub fn compactness_select(
    data: &[Vec<f64>],
    config: &KMeansConfig,
) -> Result<CompactnessSelection, InsightError> {
    let upper = 6.min(data.len());
    let mut scores = Vec::new();
    let mut best: Option<(usize, f64, KMeansResult)> = None;

    for k in 2..upper {
        let result = kmeans(data, &config.clone().k(k))?;
        let score = compactness_score(data, &result.labels, k);
        scores.push((k, score));
        if best.as_ref().map_or(true, |(_, s, _)| score > *s) {
            best = Some((k, score, result));
        }
    }

    let (k, result) = match best {
        Some((k, _, result)) => (k, result),
        None => (2, kmeans(data, &config.clone().k(2))?),
    };
    debug!(k, candidates = scores.len(), "compactness selection");
    Ok(CompactnessSelection { scores, k, result })
}

// ── Cluster summaries ─────────────────────────────────────────────────

/// One feature's profile inside a cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureProfile {
    pub name: String,
    /// Mean of the present values in the cluster.
    pub mean: f64,
    /// Sample standard deviation in the cluster.
    pub std: f64,
    /// Cluster mean minus overall mean.
    pub vs_overall: f64,
}

/// Size and feature profile of one cluster.
#[derive(Debug, Clone)]
pub struct ClusterSummary {
    pub cluster_id: usize,
    pub size: usize,
    /// Share of clustered rows, in percent.
    pub percentage: f64,
    pub features: Vec<FeatureProfile>,
}

/// Summarizes clusters over the unscaled values.
///
/// `columns` hold one value per clustered row (missing as `None`); each
/// statistic uses the present values only.
pub fn summarize_clusters(
    columns: &[Vec<Option<f64>>],
    names: &[String],
    labels: &[usize],
    k: usize,
) -> Vec<ClusterSummary> {
    let n = labels.len();
    let overall: Vec<f64> = columns
        .iter()
        .map(|col| stats::mean(&col.iter().flatten().copied().collect::<Vec<f64>>()))
        .collect();

    (0..k)
        .map(|c| {
            let rows: Vec<usize> = (0..n).filter(|&i| labels[i] == c).collect();
            let features = names
                .iter()
                .zip(columns)
                .zip(&overall)
                .map(|((name, col), &overall_mean)| {
                    let values: Vec<f64> = rows.iter().filter_map(|&i| col[i]).collect();
                    let mean = stats::mean(&values);
                    FeatureProfile {
                        name: name.clone(),
                        mean,
                        std: stats::std_dev(&values),
                        vs_overall: mean - overall_mean,
                    }
                })
                .collect();
            ClusterSummary {
                cluster_id: c,
                size: rows.len(),
                percentage: if n == 0 {
                    0.0
                } else {
                    rows.len() as f64 / n as f64 * 100.0
                },
                features,
            }
        })
        .collect()
}

// ── Internal K-Means ──────────────────────────────────────────────────

fn kmeans_single(
    data: &[Vec<f64>],
    k: usize,
    d: usize,
    max_iter: usize,
    tol: f64,
    rng: &mut StdRng,
) -> KMeansResult {
    let n = data.len();

    let mut centroids = kmeans_plus_plus(data, k, rng);
    let mut labels = vec![0usize; n];
    let mut iterations = 0;

    for iter in 0..max_iter {
        iterations = iter + 1;

        // Assignment step
        for (i, point) in data.iter().enumerate() {
            labels[i] = nearest(point, &centroids);
        }

        // Update step
        let mut new_centroids = vec![vec![0.0; d]; k];
        let mut counts = vec![0usize; k];
        for (i, point) in data.iter().enumerate() {
            let c = labels[i];
            counts[c] += 1;
            for (j, &v) in point.iter().enumerate() {
                new_centroids[c][j] += v;
            }
        }
        for c in 0..k {
            if counts[c] > 0 {
                for val in &mut new_centroids[c] {
                    *val /= counts[c] as f64;
                }
            } else {
                // Empty cluster: keep old centroid
                new_centroids[c] = centroids[c].clone();
            }
        }

        let max_shift: f64 = centroids
            .iter()
            .zip(new_centroids.iter())
            .map(|(old, new)| euclidean_dist(old, new))
            .fold(0.0f64, f64::max);

        centroids = new_centroids;

        if max_shift < tol {
            break;
        }
    }

    // Final assignment against the converged centroids.
    for (i, point) in data.iter().enumerate() {
        labels[i] = nearest(point, &centroids);
    }

    let mut inertia = 0.0;
    let mut cluster_sizes = vec![0usize; k];
    for (i, point) in data.iter().enumerate() {
        let c = labels[i];
        cluster_sizes[c] += 1;
        inertia += euclidean_dist_sq(point, &centroids[c]);
    }

    KMeansResult {
        k,
        centroids,
        labels,
        inertia,
        iterations,
        cluster_sizes,
    }
}

/// K-Means++ seeding: each further centroid is drawn with probability
/// proportional to its squared distance from the nearest chosen centroid.
fn kmeans_plus_plus(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = data.len();
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
    centroids.push(data[rng.gen_range(0..n)].clone());

    let mut min_dists = vec![f64::INFINITY; n];
    while centroids.len() < k {
        if let Some(last) = centroids.last() {
            for (i, point) in data.iter().enumerate() {
                min_dists[i] = min_dists[i].min(euclidean_dist_sq(point, last));
            }
        }

        let total: f64 = min_dists.iter().sum();
        if total < 1e-15 {
            // All points coincide with a centroid: pick any.
            centroids.push(data[rng.gen_range(0..n)].clone());
            continue;
        }

        let target = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        let mut chosen = n - 1;
        for (i, &dist) in min_dists.iter().enumerate() {
            cumulative += dist;
            if cumulative >= target && dist > 0.0 {
                chosen = i;
                break;
            }
        }
        centroids.push(data[chosen].clone());
    }

    centroids
}

fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut min_dist = f64::INFINITY;
    let mut best = 0;
    for (c, centroid) in centroids.iter().enumerate() {
        let dist = euclidean_dist_sq(point, centroid);
        if dist < min_dist {
            min_dist = dist;
            best = c;
        }
    }
    best
}

// ── Distance helpers ──────────────────────────────────────────────────

#[inline]
fn euclidean_dist_sq(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&ai, &bi)| {
            let diff = ai - bi;
            diff * diff
        })
        .sum()
}

#[inline]
fn euclidean_dist(a: &[f64], b: &[f64]) -> f64 {
    euclidean_dist_sq(a, b).sqrt()
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn three_blobs() -> Vec<Vec<f64>> {
        let mut data = Vec::new();
        for (cx, cy) in [(0.0, 0.0), (10.0, 10.0), (20.0, 0.0)] {
            for i in 0..4 {
                let off = i as f64 * 0.1;
                data.push(vec![cx + off, cy - off]);
            }
        }
        data
    }

    // ── K-Means ──────────────────────────────────────────────────

    #[test]
    fn kmeans_separates_blobs() {
        let data = three_blobs();
        let r = kmeans(&data, &KMeansConfig::new(3)).unwrap();
        for blob in 0..3 {
            let l = r.labels[blob * 4];
            assert!(r.labels[blob * 4..blob * 4 + 4].iter().all(|&x| x == l));
        }
        assert_eq!(r.cluster_sizes.iter().sum::<usize>(), 12);
        assert!(r.inertia < 1.0);
    }

    #[test]
    fn kmeans_deterministic() {
        let data = three_blobs();
        let a = kmeans(&data, &KMeansConfig::new(2)).unwrap();
        let b = kmeans(&data, &KMeansConfig::new(2)).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.inertia, b.inertia);
    }

    #[test]
    fn kmeans_k_exceeds_points() {
        let data = vec![vec![1.0], vec![2.0]];
        let err = kmeans(&data, &KMeansConfig::new(3)).unwrap_err();
        assert!(matches!(err, InsightError::InvalidParameter { .. }));
    }

    #[test]
    fn kmeans_identical_points() {
        let data = vec![vec![1.0, 1.0]; 5];
        let r = kmeans(&data, &KMeansConfig::new(2)).unwrap();
        assert_eq!(r.inertia, 0.0);
    }

    // ── Standardization ──────────────────────────────────────────

    #[test]
    fn standardize_zero_mean_unit_variance() {
        let data = vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 60.0]];
        let z = standardize(&data);
        for j in 0..2 {
            let col: Vec<f64> = z.iter().map(|r| r[j]).collect();
            assert_abs_diff_eq!(stats::mean(&col), 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(stats::population_std(&col), 1.0, epsilon = 1e-12);
        }
    }

    // ── Choosing K ───────────────────────────────────────────────

    #[test]
    fn elbow_default_when_sweep_short() {
        // n = 6 → range 2..3 → one inertia → fallback
        let data: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64, 0.0]).collect();
        let sel = elbow_select(&data, &KMeansConfig::new(2)).unwrap();
        assert_eq!(sel.inertias.len(), 1);
        assert_eq!(sel.k, DEFAULT_K);
    }

    #[test]
    fn elbow_sweeps_bounded_range() {
        let data = standardize(&three_blobs());
        let sel = elbow_select(&data, &KMeansConfig::new(2)).unwrap();
        // n = 12 → K in 2..6
        let ks: Vec<usize> = sel.inertias.iter().map(|(k, _)| *k).collect();
        assert_eq!(ks, vec![2, 3, 4, 5]);
        assert!(ks.contains(&sel.k));
    }

    #[test]
    fn compactness_score_counts_self_pairs() {
        // Two points at distance 2: mean over 4 ordered pairs = 1.0
        let data = vec![vec![0.0], vec![2.0], vec![9.0]];
        let s = compactness_score(&data, &[0, 0, 1], 2);
        assert_abs_diff_eq!(s, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn compactness_select_small_n() {
        let data = vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![5.0, 5.0]];
        let sel = compactness_select(&data, &KMeansConfig::new(2)).unwrap();
        assert_eq!(sel.scores.len(), 1);
        assert_eq!(sel.k, 2);
        assert_eq!(sel.result.labels.len(), 3);
    }

    // ── Summaries ────────────────────────────────────────────────

    #[test]
    fn summaries_skip_missing_values() {
        let cols = vec![vec![Some(1.0), None, Some(5.0), Some(7.0)]];
        let s = summarize_clusters(&cols, &["x".to_string()], &[0, 0, 1, 1], 2);
        assert_eq!(s[0].size, 2);
        assert_abs_diff_eq!(s[0].features[0].mean, 1.0);
        // overall mean of present values = 13 / 3
        assert_abs_diff_eq!(s[1].features[0].vs_overall, 6.0 - 13.0 / 3.0, epsilon = 1e-12);
        assert!(s[0].features[0].std.is_nan());
    }

    proptest! {
        #[test]
        fn cluster_percentages_sum_to_100(
            points in prop::collection::vec((-50.0f64..50.0, -50.0f64..50.0), 4..30),
            k in 2usize..4,
        ) {
            let data: Vec<Vec<f64>> = points.iter().map(|&(a, b)| vec![a, b]).collect();
            let r = kmeans(&standardize(&data), &KMeansConfig::new(k).n_init(2)).unwrap();
            let cols: Vec<Vec<Option<f64>>> = (0..2)
                .map(|j| data.iter().map(|p| Some(p[j])).collect())
                .collect();
            let names = vec!["a".to_string(), "b".to_string()];
            let total: f64 = summarize_clusters(&cols, &names, &r.labels, k)
                .iter()
                .map(|c| c.percentage)
                .sum();
            prop_assert!((total - 100.0).abs() < 1e-9);
        }
    }
}
