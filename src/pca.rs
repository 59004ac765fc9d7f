//! Principal Component Analysis (PCA).
//!
//! Projects data onto directions of maximum variance using the eigenvalue
//! decomposition of the sample covariance matrix (Jacobi rotations from
//! `u-numflow`, [`Matrix::eigen_symmetric`]). Callers that want correlation-based PCA
//! standardize the features first (see
//! [`clustering::standardize`](crate::clustering::standardize)).
//!
//! # Example
//!
//! ```
//! use insight_engine::pca::{pca, PcaConfig};
//!
//! // 6 points in 3D with nearly all variance along one direction
//! let data = vec![
//!     vec![1.0, 0.1, 0.01],
//!     vec![2.0, 0.2, 0.02],
//!     vec![3.0, 0.3, 0.03],
//!     vec![4.0, 0.4, 0.04],
//!     vec![5.0, 0.5, 0.05],
//!     vec![6.0, 0.6, 0.06],
//! ];
//! let result = pca(&data, &PcaConfig::new().n_components(2)).unwrap();
//!
//! assert_eq!(result.n_components, 2);
//! assert!(result.explained_variance_ratio[0] > 0.99);
//! assert_eq!(result.scores.len(), 6);
//! ```

use crate::error::InsightError;
use u_numflow::matrix::{Matrix, MatrixError};

// ── Configuration ─────────────────────────────────────────────────────

/// Configuration for PCA.
#[derive(Debug, Clone, Default)]
pub struct PcaConfig {
    /// Number of components to retain. Default: None (all of them).
    pub n_components: Option<usize>,
}

impl PcaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_components(mut self, n: usize) -> Self {
        self.n_components = Some(n);
        self
    }
}

// ── Result ────────────────────────────────────────────────────────────

/// Result of PCA.
#[derive(Debug, Clone)]
pub struct PcaResult {
    pub n_components: usize,
    /// Variance along each retained component, descending.
    pub eigenvalues: Vec<f64>,
    /// Share of total variance per retained component.
    pub explained_variance_ratio: Vec<f64>,
    pub cumulative_variance_ratio: Vec<f64>,
    /// Row i is the unit loading vector of component i (length d).
    pub loadings: Vec<Vec<f64>>,
    /// One projected point per input row (n × n_components).
    pub scores: Vec<Vec<f64>>,
    /// Feature means used for centering.
    pub means: Vec<f64>,
}

// ── PCA algorithm ─────────────────────────────────────────────────────

/// Runs PCA on row-major `data` (n points of dimension d).
///
/// ```
/// use insight_engine::pca::{pca, PcaConfig};
///
/// let data = vec![
///     vec![1.0, 0.0], vec![2.0, 0.0],
///     vec![3.0, 0.0], vec![4.0, 0.0],
/// ];
/// let result = pca(&data, &PcaConfig::new()).unwrap();
/// assert_eq!(result.n_components, 2);
/// // Second dimension is constant
/// assert!((result.explained_variance_ratio[0] - 1.0).abs() < 1e-10);
/// ```
pub fn pca(data: &[Vec<f64>], config: &PcaConfig) -> Result<PcaResult, InsightError> {
    let n = data.len();
    if n < 2 {
        return Err(InsightError::insufficient_data("PCA", 2, n));
    }

    let d = data[0].len();
    if d == 0 {
        return Err(InsightError::DegenerateData {
            reason: "data has 0 features".into(),
        });
    }
    let k = config.n_components.unwrap_or(d);
    if k == 0 || k > d {
        return Err(InsightError::InvalidParameter {
            name: "n_components".into(),
            message: format!("must be between 1 and {d} (number of features), got {k}"),
        });
    }
    for point in data {
        if point.len() != d {
            return Err(InsightError::DimensionMismatch {
                expected: d,
                actual: point.len(),
            });
        }
        if point.iter().any(|v| !v.is_finite()) {
            return Err(InsightError::DegenerateData {
                reason: "PCA input must be finite".into(),
            });
        }
    }

    let mut means = vec![0.0; d];
    for point in data {
        for (m, &v) in means.iter_mut().zip(point) {
            *m += v;
        }
    }
    for m in &mut means {
        *m /= n as f64;
    }

    let centered: Vec<Vec<f64>> = data
        .iter()
        .map(|p| p.iter().zip(&means).map(|(v, m)| v - m).collect())
        .collect();

    let x = Matrix::new(n, d, centered.iter().flatten().copied().collect())
        .map_err(matrix_error("centered data matrix"))?;
    let scatter = x
        .transpose()
        .mul_mat(&x)
        .map_err(matrix_error("covariance matrix construction"))?;
    let scale = 1.0 / (n - 1) as f64;
    let covariance = Matrix::new(d, d, scatter.data().iter().map(|v| v * scale).collect())
        .map_err(matrix_error("covariance matrix construction"))?;

    let (eigenvalues, eigenvectors) = covariance
        .eigen_symmetric()
        .map_err(matrix_error("eigenvalue decomposition"))?;

    // Round-off can leave tiny negative eigenvalues on rank-deficient input.
    let eigenvalues: Vec<f64> = eigenvalues.into_iter().map(|ev| ev.max(0.0)).collect();
    let total_variance: f64 = eigenvalues.iter().sum();

    let retained: Vec<f64> = eigenvalues[..k].to_vec();
    let explained_variance_ratio: Vec<f64> = if total_variance > 1e-15 {
        retained.iter().map(|&ev| ev / total_variance).collect()
    } else {
        vec![0.0; k]
    };
    let cumulative_variance_ratio: Vec<f64> = explained_variance_ratio
        .iter()
        .scan(0.0, |acc, &r| {
            *acc += r;
            Some(*acc)
        })
        .collect();

    let loadings: Vec<Vec<f64>> = (0..k)
        .map(|comp| (0..d).map(|feat| eigenvectors.get(feat, comp)).collect())
        .collect();

    let scores: Vec<Vec<f64>> = centered
        .iter()
        .map(|point| {
            loadings
                .iter()
                .map(|w| point.iter().zip(w).map(|(x, w)| x * w).sum::<f64>())
                .collect()
        })
        .collect();

    Ok(PcaResult {
        n_components: k,
        eigenvalues: retained,
        explained_variance_ratio,
        cumulative_variance_ratio,
        loadings,
        scores,
        means,
    })
}

fn matrix_error(operation: &'static str) -> impl Fn(MatrixError) -> InsightError {
    move |e| InsightError::ComputationFailed {
        operation: operation.into(),
        detail: e.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn spread_2d() -> Vec<Vec<f64>> {
        vec![
            vec![2.5, 2.4],
            vec![0.5, 0.7],
            vec![2.2, 2.9],
            vec![1.9, 2.2],
            vec![3.1, 3.0],
            vec![2.3, 2.7],
            vec![2.0, 1.6],
            vec![1.0, 1.1],
            vec![1.5, 1.6],
            vec![1.1, 0.9],
        ]
    }

    #[test]
    fn ratios_sum_to_one_when_all_kept() {
        let r = pca(&spread_2d(), &PcaConfig::new()).unwrap();
        assert_abs_diff_eq!(r.cumulative_variance_ratio[1], 1.0, epsilon = 1e-12);
        assert!(r.eigenvalues[0] >= r.eigenvalues[1]);
    }

    #[test]
    fn known_eigenvalues() {
        // Classic tutorial data set: eigenvalues 1.28403, 0.04908
        let r = pca(&spread_2d(), &PcaConfig::new()).unwrap();
        assert_abs_diff_eq!(r.eigenvalues[0], 1.2840277, epsilon = 1e-6);
        assert_abs_diff_eq!(r.eigenvalues[1], 0.0490834, epsilon = 1e-6);
    }

    #[test]
    fn diagonal_loading_for_collinear_data() {
        let data: Vec<Vec<f64>> = (1..=5).map(|i| vec![i as f64, i as f64]).collect();
        let r = pca(&data, &PcaConfig::new()).unwrap();
        assert!(r.explained_variance_ratio[0] > 0.999);
        let expected = 1.0 / 2.0f64.sqrt();
        assert_abs_diff_eq!(r.loadings[0][0].abs(), expected, epsilon = 1e-10);
        assert_abs_diff_eq!(r.loadings[0][1].abs(), expected, epsilon = 1e-10);
    }

    #[test]
    fn scores_are_centered() {
        let r = pca(&spread_2d(), &PcaConfig::new().n_components(1)).unwrap();
        let mean: f64 = r.scores.iter().map(|s| s[0]).sum::<f64>() / r.scores.len() as f64;
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn constant_data_has_zero_ratios() {
        let data = vec![vec![1.0, 2.0]; 4];
        let r = pca(&data, &PcaConfig::new()).unwrap();
        assert_eq!(r.explained_variance_ratio, vec![0.0, 0.0]);
    }

    #[test]
    fn invalid_inputs() {
        assert!(matches!(
            pca(&[vec![1.0]], &PcaConfig::new()),
            Err(InsightError::InsufficientData { .. })
        ));
        assert!(matches!(
            pca(&spread_2d(), &PcaConfig::new().n_components(3)),
            Err(InsightError::InvalidParameter { .. })
        ));
        assert!(matches!(
            pca(&[vec![1.0, 2.0], vec![1.0]], &PcaConfig::new()),
            Err(InsightError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            pca(&[vec![1.0], vec![f64::NAN]], &PcaConfig::new()),
            Err(InsightError::DegenerateData { .. })
        ));
    }
}
