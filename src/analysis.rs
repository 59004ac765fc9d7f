//! Correlation and linear regression.
//!
//! Correlation works on columns with gaps: each pair of columns uses the
//! rows where both are present. Linear regression expects complete,
//! already-imputed columns.
//!
//! # Correlation Analysis
//!
//! ```
//! use insight_engine::analysis::{correlation_analysis, CorrelationConfig};
//!
//! let columns = vec![
//!     vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)],
//!     vec![Some(2.0), Some(4.0), Some(5.0), Some(4.0), Some(5.0)],
//!     vec![Some(5.0), Some(4.0), Some(3.0), Some(2.0), Some(1.0)],
//! ];
//! let names = vec!["x".into(), "y".into(), "z".into()];
//! let result = correlation_analysis(&columns, &names, &CorrelationConfig::default()).unwrap();
//!
//! assert_eq!(result.matrix.rows(), 3);
//! assert_eq!(result.top_pairs[0].var1, "x"); // x-z is perfectly anti-correlated
//! assert_eq!(result.top_pairs[0].var2, "z");
//! ```

use crate::error::InsightError;
use crate::insight::CorrelationStrength;
use crate::stats;
use tracing::{debug, warn};
use u_analytics::regression::{multiple_linear_regression, MultipleRegressionResult};
use u_numflow::matrix::Matrix;

// ── Correlation Analysis ──────────────────────────────────────────────

/// Configuration for correlation analysis.
#[derive(Debug, Clone)]
pub struct CorrelationConfig {
    /// Number of strongest pairs to report. Default: 10.
    pub top_n: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self { top_n: 10 }
    }
}

impl CorrelationConfig {
    pub fn top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }
}

/// A ranked pair of columns.
#[derive(Debug, Clone)]
pub struct CorrelationPair {
    pub var1: String,
    pub var2: String,
    pub r: f64,
    pub strength: CorrelationStrength,
}

/// Result of correlation analysis.
#[derive(Debug, Clone)]
pub struct CorrelationAnalysis {
    /// Column names, in matrix order.
    pub names: Vec<String>,
    /// n×n symmetric Pearson matrix with unit diagonal. Entries for pairs
    /// with a constant side or fewer than three shared rows are `NaN`.
    pub matrix: Matrix,
    /// Number of pairs with a finite coefficient.
    pub pairs_found: usize,
    /// Strongest pairs by `|r|`, at most `top_n`.
    pub top_pairs: Vec<CorrelationPair>,
}

/// Computes the pairwise-complete Pearson matrix and ranks column pairs.
pub fn correlation_analysis(
    columns: &[Vec<Option<f64>>],
    names: &[String],
    config: &CorrelationConfig,
) -> Result<CorrelationAnalysis, InsightError> {
    let n = columns.len();
    if n < 2 {
        return Err(InsightError::insufficient_columns("correlation analysis", 2, n));
    }
    if names.len() != n {
        return Err(InsightError::DimensionMismatch {
            expected: n,
            actual: names.len(),
        });
    }

    let mut matrix = Matrix::identity(n);
    let mut pairs = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = stats::pairwise_complete(&columns[i], &columns[j]);
            let r = stats::pearson(&a, &b);
            matrix.set(i, j, r);
            matrix.set(j, i, r);
            if r.is_finite() {
                pairs.push(CorrelationPair {
                    var1: names[i].clone(),
                    var2: names[j].clone(),
                    r,
                    strength: CorrelationStrength::from_r(r),
                });
            }
        }
    }

    let pairs_found = pairs.len();
    // Stable sort keeps matrix order among equal magnitudes.
    pairs.sort_by(|a, b| {
        b.r.abs()
            .partial_cmp(&a.r.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    pairs.truncate(config.top_n);

    Ok(CorrelationAnalysis {
        names: names.to_vec(),
        matrix,
        pairs_found,
        top_pairs: pairs,
    })
}

// ── Linear Regression ─────────────────────────────────────────────────

/// Ordinary least squares fit with intercept.
#[derive(Debug, Clone)]
pub struct LinearFit {
    pub intercept: f64,
    /// One coefficient per feature, in input order.
    pub coefficients: Vec<f64>,
    /// Training R² (not clamped).
    pub r_squared: f64,
    /// In-sample predictions.
    pub fitted: Vec<f64>,
}

impl LinearFit {
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

/// Fits `target ≈ intercept + Σ coef·feature` by least squares.
///
/// `features` is column-major (one `Vec` per feature). When the full design
/// is singular or has fewer than `p + 2` rows, features are admitted one at
/// a time in input order and any feature that would make the system
/// singular keeps a zero coefficient. With no admissible feature, or a
/// constant target, the model is the target mean.
///
/// ```
/// use insight_engine::analysis::linear_regression;
///
/// let x = vec![vec![1.0, 2.0, 3.0, 4.0, 5.0]];
/// let y = vec![2.1, 3.9, 6.1, 7.9, 10.1];
/// let fit = linear_regression(&x, &y).unwrap();
/// assert!(fit.r_squared > 0.99);
/// assert!((fit.coefficients[0] - 2.0).abs() < 0.1);
/// ```
pub fn linear_regression(features: &[Vec<f64>], target: &[f64]) -> Result<LinearFit, InsightError> {
    let n = target.len();
    if features.is_empty() {
        return Err(InsightError::NoFeatures);
    }
    if n == 0 {
        return Err(InsightError::insufficient_data("linear regression", 1, 0));
    }
    for col in features {
        if col.len() != n {
            return Err(InsightError::DimensionMismatch {
                expected: n,
                actual: col.len(),
            });
        }
    }
    if features.iter().flatten().chain(target).any(|v| !v.is_finite()) {
        return Err(InsightError::DegenerateData {
            reason: "regression input contains non-finite values".into(),
        });
    }

    let p = features.len();
    let mut kept: Vec<usize> = Vec::new();
    let mut result = None;
    if target.iter().any(|&y| y != target[0]) {
        kept = (0..p).collect();
        result = fit_columns(features, &kept, target);
        if result.is_none() {
            kept.clear();
            for j in 0..p {
                kept.push(j);
                match fit_columns(features, &kept, target) {
                    Some(r) => result = Some(r),
                    None => {
                        kept.pop();
                    }
                }
            }
            debug!(features = p, kept = kept.len(), "reduced regression design");
        }
    }

    let fit = match result {
        Some(r) => {
            let mut coefficients = vec![0.0; p];
            for (&j, &c) in kept.iter().zip(&r.coefficients[1..]) {
                coefficients[j] = c;
            }
            LinearFit {
                intercept: r.coefficients[0],
                coefficients,
                r_squared: r2_score(target, &r.fitted),
                fitted: r.fitted,
            }
        }
        None => {
            let mean = stats::mean(target);
            let fitted = vec![mean; n];
            LinearFit {
                intercept: mean,
                coefficients: vec![0.0; p],
                r_squared: r2_score(target, &fitted),
                fitted,
            }
        }
    };
    if fit.r_squared < 0.0 {
        warn!(r_squared = fit.r_squared, "least squares fit worse than the mean");
    }
    Ok(fit)
}

/// Variance inflation above which a predictor counts as collinear.
const MAX_VIF: f64 = 1e10;

fn fit_columns(
    features: &[Vec<f64>],
    kept: &[usize],
    target: &[f64],
) -> Option<MultipleRegressionResult> {
    let predictors: Vec<&[f64]> = kept.iter().map(|&j| features[j].as_slice()).collect();
    multiple_linear_regression(&predictors, target)
        .filter(|r| r.vif.iter().all(|&v| v < MAX_VIF))
}

/// Coefficient of determination `1 − SS_res / SS_tot`.
///
/// A constant target scores 1.0 when predicted exactly and 0.0 otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    let mean = stats::mean(actual);
    let ss_tot: f64 = actual.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum();
    if ss_res == 0.0 {
        return 1.0;
    }
    if ss_tot == 0.0 {
        return 0.0;
    }
    1.0 - ss_res / ss_tot
}

// ── Tests ─────────────────────────────────────────────────────────────
