//! Feature importance for regression targets.
//!
//! Two views of which inputs drive a target:
//!
//! - **Model comparison**: fits a random forest and a linear model on the
//!   same matrix, ranks features by forest MDI importance and reports which
//!   model explains more variance
//! - **Driver analysis**: a single linear fit where each feature's share of
//!   the total absolute coefficient is its importance
//!
//! Both expect complete, finite columns.
//!
//! # Example
//!
//! ```
//! use insight_engine::feature_importance::driver_analysis;
//!
//! let price = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
//! let promo = vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
//! let sales: Vec<f64> = price.iter().zip(&promo).map(|(p, q)| 10.0 + 4.0 * p + q).collect();
//!
//! let names = vec!["price".to_string(), "promo".to_string()];
//! let result = driver_analysis(&[price, promo], &names, &sales, "sales").unwrap();
//! assert_eq!(result.top_driver, "price");
//! assert!((result.r_squared - 1.0).abs() < 1e-9);
//! ```

use crate::analysis::{linear_regression, r2_score};
use crate::error::InsightError;
use crate::forest::{ForestConfig, RandomForest};
use crate::stats;
use tracing::debug;

// ── Result types ──────────────────────────────────────────────────────

/// A feature and its importance score.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedFeature {
    pub name: String,
    pub importance: f64,
}

/// Which model explained more variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferredModel {
    RandomForest,
    LinearRegression,
}

impl PreferredModel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::RandomForest => "Random Forest",
            Self::LinearRegression => "Linear Regression",
        }
    }
}

/// Result of fitting both models on one target.
#[derive(Debug, Clone)]
pub struct ModelComparison {
    pub target: String,
    pub features: Vec<String>,
    /// Training R² of the forest, clamped to [0, 1].
    pub forest_r_squared: f64,
    /// Training R² of the linear model, clamped to [0, 1].
    pub linear_r_squared: f64,
    /// Forest importances, sorted descending (ties keep input order).
    pub ranked: Vec<RankedFeature>,
    pub linear_intercept: f64,
    /// Linear coefficients in input order.
    pub linear_coefficients: Vec<f64>,
    pub preferred: PreferredModel,
}

impl ModelComparison {
    /// R² of the preferred model.
    pub fn best_r_squared(&self) -> f64 {
        self.forest_r_squared.max(self.linear_r_squared)
    }

    /// The `n` most important features.
    pub fn top_drivers(&self, n: usize) -> &[RankedFeature] {
        &self.ranked[..n.min(self.ranked.len())]
    }
}

/// One feature's contribution in a linear driver analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverFeature {
    pub name: String,
    pub coefficient: f64,
    /// `|coefficient| / Σ|coefficients|`, 0 when every coefficient is 0.
    pub importance: f64,
    /// Pearson correlation between the feature and the target.
    pub correlation: f64,
}

/// Result of a linear driver analysis.
#[derive(Debug, Clone)]
pub struct DriverAnalysis {
    pub target: String,
    pub r_squared: f64,
    pub intercept: f64,
    /// Features in input order.
    pub drivers: Vec<DriverFeature>,
    /// First feature with the highest importance.
    pub top_driver: String,
}

impl DriverAnalysis {
    pub fn top_driver_importance(&self) -> f64 {
        self.drivers
            .iter()
            .find(|d| d.name == self.top_driver)
            .map_or(0.0, |d| d.importance)
    }
}

// ── Model comparison ──────────────────────────────────────────────────

/// Fits a random forest and ordinary least squares on the same data.
///
/// `features` is column-major and must already be complete (impute first).
/// The forest is preferred only when its R² is strictly higher.
pub fn compare_models(
    features: &[Vec<f64>],
    names: &[String],
    target: &[f64],
    target_name: &str,
    forest_config: &ForestConfig,
) -> Result<ModelComparison, InsightError> {
    if features.is_empty() {
        return Err(InsightError::NoFeatures);
    }
    if names.len() != features.len() {
        return Err(InsightError::DimensionMismatch {
            expected: features.len(),
            actual: names.len(),
        });
    }

    let forest = RandomForest::fit(features, target, forest_config)?;
    let forest_r2 = r2_score(target, &forest.predict(features)).clamp(0.0, 1.0);
    let linear = linear_regression(features, target)?;
    let linear_r2 = linear.r_squared.clamp(0.0, 1.0);

    let mut ranked: Vec<RankedFeature> = names
        .iter()
        .zip(forest.feature_importances())
        .map(|(name, &importance)| RankedFeature {
            name: name.clone(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.importance
            .partial_cmp(&a.importance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let preferred = if forest_r2 > linear_r2 {
        PreferredModel::RandomForest
    } else {
        PreferredModel::LinearRegression
    };
    debug!(
        target = target_name,
        forest_r2, linear_r2, preferred = preferred.label(), "models compared"
    );

    Ok(ModelComparison {
        target: target_name.to_string(),
        features: names.to_vec(),
        forest_r_squared: forest_r2,
        linear_r_squared: linear_r2,
        ranked,
        linear_intercept: linear.intercept,
        linear_coefficients: linear.coefficients,
        preferred,
    })
}

// ── Driver analysis ───────────────────────────────────────────────────

/// Minimum complete rows for a driver analysis.
pub const MIN_DRIVER_ROWS: usize = 3;

/// Linear driver analysis: which feature moves the target most.
pub fn driver_analysis(
    features: &[Vec<f64>],
    names: &[String],
    target: &[f64],
    target_name: &str,
) -> Result<DriverAnalysis, InsightError> {
    if features.is_empty() {
        return Err(InsightError::NoFeatures);
    }
    if target.len() < MIN_DRIVER_ROWS {
        return Err(InsightError::insufficient_data(
            "regression analysis",
            MIN_DRIVER_ROWS,
            target.len(),
        ));
    }
    if names.len() != features.len() {
        return Err(InsightError::DimensionMismatch {
            expected: features.len(),
            actual: names.len(),
        });
    }

    let fit = linear_regression(features, target)?;
    let abs_sum: f64 = fit.coefficients.iter().map(|c| c.abs()).sum();

    let drivers: Vec<DriverFeature> = names
        .iter()
        .zip(features)
        .zip(&fit.coefficients)
        .map(|((name, col), &coefficient)| DriverFeature {
            name: name.clone(),
            coefficient,
            importance: if abs_sum > 0.0 {
                coefficient.abs() / abs_sum
            } else {
                0.0
            },
            correlation: stats::pearson(col, target),
        })
        .collect();

    let mut top = &drivers[0];
    for d in &drivers[1..] {
        if d.importance > top.importance {
            top = d;
        }
    }
    let top_driver = top.name.clone();

    Ok(DriverAnalysis {
        target: target_name.to_string(),
        r_squared: fit.r_squared,
        intercept: fit.intercept,
        drivers,
        top_driver,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    // ── Model comparison ─────────────────────────────────────────

    #[test]
    fn noiseless_single_feature_both_models_fit() {
        let x: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v).collect();
        let cmp = compare_models(&[x], &names(&["x"]), &y, "y", &ForestConfig::default()).unwrap();
        assert_abs_diff_eq!(cmp.linear_r_squared, 1.0, epsilon = 1e-9);
        assert!(cmp.forest_r_squared > 0.95);
        assert!(cmp.forest_r_squared <= 1.0);
        assert_eq!(cmp.preferred, PreferredModel::LinearRegression);
        assert_abs_diff_eq!(cmp.linear_coefficients[0], 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(cmp.ranked[0].importance, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn ranked_descending_and_top_drivers_capped() {
        let a: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..30).map(|i| ((i * 7) % 4) as f64).collect();
        let y: Vec<f64> = a.iter().zip(&b).map(|(x, z)| x + 0.1 * z).collect();
        let cmp = compare_models(
            &[b, a],
            &names(&["noise", "signal"]),
            &y,
            "y",
            &ForestConfig::default().n_estimators(20),
        )
        .unwrap();
        assert_eq!(cmp.ranked[0].name, "signal");
        assert_eq!(cmp.top_drivers(5).len(), 2);
        assert_eq!(cmp.top_drivers(1).len(), 1);
    }

    #[test]
    fn comparison_requires_features() {
        assert_eq!(
            compare_models(&[], &[], &[1.0], "y", &ForestConfig::default()).unwrap_err(),
            InsightError::NoFeatures
        );
    }

    // ── Driver analysis ──────────────────────────────────────────

    #[test]
    fn driver_importances_normalized() {
        let x1 = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let x2 = vec![5.0, 3.0, 4.0, 1.0, 2.0];
        let y: Vec<f64> = x1.iter().zip(&x2).map(|(a, b)| 3.0 * a - b).collect();
        let r = driver_analysis(&[x1, x2], &names(&["a", "b"]), &y, "t").unwrap();
        let total: f64 = r.drivers.iter().map(|d| d.importance).sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r.drivers[0].importance, 0.75, epsilon = 1e-9);
        assert_eq!(r.top_driver, "a");
        assert_abs_diff_eq!(r.top_driver_importance(), 0.75, epsilon = 1e-9);
    }

    #[test]
    fn driver_needs_three_rows() {
        let err = driver_analysis(&[vec![1.0, 2.0]], &names(&["a"]), &[1.0, 2.0], "t").unwrap_err();
        assert!(matches!(err, InsightError::InsufficientData { min_required: 3, .. }));
    }

    #[test]
    fn driver_zero_coefficients() {
        let r = driver_analysis(
            &[vec![1.0, 2.0, 3.0]],
            &names(&["a"]),
            &[4.0, 4.0, 4.0],
            "t",
        )
        .unwrap();
        assert_eq!(r.drivers[0].importance, 0.0);
        assert_eq!(r.top_driver, "a");
    }
}
