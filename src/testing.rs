//! Hypothesis tests.
//!
//! Independent two-sample t-test (pooled variance), one-way ANOVA and the
//! significance of a Pearson correlation. All tests are two-sided where a
//! direction exists. ANOVA and correlation come from `u-analytics`; the
//! pooled t-test uses the [`statrs`] Student-t distribution.
//!
//! # Example
//!
//! ```
//! use insight_engine::testing::t_test;
//!
//! let a = [5.1, 4.9, 5.3, 5.0, 5.2];
//! let b = [6.0, 6.2, 5.9, 6.1, 6.3];
//! let r = t_test(&a, &b).unwrap();
//! assert!(r.p_value < 0.001);
//! assert!(r.statistic < 0.0);
//! ```

use crate::error::InsightError;
use crate::stats;
use statrs::distribution::{ContinuousCDF, StudentsT};
use u_analytics::correlation::pearson;

// ── Result types ──────────────────────────────────────────────────────

/// Result of an independent two-sample t-test.
#[derive(Debug, Clone, Copy)]
pub struct TTest {
    pub statistic: f64,
    pub p_value: f64,
    /// Degrees of freedom, `n1 + n2 - 2`.
    pub df: f64,
    pub mean1: f64,
    pub mean2: f64,
}

/// Result of a one-way ANOVA.
#[derive(Debug, Clone)]
pub struct Anova {
    /// F statistic.
    pub statistic: f64,
    pub p_value: f64,
    pub df_between: f64,
    pub df_within: f64,
    pub group_means: Vec<f64>,
}

/// Pearson correlation with its two-sided p-value.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationTest {
    pub r: f64,
    pub p_value: f64,
    pub n: usize,
}

// ── t-test ────────────────────────────────────────────────────────────

/// Student's t-test for two independent samples with equal variances.
///
/// Each group needs at least two values. Identical constant groups yield a
/// `NaN` statistic; distinct constant groups an infinite one with `p = 0`.
pub fn t_test(a: &[f64], b: &[f64]) -> Result<TTest, InsightError> {
    let (n1, n2) = (a.len(), b.len());
    if n1 < 2 || n2 < 2 {
        return Err(InsightError::insufficient_data("t-test", 2, n1.min(n2)));
    }

    let mean1 = stats::mean(a);
    let mean2 = stats::mean(b);
    let df = (n1 + n2 - 2) as f64;
    let pooled =
        ((n1 - 1) as f64 * stats::variance(a) + (n2 - 1) as f64 * stats::variance(b)) / df;
    let se = (pooled * (1.0 / n1 as f64 + 1.0 / n2 as f64)).sqrt();
    let diff = mean1 - mean2;

    let statistic = if se > 0.0 {
        diff / se
    } else if diff == 0.0 {
        f64::NAN
    } else {
        diff.signum() * f64::INFINITY
    };

    Ok(TTest {
        statistic,
        p_value: t_two_sided_p(statistic, df)?,
        df,
        mean1,
        mean2,
    })
}

/// Two-sided tail probability of Student's t with `df` degrees of freedom.
/// `NaN` in, `NaN` out; an infinite statistic gives 0.
fn t_two_sided_p(t: f64, df: f64) -> Result<f64, InsightError> {
    if t.is_nan() {
        return Ok(f64::NAN);
    }
    if t.is_infinite() {
        return Ok(0.0);
    }
    let dist = StudentsT::new(0.0, 1.0, df).map_err(|e| InsightError::ComputationFailed {
        operation: "Student's t distribution".into(),
        detail: e.to_string(),
    })?;
    Ok((2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0))
}

// ── ANOVA ─────────────────────────────────────────────────────────────

/// One-way analysis of variance across `groups`.
///
/// Needs at least two groups of at least two finite values each. Zero
/// within-group variance with distinct means gives `F = ∞`, `p = 0`; when
/// every value is equal both are `NaN`.
///
/// ```
/// use insight_engine::testing::one_way_anova;
///
/// let groups = vec![vec![1.0, 2.0, 3.0], vec![2.0, 3.0, 4.0], vec![8.0, 9.0, 10.0]];
/// let r = one_way_anova(&groups).unwrap();
/// assert!(r.p_value < 0.001);
/// assert_eq!(r.df_between, 2.0);
/// ```
pub fn one_way_anova(groups: &[Vec<f64>]) -> Result<Anova, InsightError> {
    let k = groups.len();
    if k < 2 {
        return Err(InsightError::InvalidParameter {
            name: "variables".into(),
            message: format!("ANOVA needs at least 2 groups, got {k}"),
        });
    }
    if let Some(empty) = groups.iter().position(|g| g.is_empty()) {
        return Err(InsightError::InvalidParameter {
            name: "variables".into(),
            message: format!("group {} has no values", empty + 1),
        });
    }
    let smallest = groups.iter().map(Vec::len).min().unwrap_or(0);
    if smallest < 2 {
        return Err(InsightError::insufficient_data("ANOVA group", 2, smallest));
    }
    if groups.iter().flatten().any(|v| !v.is_finite()) {
        return Err(InsightError::DegenerateData {
            reason: "ANOVA input must be finite".into(),
        });
    }

    let slices: Vec<&[f64]> = groups.iter().map(Vec::as_slice).collect();
    let r = u_analytics::testing::one_way_anova(&slices).ok_or_else(|| {
        InsightError::ComputationFailed {
            operation: "ANOVA".into(),
            detail: "no within-group degrees of freedom".into(),
        }
    })?;

    let (statistic, p_value) = if r.f_statistic.is_infinite() && r.ss_between <= 0.0 {
        (f64::NAN, f64::NAN)
    } else {
        (r.f_statistic, r.p_value.clamp(0.0, 1.0))
    };

    Ok(Anova {
        statistic,
        p_value,
        df_between: r.df_between as f64,
        df_within: r.df_within as f64,
        group_means: r.group_means,
    })
}

// ── Correlation significance ──────────────────────────────────────────

/// Pearson `r` and its two-sided p-value from `t = r·√((n−2)/(1−r²))`.
///
/// Needs at least 3 paired values. Perfect correlation gives `p = 0`;
/// a constant side gives `NaN` for both.
pub fn correlation_test(x: &[f64], y: &[f64]) -> Result<CorrelationTest, InsightError> {
    if x.len() != y.len() {
        return Err(InsightError::DimensionMismatch {
            expected: x.len(),
            actual: y.len(),
        });
    }
    let n = x.len();
    if n < 3 {
        return Err(InsightError::insufficient_data("correlation test", 3, n));
    }

    let (r, p_value) = match pearson(x, y) {
        Some(c) => (c.r, c.p_value.clamp(0.0, 1.0)),
        None => (f64::NAN, f64::NAN),
    };
    Ok(CorrelationTest { r, p_value, n })
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    // ── t-test ───────────────────────────────────────────────────

    #[test]
    fn t_test_known_value() {
        // Means 2 and 3, both variances 1, n = 3 each:
        // t = -1 / sqrt(1 · 2/3) = -1.2247, df = 4, p = 0.2879
        let r = t_test(&[1.0, 2.0, 3.0], &[2.0, 3.0, 4.0]).unwrap();
        assert_abs_diff_eq!(r.statistic, -1.224744871, epsilon = 1e-8);
        assert_eq!(r.df, 4.0);
        assert_abs_diff_eq!(r.p_value, 0.2878641, epsilon = 1e-5);
    }

    #[test]
    fn t_test_identical_samples() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let r = t_test(&a, &a).unwrap();
        assert_abs_diff_eq!(r.statistic, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r.p_value, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn t_test_constant_groups() {
        let r = t_test(&[1.0, 1.0], &[2.0, 2.0]).unwrap();
        assert_eq!(r.statistic, f64::NEG_INFINITY);
        assert_eq!(r.p_value, 0.0);
        let same = t_test(&[1.0, 1.0], &[1.0, 1.0]).unwrap();
        assert!(same.p_value.is_nan());
    }

    #[test]
    fn t_test_needs_two_per_group() {
        assert!(matches!(
            t_test(&[1.0], &[1.0, 2.0]),
            Err(InsightError::InsufficientData { .. })
        ));
    }

    // ── ANOVA ────────────────────────────────────────────────────

    #[test]
    fn anova_known_value() {
        // Means 2, 3, 4 around 3: SSB = 6, SSW = 6
        // F = (6/2) / (6/6) = 3, df = (2, 6), p = 0.125
        let groups = vec![
            vec![1.0, 2.0, 3.0],
            vec![2.0, 3.0, 4.0],
            vec![3.0, 4.0, 5.0],
        ];
        let r = one_way_anova(&groups).unwrap();
        assert_abs_diff_eq!(r.statistic, 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r.p_value, 0.125, epsilon = 1e-6);
        assert_eq!(r.group_means, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn anova_zero_within_variance() {
        let r = one_way_anova(&[vec![1.0, 1.0], vec![2.0, 2.0]]).unwrap();
        assert_eq!(r.statistic, f64::INFINITY);
        assert_eq!(r.p_value, 0.0);
    }

    #[test]
    fn anova_all_equal_is_undefined() {
        let r = one_way_anova(&[vec![3.0, 3.0], vec![3.0, 3.0, 3.0]]).unwrap();
        assert!(r.statistic.is_nan());
        assert!(r.p_value.is_nan());
        assert_eq!(r.df_within, 3.0);
    }

    #[test]
    fn anova_preconditions() {
        assert!(one_way_anova(&[vec![1.0, 2.0]]).is_err());
        assert!(one_way_anova(&[vec![1.0, 2.0], vec![]]).is_err());
        assert!(matches!(
            one_way_anova(&[vec![1.0], vec![2.0]]),
            Err(InsightError::InsufficientData { .. })
        ));
        assert!(matches!(
            one_way_anova(&[vec![1.0, 2.0, 3.0], vec![4.0]]),
            Err(InsightError::InsufficientData { min_required: 2, actual: 1, .. })
        ));
    }

    // ── Correlation significance ─────────────────────────────────

    #[test]
    fn perfect_correlation_has_zero_p() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        let r = correlation_test(&x, &y).unwrap();
        assert_abs_diff_eq!(r.r, 1.0, epsilon = 1e-12);
        assert_eq!(r.p_value, 0.0);
    }

    #[test]
    fn weak_correlation_not_significant() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 1.0, 4.0, 3.0, 2.5];
        let r = correlation_test(&x, &y).unwrap();
        assert!(r.p_value > 0.05, "p = {}", r.p_value);
        assert_eq!(r.n, 5);
    }

    #[test]
    fn moderate_correlation_p_value() {
        // r = 0.8 with n = 5: t = 0.8·√3/0.6 = 2.3094, df = 3, p = 0.1041
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.0, 3.0, 2.0, 5.0, 4.0];
        let r = correlation_test(&x, &y).unwrap();
        assert_abs_diff_eq!(r.r, 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(r.p_value, 0.1041, epsilon = 1e-3);
    }

    #[test]
    fn constant_side_is_undefined() {
        let r = correlation_test(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]).unwrap();
        assert!(r.r.is_nan());
        assert!(r.p_value.is_nan());
    }
}
