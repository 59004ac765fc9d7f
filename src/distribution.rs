//! Normality testing.
//!
//! Two tests share one result type, both computed by `u-analytics`:
//!
//! - **Shapiro-Wilk** (Royston's AS R94 approximation), used up to
//!   [`SHAPIRO_MAX_N`] observations
//! - **Jarque-Bera**, based on sample skewness and excess kurtosis, used for
//!   larger samples
//!
//! [`normality_test`] picks between them by sample size.
//!
//! # Example
//!
//! ```
//! use insight_engine::distribution::{normality_test, NormalityMethod};
//!
//! let data = [-1.5, -1.0, -0.5, 0.0, 0.0, 0.5, 1.0, 1.5];
//! let result = normality_test(&data).unwrap();
//! assert_eq!(result.method, NormalityMethod::ShapiroWilk);
//! assert!(result.is_normal());
//! ```

use crate::error::InsightError;
use crate::insight::ALPHA;
use serde::Serialize;
use u_analytics::testing::{jarque_bera_test, shapiro_wilk_test};

/// Largest sample handed to Shapiro-Wilk; bigger samples use Jarque-Bera.
pub const SHAPIRO_MAX_N: usize = 5000;

/// Smallest sample Jarque-Bera accepts.
pub const JARQUE_BERA_MIN_N: usize = 8;

// ── Result types ──────────────────────────────────────────────────────

/// Which test produced a [`NormalityTest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NormalityMethod {
    #[serde(rename = "shapiro")]
    ShapiroWilk,
    #[serde(rename = "jarque_bera")]
    JarqueBera,
}

/// Result of a single normality test.
#[derive(Debug, Clone, Copy)]
pub struct NormalityTest {
    /// W for Shapiro-Wilk, JB for Jarque-Bera.
    pub statistic: f64,
    pub p_value: f64,
    pub method: NormalityMethod,
}

impl NormalityTest {
    /// Normality is not rejected at [`ALPHA`]. `false` when the p-value is
    /// undefined.
    pub fn is_normal(&self) -> bool {
        self.p_value > ALPHA
    }
}

// ── Selection ─────────────────────────────────────────────────────────

/// Runs Shapiro-Wilk for up to [`SHAPIRO_MAX_N`] values, Jarque-Bera above.
pub fn normality_test(data: &[f64]) -> Result<NormalityTest, InsightError> {
    if data.len() <= SHAPIRO_MAX_N {
        shapiro_wilk(data)
    } else {
        jarque_bera(data)
    }
}

fn require_finite(data: &[f64], test: &str) -> Result<(), InsightError> {
    if data.iter().any(|v| !v.is_finite()) {
        return Err(InsightError::DegenerateData {
            reason: format!("{test} input must be finite"),
        });
    }
    Ok(())
}

fn is_constant(data: &[f64]) -> bool {
    data.windows(2).all(|w| w[0] == w[1])
}

// ── Shapiro-Wilk ──────────────────────────────────────────────────────

/// Shapiro-Wilk test for normality.
///
/// Accepts 3 to [`SHAPIRO_MAX_N`] finite values. A constant sample gives
/// `W = 1` and `p = 1`.
///
/// ```
/// use insight_engine::distribution::shapiro_wilk;
///
/// let data = [-1.5, -1.0, -0.5, 0.0, 0.5, 1.0, 1.5];
/// let result = shapiro_wilk(&data).unwrap();
/// assert!(result.statistic > 0.9);
/// assert!(result.p_value > 0.05);
/// ```
pub fn shapiro_wilk(data: &[f64]) -> Result<NormalityTest, InsightError> {
    let n = data.len();
    if n < 3 {
        return Err(InsightError::insufficient_data("Shapiro-Wilk test", 3, n));
    }
    if n > SHAPIRO_MAX_N {
        return Err(InsightError::InvalidParameter {
            name: "data".into(),
            message: format!("Shapiro-Wilk accepts at most {SHAPIRO_MAX_N} values, got {n}"),
        });
    }
    require_finite(data, "Shapiro-Wilk")?;
    if is_constant(data) {
        return Ok(NormalityTest {
            statistic: 1.0,
            p_value: 1.0,
            method: NormalityMethod::ShapiroWilk,
        });
    }

    let result = shapiro_wilk_test(data).ok_or_else(|| InsightError::ComputationFailed {
        operation: "Shapiro-Wilk test".into(),
        detail: "coefficients could not be computed".into(),
    })?;
    Ok(NormalityTest {
        statistic: result.w,
        p_value: result.p_value,
        method: NormalityMethod::ShapiroWilk,
    })
}

// ── Jarque-Bera ───────────────────────────────────────────────────────

/// Jarque-Bera test: `JB = n/6 · (S² + K²/4)` against χ²(2).
///
/// Constant samples have undefined skewness, so both the statistic and the
/// p-value are `NaN`.
pub fn jarque_bera(data: &[f64]) -> Result<NormalityTest, InsightError> {
    let n = data.len();
    if n < JARQUE_BERA_MIN_N {
        return Err(InsightError::insufficient_data(
            "Jarque-Bera test",
            JARQUE_BERA_MIN_N,
            n,
        ));
    }
    require_finite(data, "Jarque-Bera")?;

    let (statistic, p_value) = match jarque_bera_test(data) {
        Some(r) => (r.statistic, r.p_value),
        None => (f64::NAN, f64::NAN),
    };
    Ok(NormalityTest {
        statistic,
        p_value,
        method: NormalityMethod::JarqueBera,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────
