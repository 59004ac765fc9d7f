//! Descriptive statistics over plain `f64` slices.
//!
//! Thin wrappers over [`u_numflow::stats`] that fix the conventions used
//! throughout the crate: `std_dev`/`variance` are sample statistics (n − 1),
//! `population_std` divides by n, skewness and kurtosis are the biased
//! moment estimators (kurtosis reported as excess). Empty input or an
//! undefined statistic yields `NaN`, which serializes as `null`.

use u_numflow::stats as nf;

pub fn mean(values: &[f64]) -> f64 {
    nf::mean(values).unwrap_or(f64::NAN)
}

/// Sample variance (n − 1 denominator). `NaN` for fewer than two values.
pub fn variance(values: &[f64]) -> f64 {
    nf::variance(values).unwrap_or(f64::NAN)
}

/// Sample standard deviation (n − 1 denominator).
pub fn std_dev(values: &[f64]) -> f64 {
    nf::std_dev(values).unwrap_or(f64::NAN)
}

/// Population standard deviation (n denominator).
pub fn population_std(values: &[f64]) -> f64 {
    nf::population_std_dev(values).unwrap_or(f64::NAN)
}

pub fn min(values: &[f64]) -> f64 {
    nf::min(values).unwrap_or(f64::NAN)
}

pub fn max(values: &[f64]) -> f64 {
    nf::max(values).unwrap_or(f64::NAN)
}

/// Median; the mean of the two middle values for even lengths.
pub fn median(values: &[f64]) -> f64 {
    nf::median(values).unwrap_or(f64::NAN)
}

/// Biased Fisher-Pearson skewness `m3 / m2^1.5`.
///
/// `NaN` for constant input or fewer than three values.
pub fn skewness(values: &[f64]) -> f64 {
    nf::skewness_moment(values).unwrap_or(f64::NAN)
}

/// Biased excess kurtosis `m4 / m2² − 3`.
///
/// `NaN` for constant input or fewer than four values.
pub fn kurtosis(values: &[f64]) -> f64 {
    nf::kurtosis_moment(values).unwrap_or(f64::NAN)
}

/// Pearson correlation of two samples, truncated to the shorter length.
///
/// `NaN` when either side is constant or fewer than three points are given.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    u_analytics::correlation::pearson(&x[..n], &y[..n])
        .map(|c| c.r)
        .unwrap_or(f64::NAN)
}

/// Pairs of values where both sides are present.
pub fn pairwise_complete(x: &[Option<f64>], y: &[Option<f64>]) -> (Vec<f64>, Vec<f64>) {
    x.iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .unzip()
}

/// Mean, median, sample std, min, max and count of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl Describe {
    pub fn of(values: &[f64]) -> Self {
        Self {
            count: values.len(),
            mean: mean(values),
            median: median(values),
            std: std_dev(values),
            min: min(values),
            max: max(values),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn basic_moments() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_abs_diff_eq!(mean(&v), 5.0);
        assert_abs_diff_eq!(population_std(&v), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(variance(&v), 32.0 / 7.0, epsilon = 1e-12);
        assert_abs_diff_eq!(median(&v), 4.5);
        assert_eq!(min(&v), 2.0);
        assert_eq!(max(&v), 9.0);
    }

    #[test]
    fn empty_and_single() {
        assert!(mean(&[]).is_nan());
        assert!(median(&[]).is_nan());
        assert!(std_dev(&[3.0]).is_nan());
        assert_eq!(median(&[3.0]), 3.0);
    }

    #[test]
    fn skew_and_kurtosis_biased() {
        // Symmetric sample has zero skew.
        assert_abs_diff_eq!(skewness(&[1.0, 2.0, 3.0, 4.0, 5.0]), 0.0, epsilon = 1e-12);
        // Excess kurtosis of 1..5 under the biased estimator is -1.3.
        assert_abs_diff_eq!(kurtosis(&[1.0, 2.0, 3.0, 4.0, 5.0]), -1.3, epsilon = 1e-12);
        let right = [1.0, 1.0, 1.0, 2.0, 10.0];
        assert!(skewness(&right) > 0.0);
    }

    #[test]
    fn constant_input_is_undefined() {
        assert!(skewness(&[3.0, 3.0, 3.0]).is_nan());
        assert!(kurtosis(&[3.0, 3.0, 3.0]).is_nan());
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_nan());
    }

    #[test]
    fn short_samples_are_undefined() {
        assert!(skewness(&[1.0, 2.0]).is_nan());
        assert!(kurtosis(&[1.0, 2.0, 4.0]).is_nan());
        assert!(pearson(&[1.0, 2.0], &[2.0, 1.0]).is_nan());
        assert!(min(&[]).is_nan());
    }

    #[test]
    fn pearson_perfect() {
        assert_abs_diff_eq!(pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pearson(&[1.0, 2.0, 3.0], &[6.0, 4.0, 2.0]), -1.0, epsilon = 1e-12);
        // extra trailing values on one side are ignored
        assert_abs_diff_eq!(pearson(&[1.0, 2.0, 3.0, 9.0], &[2.0, 4.0, 6.0]), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn pairwise_complete_drops_gaps() {
        let (a, b) = pairwise_complete(
            &[Some(1.0), None, Some(3.0), Some(4.0)],
            &[Some(2.0), Some(5.0), None, Some(8.0)],
        );
        assert_eq!(a, vec![1.0, 4.0]);
        assert_eq!(b, vec![2.0, 8.0]);
    }
}
