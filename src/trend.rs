//! Linear trend fitting and naive forecasting.
//!
//! A series is regressed on its position (0, 1, 2, …). The fit gives the
//! trend statistics and a straight-line forecast with a constant-width
//! band of ±z·σ, where σ is the root mean squared residual.
//!
//! # Example
//!
//! ```
//! use insight_engine::trend::{forecast, TrendConfig};
//!
//! let sales = [10.0, 12.0, 14.0, 16.0];
//! let f = forecast(&sales, &TrendConfig::default().periods(2)).unwrap();
//! assert!((f.forecast[0] - 18.0).abs() < 1e-9);
//! assert!((f.forecast[1] - 20.0).abs() < 1e-9);
//! assert!((f.upper[0] - f.forecast[0]).abs() < 1e-9); // perfect fit, zero-width band
//! ```

use crate::error::InsightError;
use crate::stats;
use u_analytics::regression::simple_linear_regression;

// ── Configuration ─────────────────────────────────────────────────────

/// Periods forecast when a request does not say.
pub const DEFAULT_PERIODS: usize = 6;

/// Minimum points for a forecast.
pub const MIN_FORECAST_POINTS: usize = 3;

/// Largest horizon [`forecast`] accepts.
pub const MAX_FORECAST_PERIODS: usize = 10_000;

/// Configuration for [`forecast`].
#[derive(Debug, Clone)]
pub struct TrendConfig {
    /// Number of future periods. Default: 6.
    pub periods: usize,
    /// Band half-width in residual standard deviations. Default: 1.96.
    pub band_z: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            periods: DEFAULT_PERIODS,
            band_z: 1.96,
        }
    }
}

impl TrendConfig {
    pub fn periods(mut self, periods: usize) -> Self {
        self.periods = periods;
        self
    }

    pub fn band_z(mut self, z: f64) -> Self {
        self.band_z = z;
        self
    }
}

// ── Simple linear regression ──────────────────────────────────────────

/// Least-squares line `y = slope·x + intercept` with its correlation.
#[derive(Debug, Clone, Copy)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
    pub r: f64,
    pub r_squared: f64,
    /// Two-sided p-value for a zero slope; `NaN` with two points.
    pub p_value: f64,
}

impl LineFit {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fits a line through `(x, y)` pairs.
///
/// A constant `x` or `y` gives `r = 0` and `p = 1`; with constant `x` the
/// slope is 0 and the intercept the mean of `y`. Two points give an exact
/// line with an undefined p-value.
pub fn linregress(x: &[f64], y: &[f64]) -> Result<LineFit, InsightError> {
    if x.len() != y.len() {
        return Err(InsightError::DimensionMismatch {
            expected: x.len(),
            actual: y.len(),
        });
    }
    let n = x.len();
    if n < 2 {
        return Err(InsightError::insufficient_data("linear trend", 2, n));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(InsightError::DegenerateData {
            reason: "trend input must be finite".into(),
        });
    }

    let constant = |v: &[f64]| v.iter().all(|&a| a == v[0]);
    if constant(x) {
        return Ok(LineFit {
            slope: 0.0,
            intercept: stats::mean(y),
            r: 0.0,
            r_squared: 0.0,
            p_value: if n > 2 { 1.0 } else { f64::NAN },
        });
    }
    if n == 2 {
        let slope = (y[1] - y[0]) / (x[1] - x[0]);
        let r = if slope == 0.0 { 0.0 } else { slope.signum() };
        return Ok(LineFit {
            slope,
            intercept: stats::mean(y) - slope * stats::mean(x),
            r,
            r_squared: r * r,
            p_value: f64::NAN,
        });
    }

    let fit = simple_linear_regression(x, y).ok_or_else(|| InsightError::ComputationFailed {
        operation: "linear trend".into(),
        detail: "least squares line could not be fitted".into(),
    })?;
    let (r, p_value) = if constant(y) {
        (0.0, 1.0)
    } else {
        let r = stats::pearson(x, y);
        let r = if r.is_nan() { 0.0 } else { r };
        (r, fit.slope_p.clamp(0.0, 1.0))
    };

    Ok(LineFit {
        slope: fit.slope,
        intercept: fit.intercept,
        r,
        r_squared: r * r,
        p_value,
    })
}

/// Regresses `values` on their positions 0..n.
pub fn trend_line(values: &[f64]) -> Result<LineFit, InsightError> {
    let x: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    linregress(&x, values)
}

// ── Forecast ──────────────────────────────────────────────────────────

/// Straight-line forecast with a symmetric band.
#[derive(Debug, Clone)]
pub struct Forecast {
    pub historical: Vec<f64>,
    /// Point forecasts at positions n..n+periods.
    pub forecast: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
    pub fit: LineFit,
    /// Root mean squared residual of the fit.
    pub residual_std: f64,
    pub periods: usize,
}

/// Forecasts `config.periods` steps past the end of `values`.
///
/// Horizons above [`MAX_FORECAST_PERIODS`] are rejected before anything is
/// allocated.
pub fn forecast(values: &[f64], config: &TrendConfig) -> Result<Forecast, InsightError> {
    if config.periods > MAX_FORECAST_PERIODS {
        return Err(InsightError::InvalidParameter {
            name: "periods".into(),
            message: format!(
                "must be at most {MAX_FORECAST_PERIODS}, got {}",
                config.periods
            ),
        });
    }
    let n = values.len();
    if n < MIN_FORECAST_POINTS {
        return Err(InsightError::insufficient_data(
            "forecasting",
            MIN_FORECAST_POINTS,
            n,
        ));
    }

    let fit = trend_line(values)?;
    let mse = values
        .iter()
        .enumerate()
        .map(|(i, v)| (v - fit.at(i as f64)).powi(2))
        .sum::<f64>()
        / n as f64;
    let residual_std = mse.sqrt();
    let half_width = config.band_z * residual_std;

    let forecast: Vec<f64> = (n..n + config.periods).map(|i| fit.at(i as f64)).collect();
    let upper = forecast.iter().map(|f| f + half_width).collect();
    let lower = forecast.iter().map(|f| f - half_width).collect();

    Ok(Forecast {
        historical: values.to_vec(),
        forecast,
        upper,
        lower,
        fit,
        residual_std,
        periods: config.periods,
    })
}

// ── Series statistics ─────────────────────────────────────────────────

/// Points inspected for the seasonality proxy.
const SEASON_LENGTH: usize = 12;

/// Spread of the first 12 values relative to the series mean.
///
/// 0 for series shorter than 12 or with a zero mean.
pub fn seasonality_strength(values: &[f64]) -> f64 {
    if values.len() < SEASON_LENGTH {
        return 0.0;
    }
    let mean = stats::mean(values);
    if mean == 0.0 {
        return 0.0;
    }
    stats::population_std(&values[..SEASON_LENGTH]) / mean
}

/// Trend and spread summary of one series.
#[derive(Debug, Clone, Copy)]
pub struct SeriesTrend {
    pub n: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub fit: LineFit,
    pub seasonality_strength: f64,
}

impl SeriesTrend {
    /// Next value on the trend line, when the correlation is above 0.3.
    pub fn next_period(&self) -> Option<f64> {
        (self.fit.r.abs() > 0.3).then(|| self.fit.at(self.n as f64))
    }
}

/// Summarizes a series: moments, trend line and seasonality proxy.
///
/// ```
/// use insight_engine::trend::series_trend;
///
/// let s = series_trend(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
/// assert!((s.fit.slope - 1.0).abs() < 1e-12);
/// assert!((s.next_period().unwrap() - 6.0).abs() < 1e-9);
/// ```
pub fn series_trend(values: &[f64]) -> Result<SeriesTrend, InsightError> {
    let fit = trend_line(values)?;
    Ok(SeriesTrend {
        n: values.len(),
        mean: stats::mean(values),
        std_dev: stats::std_dev(values),
        min: stats::min(values),
        max: stats::max(values),
        fit,
        seasonality_strength: seasonality_strength(values),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────
