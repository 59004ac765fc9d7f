//! Qualitative labels and interpretation text.
//!
//! Every threshold that turns a number into a word lives here, so the
//! analyses stay purely numeric and the wording can be checked in one place.

use serde::Serialize;
use std::fmt;

/// Significance level used by every hypothesis test.
pub const ALPHA: f64 = 0.05;

// ── Correlation strength ──────────────────────────────────────────────

/// Magnitude bucket for a correlation in the summary report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CorrelationStrength {
    Strong,
    Moderate,
    Weak,
    #[serde(rename = "Very Weak")]
    VeryWeak,
}

impl CorrelationStrength {
    /// Buckets `|r|`: ≥0.7 strong, ≥0.3 moderate, ≥0.1 weak.
    ///
    /// ```
    /// use insight_engine::insight::CorrelationStrength;
    ///
    /// assert_eq!(CorrelationStrength::from_r(-0.75), CorrelationStrength::Strong);
    /// assert_eq!(CorrelationStrength::from_r(0.05), CorrelationStrength::VeryWeak);
    /// ```
    pub fn from_r(r: f64) -> Self {
        let a = r.abs();
        if a >= 0.7 {
            Self::Strong
        } else if a >= 0.3 {
            Self::Moderate
        } else if a >= 0.1 {
            Self::Weak
        } else {
            Self::VeryWeak
        }
    }
}

impl fmt::Display for CorrelationStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strong => write!(f, "Strong"),
            Self::Moderate => write!(f, "Moderate"),
            Self::Weak => write!(f, "Weak"),
            Self::VeryWeak => write!(f, "Very Weak"),
        }
    }
}

// ── Lowercase buckets ─────────────────────────────────────────────────

/// Three-level bucket used by the significance sweep and trend labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Strong,
    Moderate,
    Weak,
}

impl Strength {
    /// Strict thresholds on `|r|`: >0.7 strong, >0.4 moderate.
    pub fn from_r(r: f64) -> Self {
        let a = r.abs();
        if a > 0.7 {
            Self::Strong
        } else if a > 0.4 {
            Self::Moderate
        } else {
            Self::Weak
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    pub fn from_slope(slope: f64) -> Self {
        if slope > 0.0 {
            Self::Increasing
        } else if slope < 0.0 {
            Self::Decreasing
        } else {
            Self::Stable
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Volatility {
    High,
    Moderate,
    Low,
}

impl Volatility {
    /// Compares the standard deviation against 30% and 10% of the mean.
    pub fn classify(std_dev: f64, mean: f64) -> Self {
        if std_dev > mean * 0.3 {
            Self::High
        } else if std_dev > mean * 0.1 {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Seasonality {
    Strong,
    Weak,
}

impl Seasonality {
    pub fn classify(strength: f64) -> Self {
        if strength > 0.2 {
            Self::Strong
        } else {
            Self::Weak
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelQuality {
    Excellent,
    Good,
    Moderate,
    Poor,
}

impl ModelQuality {
    pub fn from_r_squared(r2: f64) -> Self {
        if r2 > 0.8 {
            Self::Excellent
        } else if r2 > 0.6 {
            Self::Good
        } else if r2 > 0.4 {
            Self::Moderate
        } else {
            Self::Poor
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Predictability {
    High,
    Moderate,
    Low,
}

impl Predictability {
    pub fn from_r_squared(r2: f64) -> Self {
        if r2 > 0.7 {
            Self::High
        } else if r2 > 0.4 {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    High,
    Moderate,
}

impl Complexity {
    /// High when the first principal component explains under 60%.
    pub fn from_first_ratio(ratio: f64) -> Self {
        if ratio < 0.6 {
            Self::High
        } else {
            Self::Moderate
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    Good,
    RequiresAttention,
}

impl DataQuality {
    /// Good when more than half of the analysed columns look normal.
    pub fn from_normal_share(normal: usize, total: usize) -> Self {
        if normal as f64 > total as f64 / 2.0 {
            Self::Good
        } else {
            Self::RequiresAttention
        }
    }
}

// ── Interpretation text ───────────────────────────────────────────────

pub fn ttest_interpretation(p_value: f64, mean1: f64, mean2: f64) -> String {
    if p_value < ALPHA {
        let direction = if mean1 > mean2 { "higher" } else { "lower" };
        format!(
            "Statistically significant difference found (p={p_value:.3}). First group is {direction}."
        )
    } else {
        format!("No statistically significant difference found (p={p_value:.3}).")
    }
}

pub fn anova_interpretation(p_value: f64) -> String {
    if p_value < ALPHA {
        format!("Statistically significant differences found between groups (p={p_value:.3}).")
    } else {
        format!("No statistically significant differences found between groups (p={p_value:.3}).")
    }
}

/// Formats a ratio as a percentage with one decimal, e.g. `0.8712` → `87.1%`.
pub fn percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

// ── Recommendations ───────────────────────────────────────────────────

pub fn trend_recommendations() -> Vec<String> {
    to_owned(&[
        "Use trend analysis for strategic planning",
        "Monitor seasonal patterns for inventory management",
        "Consider external factors affecting volatility",
    ])
}

pub fn driver_recommendations(top_driver: &str, target: &str) -> Vec<String> {
    vec![
        format!("Focus on {top_driver} as it has the highest impact on {target}"),
        "Use this model for forecasting and scenario planning".to_string(),
        "Monitor key drivers regularly for business optimization".to_string(),
    ]
}

pub fn clustering_recommendations(groups: usize) -> Vec<String> {
    vec![
        format!("Your data naturally forms {groups} distinct groups"),
        "Use clustering for customer segmentation or product categorization".to_string(),
        "Focus on the main components that explain most variation".to_string(),
    ]
}

pub fn testing_recommendations() -> Vec<String> {
    to_owned(&[
        "Use parametric tests for normally distributed variables",
        "Focus on statistically significant relationships",
        "Consider data transformation for non-normal variables",
    ])
}

pub fn exploratory_recommendations() -> Vec<String> {
    to_owned(&[
        "Data is ready for detailed analysis",
        "Focus on high-variance columns for insights",
        "Consider specific analysis types based on business goals",
    ])
}

fn to_owned(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|s| s.to_string()).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────
