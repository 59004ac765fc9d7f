//! Serializable result documents.
//!
//! Every analysis result is converted into one of the report types below
//! and written out with [`serde_json`]. Column-keyed sections use [`Keyed`]
//! so JSON objects keep the table's column order. Non-finite floats are
//! written as `null` by `serde_json`.
//!
//! Two document shapes exist:
//!
//! - [`ConfigReport`]: `{"data_summary": …, "analyses": {name: result}}`
//! - [`InsightReport`]: `{"success": true, …, "insights", "statistics",
//!   "recommendations"}`
//!
//! Failures anywhere are written as [`ErrorReport`] (`{"error": msg}`).

use crate::analysis::CorrelationAnalysis;
use crate::clustering::ClusterSummary;
use crate::distribution::{NormalityMethod, NormalityTest};
use crate::error::InsightError;
use crate::feature_importance::{DriverAnalysis, ModelComparison};
use crate::insight::{
    percent, Complexity, CorrelationStrength, DataQuality, ModelQuality, Predictability,
    Seasonality, Strength, TrendDirection, Volatility,
};
use crate::profiling::{ColumnProfile, DataSummary};
use crate::stats::Describe;
use crate::testing::CorrelationTest;
use crate::trend::{Forecast, SeriesTrend};
use serde::{Serialize, Serializer};

// ── Building blocks ───────────────────────────────────────────────────

/// String-keyed entries serialized as a JSON object in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyed<T>(pub Vec<(String, T)>);

impl<T> Keyed<T> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: T) {
        self.0.push((key.into(), value));
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> Default for Keyed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<(String, T)> for Keyed<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T: Serialize> Serialize for Keyed<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

/// `{"error": message}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub error: String,
}

impl ErrorReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }

    /// Wraps an unexpected failure as `Analysis failed: …`.
    pub fn analysis_failed(message: impl std::fmt::Display) -> Self {
        Self::new(format!("Analysis failed: {message}"))
    }
}

impl From<&InsightError> for ErrorReport {
    fn from(e: &InsightError) -> Self {
        if e.is_precondition() {
            Self::new(e.to_string())
        } else {
            Self::analysis_failed(e)
        }
    }
}

/// A result or the reason it could not be produced.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Outcome<T> {
    Ok(T),
    Failed(ErrorReport),
}

impl<T> Outcome<T> {
    /// Keeps precondition failures as inline errors and passes anything
    /// unexpected back to the caller.
    pub fn capture(result: Result<T, InsightError>) -> Result<Self, InsightError> {
        match result {
            Ok(v) => Ok(Self::Ok(v)),
            Err(e) if e.is_precondition() => Ok(Self::Failed(ErrorReport::from(&e))),
            Err(e) => Err(e),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Ok(v) => Outcome::Ok(f(v)),
            Self::Failed(e) => Outcome::Failed(e),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Ok(_) => None,
            Self::Failed(e) => Some(&e.error),
        }
    }
}

/// Serializes `value` as pretty (two-space) or single-line JSON.
pub fn to_json<T: Serialize>(value: &T, compact: bool) -> Result<String, InsightError> {
    let text = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    Ok(text)
}

// ── Configuration documents ───────────────────────────────────────────

/// Output of a configuration request.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigReport {
    pub data_summary: SummaryReport,
    pub analyses: Keyed<Outcome<AnalysisReport>>,
}

/// One entry of [`ConfigReport::analyses`].
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnalysisReport {
    Correlation(CorrelationReport),
    Regression(RegressionReport),
    Clustering(ClusteringReport),
    StatisticalTest(TestReport),
    Forecast(ForecastReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BasicStats {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl From<&Describe> for BasicStats {
    fn from(d: &Describe) -> Self {
        Self {
            mean: d.mean,
            median: d.median,
            std: d.std,
            min: d.min,
            max: d.max,
            count: d.count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub total_rows: usize,
    pub total_columns: usize,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub missing_values: Keyed<usize>,
    pub data_types: Keyed<&'static str>,
    pub basic_stats: Keyed<BasicStats>,
}

impl From<&DataSummary> for SummaryReport {
    fn from(s: &DataSummary) -> Self {
        Self {
            total_rows: s.total_rows,
            total_columns: s.total_columns,
            numeric_columns: s.numeric_columns.clone(),
            categorical_columns: s.categorical_columns.clone(),
            missing_values: Keyed(s.missing_values.clone()),
            data_types: Keyed(s.data_types.clone()),
            basic_stats: s
                .basic_stats
                .iter()
                .map(|(name, d)| (name.clone(), BasicStats::from(d)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrelationEntry {
    pub var1: String,
    pub var2: String,
    pub correlation: f64,
    pub strength: CorrelationStrength,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrelationReport {
    pub correlation_matrix: Keyed<Keyed<f64>>,
    pub top_correlations: Vec<CorrelationEntry>,
    pub summary: String,
}

impl From<&CorrelationAnalysis> for CorrelationReport {
    fn from(a: &CorrelationAnalysis) -> Self {
        let correlation_matrix = a
            .names
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let cells = a
                    .names
                    .iter()
                    .enumerate()
                    .map(|(j, col)| (col.clone(), a.matrix.get(i, j)))
                    .collect();
                (row.clone(), cells)
            })
            .collect();
        let top_correlations = a
            .top_pairs
            .iter()
            .map(|p| CorrelationEntry {
                var1: p.var1.clone(),
                var2: p.var2.clone(),
                correlation: p.r,
                strength: p.strength,
            })
            .collect();
        Self {
            correlation_matrix,
            top_correlations,
            summary: format!(
                "Found {} correlation pairs among {} numeric variables",
                a.pairs_found,
                a.names.len()
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureImportanceEntry {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegressionReport {
    pub target_column: String,
    pub feature_columns: Vec<String>,
    pub random_forest_r2: f64,
    pub linear_regression_r2: f64,
    pub feature_importance: Vec<FeatureImportanceEntry>,
    /// `[name, importance]` pairs of the five most important features.
    pub top_drivers: Vec<(String, f64)>,
    pub model_comparison: &'static str,
    pub linear_intercept: f64,
    pub linear_coefficients: Keyed<f64>,
    pub summary: String,
}

/// Drivers listed in [`RegressionReport::top_drivers`].
pub const TOP_DRIVERS: usize = 5;

impl From<&ModelComparison> for RegressionReport {
    fn from(m: &ModelComparison) -> Self {
        Self {
            target_column: m.target.clone(),
            feature_columns: m.features.clone(),
            random_forest_r2: m.forest_r_squared,
            linear_regression_r2: m.linear_r_squared,
            feature_importance: m
                .ranked
                .iter()
                .map(|f| FeatureImportanceEntry {
                    feature: f.name.clone(),
                    importance: f.importance,
                })
                .collect(),
            top_drivers: m
                .top_drivers(TOP_DRIVERS)
                .iter()
                .map(|f| (f.name.clone(), f.importance))
                .collect(),
            model_comparison: m.preferred.label(),
            linear_intercept: m.linear_intercept,
            linear_coefficients: m
                .features
                .iter()
                .cloned()
                .zip(m.linear_coefficients.iter().copied())
                .collect(),
            summary: format!(
                "Model explains {} of variance in {}",
                percent(m.best_r_squared()),
                m.target
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Characteristic {
    pub mean: f64,
    pub vs_overall: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterEntry {
    pub cluster_id: usize,
    pub size: usize,
    pub percentage: f64,
    pub characteristics: Keyed<Characteristic>,
}

impl From<&ClusterSummary> for ClusterEntry {
    fn from(c: &ClusterSummary) -> Self {
        Self {
            cluster_id: c.cluster_id,
            size: c.size,
            percentage: c.percentage,
            characteristics: c
                .features
                .iter()
                .map(|f| {
                    (
                        f.name.clone(),
                        Characteristic {
                            mean: f.mean,
                            vs_overall: f.vs_overall,
                        },
                    )
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusteringReport {
    pub n_clusters: usize,
    pub cluster_assignments: Vec<usize>,
    pub cluster_summary: Vec<ClusterEntry>,
    pub features_used: Vec<String>,
    pub summary: String,
}

impl ClusteringReport {
    pub fn new(labels: &[usize], summaries: &[ClusterSummary], features: &[String]) -> Self {
        let k = summaries.len();
        Self {
            n_clusters: k,
            cluster_assignments: labels.to_vec(),
            cluster_summary: summaries.iter().map(ClusterEntry::from).collect(),
            features_used: features.to_vec(),
            summary: format!("Identified {k} distinct groups in your data"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub test_type: &'static str,
    pub variables: Vec<String>,
    pub statistic: f64,
    pub p_value: f64,
    pub significant: bool,
    pub interpretation: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub target_column: String,
    pub historical_data: Vec<f64>,
    pub forecast: Vec<f64>,
    pub forecast_upper: Vec<f64>,
    pub forecast_lower: Vec<f64>,
    pub trend_slope: f64,
    pub r_squared: f64,
    pub periods_forecasted: usize,
    pub trend_direction: TrendDirection,
    pub trend_strength: Strength,
    pub summary: String,
}

impl ForecastReport {
    pub fn new(target: &str, f: &Forecast) -> Self {
        Self {
            target_column: target.to_string(),
            historical_data: f.historical.clone(),
            forecast: f.forecast.clone(),
            forecast_upper: f.upper.clone(),
            forecast_lower: f.lower.clone(),
            trend_slope: f.fit.slope,
            r_squared: f.fit.r_squared,
            periods_forecasted: f.periods,
            trend_direction: TrendDirection::from_slope(f.fit.slope),
            trend_strength: Strength::from_r(f.fit.r),
            summary: format!(
                "Forecasted {} periods for {} with {} trend fit",
                f.periods,
                target,
                percent(f.fit.r_squared)
            ),
        }
    }
}

// ── Insight documents ─────────────────────────────────────────────────

/// Output of an insight request.
#[derive(Debug, Clone, Serialize)]
pub struct InsightReport {
    pub success: bool,
    pub data_points_analyzed: usize,
    pub columns_analyzed: usize,
    pub analysis_type: String,
    #[serde(flatten)]
    pub body: InsightBody,
}

/// Insights, statistics and recommendations of one insight analysis.
#[derive(Debug, Clone, Serialize)]
pub struct Section<I, S> {
    pub insights: I,
    pub statistics: S,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum InsightBody {
    TimeSeries(Section<Keyed<TrendInsight>, Keyed<TrendStatistics>>),
    Regression(Section<DriverInsights, DriverStatistics>),
    Clustering(Section<ClusteringInsights, ClusteringStatistics>),
    Tests(Section<TestInsights, TestStatistics>),
    Exploratory(Section<ExploratoryInsights, ExploratoryStatistics>),
}

// time series

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TrendStatistics {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub trend_slope: f64,
    pub trend_r_squared: f64,
    pub trend_p_value: f64,
    pub seasonality_strength: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TrendInsight {
    pub trend_direction: TrendDirection,
    pub trend_strength: Strength,
    pub volatility: Volatility,
    pub seasonality: Seasonality,
    pub forecast_next_period: Option<f64>,
}

impl From<&SeriesTrend> for TrendStatistics {
    fn from(s: &SeriesTrend) -> Self {
        Self {
            mean: s.mean,
            std_dev: s.std_dev,
            min: s.min,
            max: s.max,
            trend_slope: s.fit.slope,
            trend_r_squared: s.fit.r_squared,
            trend_p_value: s.fit.p_value,
            seasonality_strength: s.seasonality_strength,
        }
    }
}

impl From<&SeriesTrend> for TrendInsight {
    fn from(s: &SeriesTrend) -> Self {
        Self {
            trend_direction: TrendDirection::from_slope(s.fit.slope),
            trend_strength: Strength::from_r(s.fit.r),
            volatility: Volatility::classify(s.std_dev, s.mean),
            seasonality: Seasonality::classify(s.seasonality_strength),
            forecast_next_period: s.next_period(),
        }
    }
}

// regression

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DriverEntry {
    pub coefficient: f64,
    pub importance: f64,
    pub correlation: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverStatistics {
    pub target_variable: String,
    pub r_squared: f64,
    pub intercept: f64,
    pub feature_importance: Keyed<DriverEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverInsights {
    pub model_quality: ModelQuality,
    pub top_driver: String,
    pub top_driver_impact: f64,
    pub explained_variance: f64,
    pub predictability: Predictability,
}

impl From<&DriverAnalysis> for DriverStatistics {
    fn from(d: &DriverAnalysis) -> Self {
        Self {
            target_variable: d.target.clone(),
            r_squared: d.r_squared,
            intercept: d.intercept,
            feature_importance: d
                .drivers
                .iter()
                .map(|f| {
                    (
                        f.name.clone(),
                        DriverEntry {
                            coefficient: f.coefficient,
                            importance: f.importance,
                            correlation: f.correlation,
                        },
                    )
                })
                .collect(),
        }
    }
}

impl From<&DriverAnalysis> for DriverInsights {
    fn from(d: &DriverAnalysis) -> Self {
        Self {
            model_quality: ModelQuality::from_r_squared(d.r_squared),
            top_driver: d.top_driver.clone(),
            top_driver_impact: d.top_driver_importance(),
            explained_variance: d.r_squared,
            predictability: Predictability::from_r_squared(d.r_squared),
        }
    }
}

// PCA clustering

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FeatureSpread {
    pub mean: f64,
    pub std: f64,
    pub vs_overall: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterStatistics {
    pub size: usize,
    pub percentage: f64,
    pub characteristics: Keyed<FeatureSpread>,
}

impl From<&ClusterSummary> for ClusterStatistics {
    fn from(c: &ClusterSummary) -> Self {
        Self {
            size: c.size,
            percentage: c.percentage,
            characteristics: c
                .features
                .iter()
                .map(|f| {
                    (
                        f.name.clone(),
                        FeatureSpread {
                            mean: f.mean,
                            std: f.std,
                            vs_overall: f.vs_overall,
                        },
                    )
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusteringStatistics {
    /// Explained variance ratios of the first (up to) three components.
    pub pca_explained_variance: Vec<f64>,
    pub optimal_clusters: usize,
    pub cluster_statistics: Keyed<ClusterStatistics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusteringInsights {
    pub data_complexity: Complexity,
    pub natural_groupings: usize,
    pub main_variation_explained: f64,
}

// statistical tests

#[derive(Debug, Clone, Copy, Serialize)]
pub struct NormalityEntry {
    pub is_normal: bool,
    pub p_value: f64,
    pub test_used: NormalityMethod,
}

impl From<&NormalityTest> for NormalityEntry {
    fn from(t: &NormalityTest) -> Self {
        Self {
            is_normal: t.is_normal(),
            p_value: t.p_value,
            test_used: t.method,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CorrelationTestEntry {
    pub correlation: f64,
    pub p_value: f64,
    pub significant: bool,
    pub strength: Strength,
}

impl From<&CorrelationTest> for CorrelationTestEntry {
    fn from(t: &CorrelationTest) -> Self {
        Self {
            correlation: t.r,
            p_value: t.p_value,
            significant: t.p_value < crate::insight::ALPHA,
            strength: Strength::from_r(t.r),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TestStatistics {
    pub normality_tests: Keyed<NormalityEntry>,
    pub correlation_tests: Keyed<CorrelationTestEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestInsights {
    pub normal_distributions: usize,
    pub significant_relationships: usize,
    pub data_quality: DataQuality,
}

// exploratory

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ColumnStatistics {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub skewness: f64,
    pub kurtosis: f64,
}

impl From<&ColumnProfile> for ColumnStatistics {
    fn from(p: &ColumnProfile) -> Self {
        let d = &p.describe;
        Self {
            count: d.count,
            mean: d.mean,
            median: d.median,
            std: d.std,
            min: d.min,
            max: d.max,
            skewness: p.skewness,
            kurtosis: p.kurtosis,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DataShape {
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExploratoryStatistics {
    pub column_statistics: Keyed<ColumnStatistics>,
    pub high_variance_columns: Vec<String>,
    pub data_shape: DataShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    Ready,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExploratoryInsights {
    pub data_quality: DataQuality,
    pub most_variable_columns: Vec<String>,
    pub analysis_readiness: Readiness,
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn to_value<T: Serialize>(v: &T) -> Value {
        serde_json::from_str(&to_json(v, true).unwrap()).unwrap()
    }

    #[test]
    fn keyed_keeps_insertion_order() {
        let mut k = Keyed::new();
        k.insert("zeta", 1);
        k.insert("alpha", 2);
        assert_eq!(to_json(&k, true).unwrap(), r#"{"zeta":1,"alpha":2}"#);
        assert_eq!(k.get("alpha"), Some(&2));
    }

    #[test]
    fn non_finite_floats_become_null() {
        let stats = BasicStats {
            mean: 1.0,
            median: 1.0,
            std: f64::NAN,
            min: 1.0,
            max: f64::INFINITY,
            count: 1,
        };
        let v = to_value(&stats);
        assert_eq!(v["std"], Value::Null);
        assert_eq!(v["max"], Value::Null);
        assert_eq!(v["count"], json!(1));
    }

    #[test]
    fn outcome_shapes() {
        let ok: Outcome<DataShape> = Outcome::Ok(DataShape { rows: 2, columns: 1 });
        assert_eq!(to_value(&ok), json!({"rows": 2, "columns": 1}));

        let failed = Outcome::<DataShape>::capture(Err(InsightError::NoFeatures)).unwrap();
        assert_eq!(
            to_value(&failed),
            json!({"error": "No feature columns available for regression"})
        );
        assert!(failed.error().is_some());
    }

    #[test]
    fn unexpected_errors_escape_capture() {
        let err = InsightError::ComputationFailed {
            operation: "eigen".into(),
            detail: "no convergence".into(),
        };
        assert!(Outcome::<()>::capture(Err(err.clone())).is_err());
        assert_eq!(
            ErrorReport::from(&err).error,
            "Analysis failed: eigen failed: no convergence"
        );
    }

    #[test]
    fn insight_report_flattens_section() {
        let report = InsightReport {
            success: true,
            data_points_analyzed: 3,
            columns_analyzed: 1,
            analysis_type: "exploratory".into(),
            body: InsightBody::Exploratory(Section {
                insights: ExploratoryInsights {
                    data_quality: DataQuality::Good,
                    most_variable_columns: vec![],
                    analysis_readiness: Readiness::Ready,
                },
                statistics: ExploratoryStatistics {
                    column_statistics: Keyed::new(),
                    high_variance_columns: vec![],
                    data_shape: DataShape { rows: 3, columns: 1 },
                },
                recommendations: vec!["r".into()],
            }),
        };
        let text = to_json(&report, true).unwrap();
        let v: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["success"], json!(true));
        assert_eq!(v["insights"]["analysis_readiness"], json!("ready"));
        assert_eq!(v["insights"]["data_quality"], json!("good"));
        assert_eq!(v["statistics"]["data_shape"]["rows"], json!(3));
        // Field order follows the document layout.
        let keys: Vec<&str> = v.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "success",
                "data_points_analyzed",
                "columns_analyzed",
                "analysis_type",
                "insights",
                "statistics",
                "recommendations"
            ]
        );
    }

    #[test]
    fn top_drivers_serialize_as_pairs() {
        let r: Vec<(String, f64)> = vec![("a".into(), 0.75)];
        assert_eq!(to_value(&r), json!([["a", 0.75]]));
    }
}
