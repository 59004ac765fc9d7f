//! Request models and runtime settings.
//!
//! A configuration request is a JSON object whose `type` picks the analysis
//! (missing or `null` means `summary`) and whose other keys carry its parameters.
//! An insight request is just an analysis name plus a column list.
//!
//! # Example
//!
//! ```
//! use insight_engine::config::{AnalysisRequest, RequestKind};
//!
//! let req = AnalysisRequest::from_json(r#"{"type": "forecast", "target_column": "sales"}"#).unwrap();
//! assert_eq!(req.kind, RequestKind::Forecast);
//! assert_eq!(req.periods(), 6);
//! ```

use crate::error::InsightError;
use crate::trend::DEFAULT_PERIODS;
use serde::{Deserialize, Deserializer};

// ── Configuration requests ────────────────────────────────────────────

/// Analysis named by a configuration request's `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    #[default]
    Summary,
    Correlation,
    Regression,
    Clustering,
    StatisticalTests,
    Forecast,
    Comprehensive,
    /// Any other name; only the data summary is produced.
    #[serde(other)]
    Unknown,
}

fn kind_or_summary<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RequestKind, D::Error> {
    Ok(Option::<RequestKind>::deserialize(deserializer)?.unwrap_or_default())
}

/// A configuration request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisRequest {
    #[serde(rename = "type", default, deserialize_with = "kind_or_summary")]
    pub kind: RequestKind,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub target_column: Option<String>,
    #[serde(default)]
    pub feature_columns: Option<Vec<String>>,
    #[serde(default)]
    pub n_clusters: Option<usize>,
    #[serde(default)]
    pub test_type: Option<String>,
    #[serde(default)]
    pub variables: Option<Vec<String>>,
    #[serde(default)]
    pub periods: Option<usize>,
}

impl AnalysisRequest {
    pub fn new(kind: RequestKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self, InsightError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn target_column(mut self, target: impl Into<String>) -> Self {
        self.target_column = Some(target.into());
        self
    }

    pub fn feature_columns(mut self, features: Vec<String>) -> Self {
        self.feature_columns = Some(features);
        self
    }

    pub fn n_clusters(mut self, k: usize) -> Self {
        self.n_clusters = Some(k);
        self
    }

    pub fn test(mut self, test_type: impl Into<String>, variables: Vec<String>) -> Self {
        self.test_type = Some(test_type.into());
        self.variables = Some(variables);
        self
    }

    pub fn with_periods(mut self, periods: usize) -> Self {
        self.periods = Some(periods);
        self
    }

    /// Forecast horizon, 6 when not given.
    pub fn periods(&self) -> usize {
        self.periods.unwrap_or(DEFAULT_PERIODS)
    }

    /// Returns a parameter the chosen analysis cannot run without.
    pub fn require<'a, T>(value: &'a Option<T>, name: &str) -> Result<&'a T, InsightError> {
        value
            .as_ref()
            .ok_or_else(|| InsightError::InvalidInput(format!("missing required parameter '{name}'")))
    }
}

// ── Insight requests ──────────────────────────────────────────────────

/// Analysis named by an insight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightKind {
    TimeSeries,
    Regression,
    PcaClustering,
    StatisticalTests,
    /// Fallback for every other name.
    Exploratory,
}

impl InsightKind {
    /// Maps an analysis name; unknown names mean exploratory analysis.
    ///
    /// ```
    /// use insight_engine::config::InsightKind;
    ///
    /// assert_eq!(InsightKind::from_name("time_series_forecast"), InsightKind::TimeSeries);
    /// assert_eq!(InsightKind::from_name("anything"), InsightKind::Exploratory);
    /// ```
    pub fn from_name(name: &str) -> Self {
        match name {
            "time_series" | "time_series_forecast" => Self::TimeSeries,
            "regression_feature_importance" => Self::Regression,
            "pca_clustering" => Self::PcaClustering,
            "statistical_tests" => Self::StatisticalTests,
            _ => Self::Exploratory,
        }
    }
}

/// An insight request: analysis name plus the caller's column selection.
#[derive(Debug, Clone)]
pub struct InsightRequest {
    /// Name as given; echoed back in the report.
    pub analysis_type: String,
    pub kind: InsightKind,
    pub columns: Vec<String>,
}

impl InsightRequest {
    pub fn new(analysis_type: impl Into<String>, columns: Vec<String>) -> Self {
        let analysis_type = analysis_type.into();
        Self {
            kind: InsightKind::from_name(&analysis_type),
            analysis_type,
            columns,
        }
    }
}

// ── Runtime settings ──────────────────────────────────────────────────

/// Settings shared by every analysis of one invocation.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Seed for forest bootstrap and k-means++ seeding. Default: 42.
    pub seed: u64,
    /// Single-line JSON output. Default: false (pretty-printed).
    pub compact: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            seed: 42,
            compact: false,
        }
    }
}

impl EngineSettings {
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_type_is_summary() {
        let req = AnalysisRequest::from_json("{}").unwrap();
        assert_eq!(req.kind, RequestKind::Summary);
        assert!(req.columns.is_none());
    }

    #[test]
    fn null_type_is_summary() {
        let req = AnalysisRequest::from_json(r#"{"type": null, "periods": 2}"#).unwrap();
        assert_eq!(req.kind, RequestKind::Summary);
        assert_eq!(req.periods(), 2);
    }

    #[test]
    fn unknown_type_is_tolerated() {
        let req = AnalysisRequest::from_json(r#"{"type": "sentiment"}"#).unwrap();
        assert_eq!(req.kind, RequestKind::Unknown);
    }

    #[test]
    fn parameters_parse() {
        let req = AnalysisRequest::from_json(
            r#"{"type": "statistical_tests", "test_type": "ttest",
                "variables": ["a", "b"], "n_clusters": null, "periods": 3}"#,
        )
        .unwrap();
        assert_eq!(req.kind, RequestKind::StatisticalTests);
        assert_eq!(req.test_type.as_deref(), Some("ttest"));
        assert_eq!(req.variables.as_ref().map(Vec::len), Some(2));
        assert_eq!(req.n_clusters, None);
        assert_eq!(req.periods(), 3);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(
            AnalysisRequest::from_json("not json"),
            Err(InsightError::Json(_))
        ));
        assert!(AnalysisRequest::from_json(r#"{"n_clusters": -1}"#).is_err());
    }

    #[test]
    fn require_reports_parameter_name() {
        let req = AnalysisRequest::new(RequestKind::Regression);
        let err = AnalysisRequest::require(&req.target_column, "target_column").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input: missing required parameter 'target_column'"
        );
        assert!(!err.is_precondition());
    }

    #[test]
    fn settings_builders() {
        let s = EngineSettings::default().seed(7).compact(true);
        assert_eq!(s.seed, 7);
        assert!(s.compact);
    }
}
