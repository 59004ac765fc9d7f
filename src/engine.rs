//! Analysis dispatch.
//!
//! [`Engine`] turns a loaded [`DataFrame`] plus a request into a report. The
//! `run_*_request` functions are the outer boundary: they load the records,
//! run the engine and fold every failure, panics included, into an
//! `{"error": …}` document so callers always get exactly one JSON object.
//!
//! # Example
//!
//! ```
//! use insight_engine::config::EngineSettings;
//! use insight_engine::engine::run_config_request;
//! use serde_json::json;
//!
//! let data = json!([{"x": 1, "y": 2}, {"x": 2, "y": 4}, {"x": 3, "y": 6}]);
//! let response = run_config_request(&data, r#"{"type": "correlation"}"#, &EngineSettings::default());
//! let out = serde_json::to_value(&response).unwrap();
//!
//! assert_eq!(out["analyses"]["correlation"]["top_correlations"][0]["strength"], "Strong");
//! ```

use crate::analysis::{correlation_analysis, CorrelationConfig};
use crate::clustering::{
    compactness_select, elbow_select, kmeans, standardize, summarize_clusters, KMeansConfig,
};
use crate::config::{AnalysisRequest, EngineSettings, InsightKind, InsightRequest, RequestKind};
use crate::dataframe::{DataFrame, DataType};
use crate::distribution::normality_test;
use crate::error::InsightError;
use crate::feature_importance::{compare_models, driver_analysis};
use crate::forest::ForestConfig;
use crate::insight::{self, Complexity, DataQuality, ALPHA};
use crate::loader::RecordLoader;
use crate::pca::{pca, PcaConfig};
use crate::profiling;
use crate::report::*;
use crate::selection;
use crate::stats;
use crate::testing::{correlation_test, one_way_anova, t_test};
use crate::trend::{forecast, series_trend, TrendConfig};
use serde::Serialize;
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, warn};

/// Series and pairs need more than this many values to be analysed.
const MIN_SERIES_POINTS: usize = 3;

/// Principal components listed in a clustering report.
const REPORTED_COMPONENTS: usize = 3;

/// Columns listed as most variable.
const MOST_VARIABLE: usize = 3;

// ── Engine ────────────────────────────────────────────────────────────

/// Runs analyses over one table with fixed settings.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    settings: EngineSettings,
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    // ── Configuration requests ───────────────────────────────────

    /// Runs a configuration request: the data summary plus the requested
    /// analyses. Precondition failures land inline in `analyses`.
    pub fn run_config(
        &self,
        df: &DataFrame,
        request: &AnalysisRequest,
    ) -> Result<ConfigReport, InsightError> {
        if df.is_empty() {
            return Err(InsightError::NoData);
        }
        let summary = profiling::summarize(df);
        let mut analyses = Keyed::new();
        debug!(kind = ?request.kind, "dispatching configuration request");

        match request.kind {
            RequestKind::Summary => {}
            RequestKind::Unknown => warn!("unknown analysis type, returning summary only"),
            RequestKind::Correlation => {
                let result = self.correlation(df, request.columns.as_deref());
                analyses.insert(
                    "correlation",
                    Outcome::capture(result)?.map(AnalysisReport::Correlation),
                );
            }
            RequestKind::Regression => {
                let target = AnalysisRequest::require(&request.target_column, "target_column")?;
                let result = self.regression(df, target, request.feature_columns.as_deref());
                analyses.insert(
                    "regression",
                    Outcome::capture(result)?.map(AnalysisReport::Regression),
                );
            }
            RequestKind::Clustering => {
                let result = self.clustering(df, request.columns.as_deref(), request.n_clusters);
                analyses.insert(
                    "clustering",
                    Outcome::capture(result)?.map(AnalysisReport::Clustering),
                );
            }
            RequestKind::StatisticalTests => {
                let test_type = AnalysisRequest::require(&request.test_type, "test_type")?;
                let variables = AnalysisRequest::require(&request.variables, "variables")?;
                let result = self.statistical_test(df, test_type, variables);
                analyses.insert(
                    "statistical_tests",
                    Outcome::capture(result)?.map(AnalysisReport::StatisticalTest),
                );
            }
            RequestKind::Forecast => {
                let target = AnalysisRequest::require(&request.target_column, "target_column")?;
                let result = self.forecast(df, target, request.periods());
                analyses.insert(
                    "forecast",
                    Outcome::capture(result)?.map(AnalysisReport::Forecast),
                );
            }
            RequestKind::Comprehensive => {
                let numeric = &summary.numeric_columns;
                if numeric.len() >= 2 {
                    let correlation = self.correlation(df, None);
                    analyses.insert(
                        "correlation",
                        Outcome::capture(correlation)?.map(AnalysisReport::Correlation),
                    );
                    let regression = self.regression(df, &numeric[0], Some(&numeric[1..]));
                    analyses.insert(
                        "regression",
                        Outcome::capture(regression)?.map(AnalysisReport::Regression),
                    );
                    let clustering = self.clustering(df, None, None);
                    analyses.insert(
                        "clustering",
                        Outcome::capture(clustering)?.map(AnalysisReport::Clustering),
                    );
                } else {
                    debug!(numeric = numeric.len(), "comprehensive request needs 2 numeric columns");
                }
            }
        }

        Ok(ConfigReport {
            data_summary: SummaryReport::from(&summary),
            analyses,
        })
    }

    /// Pearson correlation over the selected numeric columns.
    pub fn correlation(
        &self,
        df: &DataFrame,
        columns: Option<&[String]>,
    ) -> Result<CorrelationReport, InsightError> {
        let names = selection::select_numeric(df, columns);
        let values = option_columns(df, &names)?;
        let analysis = correlation_analysis(&values, &names, &CorrelationConfig::default())?;
        Ok(CorrelationReport::from(&analysis))
    }

    /// Random forest vs. linear regression on a mean-imputed matrix.
    pub fn regression(
        &self,
        df: &DataFrame,
        target: &str,
        features: Option<&[String]>,
    ) -> Result<RegressionReport, InsightError> {
        let column = df
            .column_by_name(target)
            .ok_or_else(|| InsightError::TargetNotFound {
                name: target.to_string(),
            })?;
        if column.data_type() != DataType::Numeric {
            return Err(InsightError::TargetNotNumeric {
                name: target.to_string(),
            });
        }

        let candidates = match features {
            Some(list) => selection::numeric_subset(df, list),
            None => selection::numeric_columns(df),
        };
        let mut names: Vec<String> = Vec::new();
        for name in candidates {
            if name != target && !names.contains(&name) {
                names.push(name);
            }
        }
        if names.is_empty() {
            return Err(InsightError::NoFeatures);
        }
        debug!(target, features = ?names, "regression features");

        let x = df.imputed_columns(&names)?;
        let y = df.imputed_columns(&[target.to_string()])?.remove(0);
        let forest = ForestConfig::default().seed(self.settings.seed);
        let comparison = compare_models(&x, &names, &y, target, &forest)?;
        Ok(RegressionReport::from(&comparison))
    }

    /// K-means on the standardized, mean-imputed matrix. Without an explicit
    /// `n_clusters` the elbow rule picks K.
    pub fn clustering(
        &self,
        df: &DataFrame,
        columns: Option<&[String]>,
        n_clusters: Option<usize>,
    ) -> Result<ClusteringReport, InsightError> {
        let names = selection::select_numeric(df, columns);
        if names.len() < 2 {
            return Err(InsightError::insufficient_columns("clustering", 2, names.len()));
        }
        let n = df.row_count();
        if n < 2 {
            return Err(InsightError::insufficient_data("clustering", 2, n));
        }

        let scaled = standardize(&transpose(&df.imputed_columns(&names)?));
        let config = KMeansConfig::new(n_clusters.unwrap_or(2)).seed(self.settings.seed);
        let k = match n_clusters {
            Some(k) => k,
            None => elbow_select(&scaled, &config)?.k,
        };
        debug!(k, rows = n, "clustering");

        let result = kmeans(&scaled, &config.k(k))?;
        let summaries = summarize_clusters(&option_columns(df, &names)?, &names, &result.labels, k);
        Ok(ClusteringReport::new(&result.labels, &summaries, &names))
    }

    /// Independent t-test (`ttest`) or one-way ANOVA (`anova`) over the
    /// present values of the named columns.
    pub fn statistical_test(
        &self,
        df: &DataFrame,
        test_type: &str,
        variables: &[String],
    ) -> Result<TestReport, InsightError> {
        match test_type {
            "ttest" => {
                if variables.len() != 2 {
                    return Err(InsightError::InvalidParameter {
                        name: "variables".into(),
                        message: format!("t-test needs exactly 2 variables, got {}", variables.len()),
                    });
                }
                let a = df.numeric_values(&variables[0])?;
                let b = df.numeric_values(&variables[1])?;
                let t = t_test(&a, &b)?;
                Ok(TestReport {
                    test_type: "Independent T-Test",
                    variables: variables.to_vec(),
                    statistic: t.statistic,
                    p_value: t.p_value,
                    significant: t.p_value < ALPHA,
                    interpretation: insight::ttest_interpretation(t.p_value, t.mean1, t.mean2),
                    summary: format!("Comparing {} vs {}", variables[0], variables[1]),
                })
            }
            "anova" => {
                let groups = variables
                    .iter()
                    .map(|v| df.numeric_values(v))
                    .collect::<Result<Vec<_>, _>>()?;
                let a = one_way_anova(&groups)?;
                Ok(TestReport {
                    test_type: "One-Way ANOVA",
                    variables: variables.to_vec(),
                    statistic: a.statistic,
                    p_value: a.p_value,
                    significant: a.p_value < ALPHA,
                    interpretation: insight::anova_interpretation(a.p_value),
                    summary: format!("Comparing means across {} groups", variables.len()),
                })
            }
            other => Err(InsightError::InvalidParameter {
                name: "test_type".into(),
                message: format!("unsupported test '{other}', expected 'ttest' or 'anova'"),
            }),
        }
    }

    /// Linear-trend forecast of one column.
    pub fn forecast(
        &self,
        df: &DataFrame,
        target: &str,
        periods: usize,
    ) -> Result<ForecastReport, InsightError> {
        if !df.has_column(target) {
            return Err(InsightError::TargetNotFound {
                name: target.to_string(),
            });
        }
        let values = df.numeric_values(target)?;
        let f = forecast(&values, &TrendConfig::default().periods(periods))?;
        Ok(ForecastReport::new(target, &f))
    }

    // ── Insight requests ─────────────────────────────────────────

    /// Runs an insight request over the caller's column selection.
    pub fn run_insight(
        &self,
        df: &DataFrame,
        request: &InsightRequest,
    ) -> Result<InsightReport, InsightError> {
        if df.is_empty() {
            return Err(InsightError::NoData);
        }
        let columns = selection::analysis_columns(df, &request.columns);
        let numeric = selection::numeric_subset(df, &columns);
        if numeric.is_empty() {
            return Err(InsightError::NoNumericColumns);
        }
        debug!(kind = ?request.kind, numeric = numeric.len(), "dispatching insight request");

        let body = match request.kind {
            InsightKind::TimeSeries => self.time_series(df, &columns, &numeric)?,
            InsightKind::Regression => self.drivers(df, &numeric)?,
            InsightKind::PcaClustering => self.pca_clustering(df, &numeric)?,
            InsightKind::StatisticalTests => self.test_sweep(df, &numeric)?,
            InsightKind::Exploratory => self.exploratory(df, &numeric)?,
        };

        Ok(InsightReport {
            success: true,
            data_points_analyzed: df.row_count(),
            columns_analyzed: request.columns.len(),
            analysis_type: request.analysis_type.clone(),
            body,
        })
    }

    fn time_series(
        &self,
        df: &DataFrame,
        columns: &[String],
        numeric: &[String],
    ) -> Result<InsightBody, InsightError> {
        let time_column = selection::time_column(columns);
        debug!(?time_column, "time column");

        let mut insights = Keyed::new();
        let mut statistics = Keyed::new();
        for name in numeric {
            if Some(name.as_str()) == time_column {
                continue;
            }
            let values = df.numeric_values(name)?;
            if values.len() <= MIN_SERIES_POINTS {
                continue;
            }
            let series = series_trend(&values)?;
            statistics.insert(name.clone(), TrendStatistics::from(&series));
            insights.insert(name.clone(), TrendInsight::from(&series));
        }

        Ok(InsightBody::TimeSeries(Section {
            insights,
            statistics,
            recommendations: insight::trend_recommendations(),
        }))
    }

    /// Last numeric column as target, the others as drivers, complete rows.
    fn drivers(&self, df: &DataFrame, numeric: &[String]) -> Result<InsightBody, InsightError> {
        if numeric.len() < 2 {
            return Err(InsightError::insufficient_columns(
                "regression analysis",
                2,
                numeric.len(),
            ));
        }
        let (_, rows) = df.complete_rows(numeric)?;
        let mut columns = transpose(&rows);
        if columns.is_empty() {
            columns = vec![Vec::new(); numeric.len()];
        }
        let target = columns.pop().unwrap_or_default();
        let (target_name, feature_names) = numeric.split_last().ok_or(InsightError::NoFeatures)?;

        let analysis = driver_analysis(&columns, feature_names, &target, target_name)?;
        Ok(InsightBody::Regression(Section {
            insights: DriverInsights::from(&analysis),
            statistics: DriverStatistics::from(&analysis),
            recommendations: insight::driver_recommendations(
                &analysis.top_driver,
                &analysis.target,
            ),
        }))
    }

    /// PCA and compactness-selected k-means on complete, standardized rows.
    fn pca_clustering(&self, df: &DataFrame, numeric: &[String]) -> Result<InsightBody, InsightError> {
        if numeric.len() < 2 {
            return Err(InsightError::insufficient_columns("clustering", 2, numeric.len()));
        }
        let (_, rows) = df.complete_rows(numeric)?;
        if rows.len() < 3 {
            return Err(InsightError::insufficient_data("clustering", 3, rows.len()));
        }

        let scaled = standardize(&rows);
        let components = pca(&scaled, &PcaConfig::new())?;
        let chosen = compactness_select(&scaled, &KMeansConfig::new(2).seed(self.settings.seed))?;
        let k = chosen.k;

        let present: Vec<Vec<Option<f64>>> = transpose(&rows)
            .into_iter()
            .map(|col| col.into_iter().map(Some).collect())
            .collect();
        let summaries = summarize_clusters(&present, numeric, &chosen.result.labels, k);
        let first_ratio = components
            .explained_variance_ratio
            .first()
            .copied()
            .unwrap_or(0.0);

        Ok(InsightBody::Clustering(Section {
            insights: ClusteringInsights {
                data_complexity: Complexity::from_first_ratio(first_ratio),
                natural_groupings: k,
                main_variation_explained: first_ratio,
            },
            statistics: ClusteringStatistics {
                pca_explained_variance: components
                    .explained_variance_ratio
                    .iter()
                    .take(REPORTED_COMPONENTS)
                    .copied()
                    .collect(),
                optimal_clusters: k,
                cluster_statistics: summaries
                    .iter()
                    .map(|c| (format!("cluster_{}", c.cluster_id), ClusterStatistics::from(c)))
                    .collect(),
            },
            recommendations: insight::clustering_recommendations(k),
        }))
    }

    /// Normality of every column and significance of every column pair.
    fn test_sweep(&self, df: &DataFrame, numeric: &[String]) -> Result<InsightBody, InsightError> {
        if numeric.len() < 2 {
            return Err(InsightError::insufficient_columns(
                "statistical tests",
                2,
                numeric.len(),
            ));
        }

        let mut normality_tests = Keyed::new();
        for name in numeric {
            let values = df.numeric_values(name)?;
            if values.len() > MIN_SERIES_POINTS {
                let test = normality_test(&values)?;
                normality_tests.insert(name.clone(), NormalityEntry::from(&test));
            }
        }

        let columns = option_columns(df, numeric)?;
        let mut correlation_tests = Keyed::new();
        for i in 0..numeric.len() {
            for j in (i + 1)..numeric.len() {
                let (a, b) = stats::pairwise_complete(&columns[i], &columns[j]);
                if a.len() > MIN_SERIES_POINTS {
                    let test = correlation_test(&a, &b)?;
                    correlation_tests.insert(
                        format!("{}_vs_{}", numeric[i], numeric[j]),
                        CorrelationTestEntry::from(&test),
                    );
                }
            }
        }

        let normal = normality_tests.0.iter().filter(|(_, t)| t.is_normal).count();
        let significant = correlation_tests
            .0
            .iter()
            .filter(|(_, t)| t.significant)
            .count();

        Ok(InsightBody::Tests(Section {
            insights: TestInsights {
                normal_distributions: normal,
                significant_relationships: significant,
                data_quality: DataQuality::from_normal_share(normal, numeric.len()),
            },
            statistics: TestStatistics {
                normality_tests,
                correlation_tests,
            },
            recommendations: insight::testing_recommendations(),
        }))
    }

    fn exploratory(&self, df: &DataFrame, numeric: &[String]) -> Result<InsightBody, InsightError> {
        let profile = profiling::explore(df, numeric)?;
        let most_variable = profile
            .high_variance_columns
            .iter()
            .take(MOST_VARIABLE)
            .cloned()
            .collect();

        Ok(InsightBody::Exploratory(Section {
            insights: ExploratoryInsights {
                data_quality: DataQuality::Good,
                most_variable_columns: most_variable,
                analysis_readiness: Readiness::Ready,
            },
            statistics: ExploratoryStatistics {
                column_statistics: profile
                    .columns
                    .iter()
                    .map(|(name, p)| (name.clone(), ColumnStatistics::from(p)))
                    .collect(),
                high_variance_columns: profile.high_variance_columns.clone(),
                data_shape: DataShape {
                    rows: profile.rows,
                    columns: profile.analysed_columns,
                },
            },
            recommendations: insight::exploratory_recommendations(),
        }))
    }
}

// ── Boundary ──────────────────────────────────────────────────────────

/// The single JSON document printed for a request.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    Config(ConfigReport),
    Insight(InsightReport),
    Error(ErrorReport),
}

impl Response {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn to_json(&self, compact: bool) -> Result<String, InsightError> {
        to_json(self, compact)
    }
}

/// Loads `data`, parses `config_text` and runs a configuration request.
pub fn run_config_request(data: &Value, config_text: &str, settings: &EngineSettings) -> Response {
    info!("configuration request");
    guarded(|| {
        let df = RecordLoader::new().load_value(data)?;
        if df.is_empty() {
            return Err(InsightError::NoData);
        }
        let request = AnalysisRequest::from_json(config_text)?;
        let report = Engine::new(settings.clone()).run_config(&df, &request)?;
        info!(analyses = report.analyses.len(), "configuration request finished");
        Ok(Response::Config(report))
    })
}

/// Loads `data` and runs an insight request.
pub fn run_insight_request(
    data: &Value,
    analysis_type: &str,
    columns: Vec<String>,
    settings: &EngineSettings,
) -> Response {
    info!(analysis_type, "insight request");
    guarded(|| {
        let df = RecordLoader::new().load_value(data)?;
        let request = InsightRequest::new(analysis_type, columns);
        let report = Engine::new(settings.clone()).run_insight(&df, &request)?;
        info!(rows = report.data_points_analyzed, "insight request finished");
        Ok(Response::Insight(report))
    })
}

/// Runs `f`, turning errors and panics into an error document.
fn guarded<F>(f: F) -> Response
where
    F: FnOnce() -> Result<Response, InsightError>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            if e.is_precondition() {
                debug!(error = %e, "request rejected");
            } else {
                warn!(error = %e, "analysis failed");
            }
            Response::Error(ErrorReport::from(&e))
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "internal panic".to_string());
            warn!(%message, "analysis panicked");
            Response::Error(ErrorReport::analysis_failed(message))
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────

/// Every row of each named numeric column, missing as `None`.
fn option_columns(df: &DataFrame, names: &[String]) -> Result<Vec<Vec<Option<f64>>>, InsightError> {
    names
        .iter()
        .map(|name| {
            df.column_by_name(name)
                .ok_or_else(|| InsightError::ColumnNotFound { name: name.clone() })?
                .numeric_options()
                .ok_or_else(|| InsightError::NonNumericColumn {
                    column: name.clone(),
                })
        })
        .collect()
}

/// Swaps row-major and column-major layouts.
fn transpose(matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let width = matrix.first().map_or(0, Vec::len);
    (0..width)
        .map(|j| matrix.iter().map(|row| row[j]).collect())
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────
