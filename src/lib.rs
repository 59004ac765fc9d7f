//! # insight-engine
//!
//! One-shot statistical analysis: a JSON array of records goes in, one JSON
//! document of statistics, labels and recommendations comes out.
//!
//! The crate works in two layers:
//!
//! - **Profiling** tolerates dirty data. Missing values are counted and
//!   skipped, never fatal.
//! - **Analysis** needs numeric columns. Correlation, regression, clustering,
//!   hypothesis tests and trend forecasts each check their own
//!   preconditions and report failures as `{"error": …}`.
//!
//! ## Modules
//!
//! - [`dataframe`]: column-major table with validity bitmaps
//! - [`loader`]: JSON records to [`dataframe::DataFrame`] with type inference
//! - [`selection`]: numeric column selection and the time-column heuristic
//! - [`stats`]: sample statistics with the crate's NaN conventions
//! - [`profiling`]: data summary and exploratory column profiles
//! - [`analysis`]: Pearson correlation matrix, OLS regression, R²
//! - [`forest`], [`feature_importance`]: random forest regressor, model
//!   comparison and linear driver analysis
//! - [`clustering`], [`pca`]: k-means++, K selection rules, PCA
//! - [`distribution`], [`testing`]: normality tests, t-test, ANOVA,
//!   correlation significance
//! - [`trend`]: linear trend fit and forecast band
//! - [`insight`]: thresholds, labels and recommendation text
//! - [`config`], [`report`], [`engine`]: requests, result documents, dispatch
//! - [`error`]: error types
//!
//! ## Quick Start
//!
//! ```
//! use insight_engine::config::{AnalysisRequest, EngineSettings, RequestKind};
//! use insight_engine::engine::Engine;
//! use insight_engine::loader::RecordLoader;
//!
//! let data = serde_json::json!([
//!     {"x": 1, "y": 2.0},
//!     {"x": 2, "y": 4.1},
//!     {"x": 3, "y": 5.9},
//!     {"x": 4, "y": 8.0},
//! ]);
//! let df = RecordLoader::new().load_value(&data).unwrap();
//! let request = AnalysisRequest::new(RequestKind::Forecast)
//!     .target_column("y")
//!     .with_periods(2);
//!
//! let report = Engine::new(EngineSettings::default()).run_config(&df, &request).unwrap();
//! assert_eq!(report.data_summary.total_rows, 4);
//! assert!(report.analyses.get("forecast").unwrap().error().is_none());
//! ```

pub mod analysis;
pub mod clustering;
pub mod config;
pub mod dataframe;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod feature_importance;
pub mod forest;
pub mod insight;
pub mod loader;
pub mod pca;
pub mod profiling;
pub mod report;
pub mod selection;
pub mod stats;
pub mod testing;
pub mod trend;
