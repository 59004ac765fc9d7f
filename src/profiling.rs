//! Dataset and column profiling.
//!
//! Two views of a loaded table:
//!
//! - [`summarize`]: table shape, column kinds, missing counts, dtype labels
//!   and basic statistics of every numeric column
//! - [`explore`]: per-column moments including skewness and kurtosis, plus
//!   the columns whose variance stands out
//!
//! Missing values are expected input, not errors: every statistic is taken
//! over the present values of its column.
//!
//! # Example
//!
//! ```
//! use insight_engine::loader::RecordLoader;
//! use insight_engine::profiling::summarize;
//!
//! let df = RecordLoader::new()
//!     .load_value(&serde_json::json!([
//!         {"x": 1, "label": "a"},
//!         {"x": 3, "label": null},
//!     ]))
//!     .unwrap();
//! let summary = summarize(&df);
//!
//! assert_eq!(summary.total_rows, 2);
//! assert_eq!(summary.numeric_columns, vec!["x"]);
//! assert_eq!(summary.categorical_columns, vec!["label"]);
//! assert_eq!(summary.basic_stats[0].1.mean, 2.0);
//! ```

use crate::dataframe::DataFrame;
use crate::error::InsightError;
use crate::stats::{self, Describe};
use tracing::debug;

// ── Data summary ──────────────────────────────────────────────────────

/// Shape and per-column overview of a table.
#[derive(Debug, Clone)]
pub struct DataSummary {
    pub total_rows: usize,
    pub total_columns: usize,
    pub numeric_columns: Vec<String>,
    /// Columns stored as generic objects (text, or booleans with gaps).
    pub categorical_columns: Vec<String>,
    /// Missing-value count of every column, in table order.
    pub missing_values: Vec<(String, usize)>,
    /// dtype label of every column, in table order.
    pub data_types: Vec<(String, &'static str)>,
    /// Statistics of every numeric column.
    pub basic_stats: Vec<(String, Describe)>,
}

/// Builds the [`DataSummary`] of a table.
pub fn summarize(df: &DataFrame) -> DataSummary {
    let mut numeric_columns = Vec::new();
    let mut categorical_columns = Vec::new();
    let mut missing_values = Vec::with_capacity(df.column_count());
    let mut data_types = Vec::with_capacity(df.column_count());
    let mut basic_stats = Vec::new();

    for (name, column) in df.iter() {
        let dtype = column.dtype_label();
        missing_values.push((name.to_string(), column.null_count()));
        data_types.push((name.to_string(), dtype));
        if dtype == "object" {
            categorical_columns.push(name.to_string());
        }
        if let Some(values) = column.valid_numeric_values() {
            basic_stats.push((name.to_string(), Describe::of(&values)));
            numeric_columns.push(name.to_string());
        }
    }

    DataSummary {
        total_rows: df.row_count(),
        total_columns: df.column_count(),
        numeric_columns,
        categorical_columns,
        missing_values,
        data_types,
        basic_stats,
    }
}

// ── Exploratory profile ───────────────────────────────────────────────

/// Moments of one numeric column.
#[derive(Debug, Clone, Copy)]
pub struct ColumnProfile {
    pub describe: Describe,
    /// Biased Fisher-Pearson skewness.
    pub skewness: f64,
    /// Biased excess kurtosis.
    pub kurtosis: f64,
}

impl ColumnProfile {
    pub fn of(values: &[f64]) -> Self {
        Self {
            describe: Describe::of(values),
            skewness: stats::skewness(values),
            kurtosis: stats::kurtosis(values),
        }
    }

    /// Sample variance, the square of the reported standard deviation.
    pub fn variance(&self) -> f64 {
        self.describe.std * self.describe.std
    }
}

/// Exploratory profile of the analysed numeric columns.
#[derive(Debug, Clone)]
pub struct ExploratoryProfile {
    /// Columns with at least one present value, in analysis order.
    pub columns: Vec<(String, ColumnProfile)>,
    pub high_variance_columns: Vec<String>,
    pub rows: usize,
    /// Number of columns that were asked for, profiled or not.
    pub analysed_columns: usize,
}

/// Factor over the mean variance above which a column counts as
/// high-variance.
pub const HIGH_VARIANCE_FACTOR: f64 = 1.5;

/// Profiles `columns` of `df`, skipping columns without present values.
pub fn explore(df: &DataFrame, columns: &[String]) -> Result<ExploratoryProfile, InsightError> {
    let mut profiles = Vec::with_capacity(columns.len());
    for name in columns {
        let values = df.numeric_values(name)?;
        if values.is_empty() {
            debug!(column = %name, "skipping column without values");
            continue;
        }
        profiles.push((name.clone(), ColumnProfile::of(&values)));
    }

    let high_variance_columns = high_variance_columns(&profiles);
    Ok(ExploratoryProfile {
        columns: profiles,
        high_variance_columns,
        rows: df.row_count(),
        analysed_columns: columns.len(),
    })
}

/// Columns whose variance exceeds [`HIGH_VARIANCE_FACTOR`] times the mean
/// variance. Columns without a finite variance take no part.
pub fn high_variance_columns(profiles: &[(String, ColumnProfile)]) -> Vec<String> {
    let finite: Vec<(&String, f64)> = profiles
        .iter()
        .map(|(name, p)| (name, p.variance()))
        .filter(|(_, v)| v.is_finite())
        .collect();
    if finite.is_empty() {
        return Vec::new();
    }
    let threshold =
        finite.iter().map(|(_, v)| v).sum::<f64>() / finite.len() as f64 * HIGH_VARIANCE_FACTOR;
    finite
        .into_iter()
        .filter(|(_, v)| *v > threshold)
        .map(|(name, _)| name.clone())
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::RecordLoader;
    use approx::assert_abs_diff_eq;
    use serde_json::json;

    fn load(value: serde_json::Value) -> DataFrame {
        RecordLoader::new().load_value(&value).unwrap()
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    // ── Summary ──────────────────────────────────────────────────

    #[test]
    fn summary_counts_and_types() {
        let df = load(json!([
            {"id": 1, "price": 2.5, "ok": true, "name": "a"},
            {"id": 2, "price": null, "ok": true, "name": "b"},
            {"id": 3, "price": 3.5, "ok": false},
        ]));
        let s = summarize(&df);
        assert_eq!(s.total_rows, 3);
        assert_eq!(s.total_columns, 4);
        assert_eq!(s.numeric_columns, names(&["id", "price"]));
        assert_eq!(s.categorical_columns, names(&["name"]));
        assert_eq!(
            s.data_types,
            vec![
                ("id".to_string(), "int64"),
                ("price".to_string(), "float64"),
                ("ok".to_string(), "bool"),
                ("name".to_string(), "object"),
            ]
        );
        assert_eq!(s.missing_values[1], ("price".to_string(), 1));
        assert_eq!(s.missing_values[3], ("name".to_string(), 1));

        let (name, price) = &s.basic_stats[1];
        assert_eq!(name, "price");
        assert_eq!(price.count, 2);
        assert_abs_diff_eq!(price.mean, 3.0);
    }

    #[test]
    fn summary_of_empty_table() {
        let s = summarize(&DataFrame::new());
        assert_eq!(s.total_rows, 0);
        assert!(s.basic_stats.is_empty());
    }

    // ── Exploratory ──────────────────────────────────────────────

    #[test]
    fn explore_moments() {
        let df = load(json!([{"v": 1}, {"v": 2}, {"v": 3}, {"v": 10}]));
        let p = explore(&df, &names(&["v"])).unwrap();
        let (_, v) = &p.columns[0];
        assert_eq!(v.describe.count, 4);
        assert_abs_diff_eq!(v.describe.median, 2.5);
        assert!(v.skewness > 0.0);
        assert_eq!(p.rows, 4);
    }

    #[test]
    fn high_variance_detection() {
        let df = load(json!([
            {"a": 1.0, "b": 1.0, "c": 100.0},
            {"a": 2.0, "b": 1.5, "c": 300.0},
            {"a": 3.0, "b": 2.0, "c": 500.0},
        ]));
        let p = explore(&df, &names(&["a", "b", "c"])).unwrap();
        assert_eq!(p.high_variance_columns, names(&["c"]));
    }

    #[test]
    fn single_value_columns_do_not_poison_threshold() {
        let df = load(json!([
            {"a": 1.0, "b": 5.0, "c": 1.0},
            {"a": 2.0, "c": 1.1},
            {"a": 30.0, "c": 1.2},
        ]));
        let p = explore(&df, &names(&["a", "b", "c"])).unwrap();
        // b has one value, so its variance is undefined and ignored.
        assert!(p.columns[1].1.variance().is_nan());
        assert_eq!(p.high_variance_columns, names(&["a"]));
    }

    #[test]
    fn explore_skips_empty_columns() {
        let df = load(json!([{"a": 1.0, "b": null}, {"a": 2.0}]));
        // "b" is all-missing, so it loads as text; only numeric columns are passed.
        let p = explore(&df, &names(&["a"])).unwrap();
        assert_eq!(p.columns.len(), 1);
        assert!(explore(&df, &names(&["b"])).is_err());
    }
}
