//! Column selection.
//!
//! Narrows a [`DataFrame`] to the columns an analysis should look at.
//! Restrictions that name nothing usable fall back to the whole table
//! rather than failing.

use crate::dataframe::{DataFrame, DataType};
use tracing::debug;

/// All numeric columns, in table order.
pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
    df.numeric_column_names()
}

/// Numeric columns intersected with `restriction`, in the caller's order.
///
/// Falls back to every numeric column when no restriction is given or the
/// intersection is empty. Duplicate names in the restriction are kept once.
///
/// ```
/// use insight_engine::loader::RecordLoader;
/// use insight_engine::selection::select_numeric;
///
/// let df = RecordLoader::new()
///     .load_value(&serde_json::json!([{"a": 1, "b": "x", "c": 2}]))
///     .unwrap();
/// let only_c = vec!["c".to_string(), "b".to_string()];
/// assert_eq!(select_numeric(&df, Some(only_c.as_slice())), vec!["c"]);
/// let nothing = vec!["zzz".to_string()];
/// assert_eq!(select_numeric(&df, Some(nothing.as_slice())), vec!["a", "c"]);
/// ```
pub fn select_numeric(df: &DataFrame, restriction: Option<&[String]>) -> Vec<String> {
    let all = numeric_columns(df);
    let Some(wanted) = restriction else {
        return all;
    };

    let mut picked: Vec<String> = Vec::new();
    for name in wanted {
        if all.contains(name) && !picked.contains(name) {
            picked.push(name.clone());
        }
    }

    if picked.is_empty() {
        debug!(requested = wanted.len(), "restriction matched no numeric columns, using all");
        all
    } else {
        picked
    }
}

/// Existing columns (any type) named by `restriction`, in the caller's order;
/// every column when the restriction names none that exist.
pub fn analysis_columns(df: &DataFrame, restriction: &[String]) -> Vec<String> {
    let mut picked: Vec<String> = Vec::new();
    for name in restriction {
        if df.has_column(name) && !picked.contains(name) {
            picked.push(name.clone());
        }
    }
    if picked.is_empty() {
        df.column_names().to_vec()
    } else {
        picked
    }
}

/// Numeric members of an already selected column list, keeping its order.
pub fn numeric_subset(df: &DataFrame, columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .filter(|name| {
            df.column_by_name(name)
                .is_some_and(|c| c.data_type() == DataType::Numeric)
        })
        .cloned()
        .collect()
}

/// Picks the column that stands in for time: the first whose lowercase name
/// contains `month`, `date` or `time`, otherwise the first column.
pub fn time_column(columns: &[String]) -> Option<&str> {
    columns
        .iter()
        .find(|name| {
            let lower = name.to_lowercase();
            lower.contains("month") || lower.contains("date") || lower.contains("time")
        })
        .or_else(|| columns.first())
        .map(String::as_str)
}

// ── Tests ─────────────────────────────────────────────────────────────
