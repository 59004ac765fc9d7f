//! End-to-end checks of the request/response contract.

use approx::assert_abs_diff_eq;
use insight_engine::config::EngineSettings;
use insight_engine::engine::{run_config_request, run_insight_request, Response};
use proptest::prelude::*;
use serde_json::{json, Value};

fn config(data: &Value, request: Value) -> Value {
    let response = run_config_request(data, &request.to_string(), &EngineSettings::default());
    serde_json::to_value(&response).unwrap()
}

fn insight(data: &Value, analysis_type: &str, columns: &[&str]) -> (Response, Value) {
    let columns = columns.iter().map(|c| c.to_string()).collect();
    let response = run_insight_request(data, analysis_type, columns, &EngineSettings::default());
    let value = serde_json::to_value(&response).unwrap();
    (response, value)
}

fn linear_table(n: usize) -> Value {
    Value::Array(
        (0..n)
            .map(|i| {
                let x = i as f64;
                json!({"x": x, "y": 2.0 * x + 1.0, "noise": ((i * 7) % 5) as f64})
            })
            .collect(),
    )
}

fn keys(v: &Value) -> Vec<&str> {
    v.as_object()
        .map(|o| o.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

// ── Input handling ────────────────────────────────────────────────────

#[test]
fn empty_input_is_rejected() {
    let out = config(&json!([]), json!({"type": "correlation"}));
    assert_eq!(out, json!({"error": "No data provided"}));

    let (response, out) = insight(&json!([]), "exploratory", &[]);
    assert!(response.is_error());
    assert_eq!(out, json!({"error": "No data provided"}));
}

#[test]
fn non_array_input_fails() {
    let out = config(&json!({"x": 1}), json!({}));
    assert!(out["error"].as_str().unwrap().starts_with("Analysis failed: "));
}

#[test]
fn summary_is_the_default() {
    let out = config(&linear_table(4), json!({}));
    assert_eq!(keys(&out), vec!["data_summary", "analyses"]);
    assert_eq!(out["analyses"], json!({}));
    assert_eq!(out["data_summary"]["total_rows"], json!(4));
    assert_eq!(keys(&out["data_summary"]["basic_stats"]), vec!["x", "y", "noise"]);
}

#[test]
fn unknown_type_gives_empty_analyses() {
    let out = config(&linear_table(4), json!({"type": "sentiment"}));
    assert_eq!(out["analyses"], json!({}));
}

#[test]
fn null_type_is_a_summary() {
    let out = config(&linear_table(4), json!({"type": null}));
    assert_eq!(keys(&out), vec!["data_summary", "analyses"]);
    assert_eq!(out["analyses"], json!({}));
}

// ── Configuration analyses ────────────────────────────────────────────

#[test]
fn perfect_correlation_is_strong() {
    let data = json!([{"x": 1, "y": 2}, {"x": 2, "y": 4}, {"x": 3, "y": 6}]);
    let out = config(&data, json!({"type": "correlation"}));
    let corr = &out["analyses"]["correlation"];
    let top = &corr["top_correlations"][0];
    assert_abs_diff_eq!(top["correlation"].as_f64().unwrap(), 1.0, epsilon = 1e-12);
    assert_eq!(top["strength"], "Strong");
    assert_eq!(corr["correlation_matrix"]["x"]["x"], json!(1.0));
}

#[test]
fn one_numeric_column_is_an_inline_error() {
    let data = json!([{"x": 1, "name": "a"}, {"x": 2, "name": "b"}, {"x": 3, "name": "c"}]);
    let out = config(&data, json!({"type": "correlation"}));
    assert_eq!(
        out["analyses"]["correlation"]["error"],
        "Need at least 2 numeric columns for correlation analysis"
    );
    let out = config(&data, json!({"type": "clustering"}));
    assert_eq!(
        out["analyses"]["clustering"]["error"],
        "Need at least 2 numeric columns for clustering"
    );
    // the summary is still produced
    assert_eq!(out["data_summary"]["numeric_columns"], json!(["x"]));
}

#[test]
fn noiseless_regression_explains_everything() {
    let data = json!((0..20).map(|i| json!({"x": i, "y": 3 * i + 2})).collect::<Vec<_>>());
    let out = config(&data, json!({"type": "regression", "target_column": "y"}));
    let reg = &out["analyses"]["regression"];
    assert_abs_diff_eq!(reg["linear_regression_r2"].as_f64().unwrap(), 1.0, epsilon = 1e-9);
    let forest = reg["random_forest_r2"].as_f64().unwrap();
    assert!(forest > 0.9 && forest <= 1.0);
    assert_eq!(reg["model_comparison"], "Linear Regression");
    assert_eq!(reg["top_drivers"], json!([["x", 1.0]]));
    assert_abs_diff_eq!(reg["linear_coefficients"]["x"].as_f64().unwrap(), 3.0, epsilon = 1e-9);
}

#[test]
fn regression_target_problems() {
    let data = linear_table(6);
    let out = config(&data, json!({"type": "regression", "target_column": "nope"}));
    assert_eq!(out["analyses"]["regression"]["error"], "Target column nope not found");

    let out = config(&data, json!({"type": "regression"}));
    assert_eq!(
        out,
        json!({"error": "Analysis failed: Invalid input: missing required parameter 'target_column'"})
    );
}

#[test]
fn cluster_percentages_sum_to_100() {
    let out = config(&linear_table(12), json!({"type": "clustering", "n_clusters": 3}));
    let clustering = &out["analyses"]["clustering"];
    assert_eq!(clustering["n_clusters"], json!(3));
    assert_eq!(clustering["cluster_assignments"].as_array().unwrap().len(), 12);
    let total: f64 = clustering["cluster_summary"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["percentage"].as_f64().unwrap())
        .sum();
    assert_abs_diff_eq!(total, 100.0, epsilon = 1e-9);
}

#[test]
fn forecast_band_is_symmetric() {
    let data = json!([
        {"sales": 10.0}, {"sales": 14.0}, {"sales": 11.0},
        {"sales": 17.0}, {"sales": 15.0}, {"sales": 20.0},
    ]);
    let out = config(&data, json!({"type": "forecast", "target_column": "sales", "periods": 4}));
    let f = &out["analyses"]["forecast"];
    assert_eq!(f["periods_forecasted"], json!(4));
    assert_eq!(f["trend_direction"], "increasing");
    let floats = |key: &str| -> Vec<f64> {
        f[key].as_array().unwrap().iter().map(|v| v.as_f64().unwrap()).collect()
    };
    let (mid, upper, lower) = (floats("forecast"), floats("forecast_upper"), floats("forecast_lower"));
    assert_eq!(mid.len(), 4);
    for i in 0..4 {
        assert_abs_diff_eq!(upper[i] - mid[i], mid[i] - lower[i], epsilon = 1e-9);
    }
}

#[test]
fn oversized_forecast_horizon_is_an_inline_error() {
    let data = linear_table(6);
    let out = config(
        &data,
        json!({"type": "forecast", "target_column": "y", "periods": 1_000_000_000_000u64}),
    );
    let error = out["analyses"]["forecast"]["error"].as_str().unwrap();
    assert!(error.starts_with("Invalid parameter 'periods'"), "{error}");
    assert_eq!(out["data_summary"]["total_rows"], json!(6));
}

#[test]
fn statistical_test_errors_are_inline() {
    let data = linear_table(6);
    let out = config(
        &data,
        json!({"type": "statistical_tests", "test_type": "ttest", "variables": ["x", "missing"]}),
    );
    assert_eq!(out["analyses"]["statistical_tests"]["error"], "Column 'missing' not found");

    let out = config(
        &data,
        json!({"type": "statistical_tests", "test_type": "anova", "variables": ["x", "y", "noise"]}),
    );
    let test = &out["analyses"]["statistical_tests"];
    assert_eq!(test["test_type"], "One-Way ANOVA");
    assert!(test["significant"].is_boolean());
}

#[test]
fn comprehensive_batch() {
    let out = config(&linear_table(10), json!({"type": "comprehensive"}));
    assert_eq!(keys(&out["analyses"]), vec!["correlation", "regression", "clustering"]);
    assert_eq!(out["analyses"]["regression"]["target_column"], "x");
}

// ── Insight analyses ──────────────────────────────────────────────────

#[test]
fn insight_document_layout() {
    let (response, out) = insight(&linear_table(8), "statistical_tests", &["x", "y", "noise"]);
    assert!(!response.is_error());
    assert_eq!(
        keys(&out),
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
    assert_eq!(out["success"], json!(true));
    assert_eq!(out["data_points_analyzed"], json!(8));
    assert!(out["statistics"]["correlation_tests"]["x_vs_y"]["significant"]
        .as_bool()
        .unwrap());
}

#[test]
fn insight_without_numeric_columns() {
    let data = json!([{"name": "a"}, {"name": "b"}]);
    let (response, out) = insight(&data, "exploratory", &["name"]);
    assert!(response.is_error());
    assert_eq!(out, json!({"error": "No numeric columns found for analysis"}));
}

#[test]
fn time_series_insight() {
    let data = json!((1..=12)
        .map(|m| json!({"month": m, "revenue": 100 + 5 * m}))
        .collect::<Vec<_>>());
    let (_, out) = insight(&data, "time_series_forecast", &["month", "revenue"]);
    let revenue = &out["insights"]["revenue"];
    assert_eq!(revenue["trend_direction"], "increasing");
    assert_eq!(revenue["trend_strength"], "strong");
    assert_abs_diff_eq!(revenue["forecast_next_period"].as_f64().unwrap(), 165.0, epsilon = 1e-9);
    assert!(out["statistics"].get("month").is_none());
}

#[test]
fn pca_clustering_insight() {
    let (_, out) = insight(&linear_table(10), "pca_clustering", &[]);
    let k = out["statistics"]["optimal_clusters"].as_u64().unwrap() as usize;
    assert_eq!(out["statistics"]["cluster_statistics"].as_object().unwrap().len(), k);
    assert_eq!(out["insights"]["natural_groupings"], json!(k));
}

// ── Invariants ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn correlation_matrix_is_symmetric(
        rows in prop::collection::vec((-100.0f64..100.0, -100.0f64..100.0, -100.0f64..100.0), 3..20)
    ) {
        let data = Value::Array(
            rows.iter().map(|(a, b, c)| json!({"a": a, "b": b, "c": c})).collect(),
        );
        let out = config(&data, json!({"type": "correlation"}));
        let m = &out["analyses"]["correlation"]["correlation_matrix"];
        for i in ["a", "b", "c"] {
            prop_assert_eq!(&m[i][i], &json!(1.0));
            for j in ["a", "b", "c"] {
                prop_assert_eq!(&m[i][j], &m[j][i]);
            }
        }
    }
}
