//! `insight-engine` command line.
//!
//! ```text
//! insight-engine [OPTIONS] <DATA> <REQUEST> [COLUMNS]
//! ```
//!
//! With two arguments `REQUEST` is a configuration object; with three it is
//! an analysis type and `COLUMNS` a JSON array of column names. Standard
//! output always carries exactly one JSON object.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use insight_engine::config::EngineSettings;
use insight_engine::engine::{run_config_request, run_insight_request};
use insight_engine::report::{to_json, ErrorReport};
use serde_json::Value;
use std::io::Read;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const USAGE_ERROR: &str = "Invalid arguments. Expected: <data_json> <analysis_config> \
                           or <data_json> <analysis_type> <selected_columns>";

#[derive(Parser, Debug)]
#[command(
    name = "insight-engine",
    version,
    about = "Statistical analysis of JSON records with structured insight output"
)]
struct Cli {
    /// Seed for random forest bootstrap and k-means++ seeding
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Print single-line JSON
    #[arg(long)]
    compact: bool,

    /// JSON array of records, or `-` to read it from standard input
    data: String,

    /// Configuration object, or an analysis type when COLUMNS is given
    request: String,

    /// JSON array of column names to analyse
    columns: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            tracing::debug!(error = %e, "argument parsing failed");
            emit_error(USAGE_ERROR, false);
            return ExitCode::FAILURE;
        }
    };

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::warn!(error = %e, "request rejected");
            emit_error(&format!("{e:#}"), cli.compact);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let data_text = read_data(&cli.data)?;
    let data: Value = serde_json::from_str(&data_text).context("Invalid data JSON")?;
    let settings = EngineSettings::default().seed(cli.seed).compact(cli.compact);

    let (response, strict) = match &cli.columns {
        None => (run_config_request(&data, &cli.request, &settings), false),
        Some(columns) => {
            let columns: Vec<String> = serde_json::from_str(columns)
                .context("Invalid columns JSON: expected an array of column names")?;
            let analysis_type = analysis_type(&cli.request);
            (run_insight_request(&data, &analysis_type, columns, &settings), true)
        }
    };

    println!("{}", response.to_json(settings.compact)?);
    if strict && response.is_error() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn read_data(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read data from standard input")?;
    Ok(text)
}

/// Accepts `pca_clustering` as well as the JSON literal `"pca_clustering"`.
fn analysis_type(arg: &str) -> String {
    match serde_json::from_str::<Value>(arg) {
        Ok(Value::String(s)) => s,
        _ => arg.to_string(),
    }
}

fn emit_error(message: &str, compact: bool) {
    let report = ErrorReport::new(message);
    match to_json(&report, compact) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{{\"error\": {message:?}}}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_type_accepts_json_literal() {
        assert_eq!(analysis_type("pca_clustering"), "pca_clustering");
        assert_eq!(analysis_type("\"time_series\""), "time_series");
        assert_eq!(analysis_type("42"), "42");
    }

    #[test]
    fn cli_shapes() {
        let cli = Cli::try_parse_from(["insight-engine", "[]", "{}"]).unwrap();
        assert_eq!(cli.seed, 42);
        assert!(cli.columns.is_none());

        let cli = Cli::try_parse_from([
            "insight-engine",
            "--seed",
            "7",
            "--compact",
            "-",
            "exploratory",
            "[\"a\"]",
        ])
        .unwrap();
        assert_eq!(cli.seed, 7);
        assert!(cli.compact);
        assert_eq!(cli.data, "-");

        assert!(Cli::try_parse_from(["insight-engine", "[]"]).is_err());
        assert!(Cli::try_parse_from(["insight-engine", "a", "b", "c", "d"]).is_err());
    }

    #[test]
    fn inline_data_is_passed_through() {
        assert_eq!(read_data("[{\"a\": 1}]").unwrap(), "[{\"a\": 1}]");
    }
}
