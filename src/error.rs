//! Error types for insight-engine.
//!
//! Errors fall into two tiers. Precondition failures (missing columns, too
//! few rows, bad parameters) are expected and are reported inline as
//! `{"error": ...}` next to the analyses that did succeed. Everything else is
//! unexpected and is reported once at the dispatch boundary as
//! `"Analysis failed: ..."`. See [`InsightError::is_precondition`].

use thiserror::Error;

/// All errors produced by insight-engine operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InsightError {
    /// The record collection was empty.
    #[error("No data provided")]
    NoData,
    /// No numeric column survived selection.
    #[error("No numeric columns found for analysis")]
    NoNumericColumns,
    /// Fewer numeric columns than the analysis needs.
    #[error("Need at least {min_required} numeric columns for {analysis}")]
    InsufficientColumns {
        analysis: String,
        min_required: usize,
        actual: usize,
    },
    /// Fewer observations than the analysis needs.
    #[error("Need at least {min_required} data points for {analysis} (got {actual})")]
    InsufficientData {
        analysis: String,
        min_required: usize,
        actual: usize,
    },
    /// The requested target column does not exist.
    #[error("Target column {name} not found")]
    TargetNotFound { name: String },
    /// The requested target column holds non-numeric values.
    #[error("Target column {name} is not numeric")]
    TargetNotNumeric { name: String },
    /// A named column does not exist.
    #[error("Column '{name}' not found")]
    ColumnNotFound { name: String },
    /// Column is not numeric where numeric data is required.
    #[error("Column '{column}' is not numeric")]
    NonNumericColumn { column: String },
    /// Regression has nothing to regress on.
    #[error("No feature columns available for regression")]
    NoFeatures,
    /// A request parameter is out of range or malformed.
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },
    /// The input could not be interpreted as a record collection.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Dimension mismatch between parallel inputs.
    #[error("expected {expected} elements, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// The data cannot support the computation (e.g. zero features).
    #[error("degenerate data: {reason}")]
    DegenerateData { reason: String },
    /// A numeric routine failed to converge or produced no result.
    #[error("{operation} failed: {detail}")]
    ComputationFailed { operation: String, detail: String },
    /// JSON decoding or encoding failed.
    #[error("JSON error: {0}")]
    Json(String),
}

impl InsightError {
    /// Returns `true` for expected failures that are reported inline rather
    /// than aborting the whole request.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NoData
                | Self::NoNumericColumns
                | Self::InsufficientColumns { .. }
                | Self::InsufficientData { .. }
                | Self::TargetNotFound { .. }
                | Self::TargetNotNumeric { .. }
                | Self::ColumnNotFound { .. }
                | Self::NonNumericColumn { .. }
                | Self::NoFeatures
                | Self::InvalidParameter { .. }
                | Self::DegenerateData { .. }
        )
    }

    pub(crate) fn insufficient_columns(analysis: &str, min_required: usize, actual: usize) -> Self {
        Self::InsufficientColumns {
            analysis: analysis.to_string(),
            min_required,
            actual,
        }
    }

    pub(crate) fn insufficient_data(analysis: &str, min_required: usize, actual: usize) -> Self {
        Self::InsufficientData {
            analysis: analysis.to_string(),
            min_required,
            actual,
        }
    }
}

impl From<serde_json::Error> for InsightError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_wire_contract() {
        assert_eq!(InsightError::NoData.to_string(), "No data provided");
        assert_eq!(
            InsightError::insufficient_columns("correlation analysis", 2, 1).to_string(),
            "Need at least 2 numeric columns for correlation analysis"
        );
        assert_eq!(
            InsightError::TargetNotFound { name: "sales".into() }.to_string(),
            "Target column sales not found"
        );
        assert_eq!(
            InsightError::TargetNotNumeric { name: "region".into() }.to_string(),
            "Target column region is not numeric"
        );
        assert_eq!(
            InsightError::NoFeatures.to_string(),
            "No feature columns available for regression"
        );
    }

    #[test]
    fn tiers() {
        assert!(InsightError::NoData.is_precondition());
        assert!(InsightError::insufficient_data("forecasting", 3, 2).is_precondition());
        assert!(!InsightError::Json("eof".into()).is_precondition());
        assert!(!InsightError::ComputationFailed {
            operation: "eigen".into(),
            detail: "no convergence".into(),
        }
        .is_precondition());
    }
}
