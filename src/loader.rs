//! Record loader with automatic type inference.
//!
//! Converts a JSON array of row objects into a column-major
//! [`DataFrame`](crate::dataframe::DataFrame). Column order is the order in
//! which keys first appear across records; a key absent from a record is a
//! missing value for that row, as is an explicit `null`.
//!
//! The inference priority is: Numeric → Boolean → Text. A column with no
//! present values at all is Text.
//!
//! # Example
//!
//! ```
//! use insight_engine::loader::RecordLoader;
//! use insight_engine::dataframe::DataType;
//!
//! let rows = serde_json::json!([
//!     {"name": "north", "units": 12, "active": true},
//!     {"name": "south", "units": 7.5, "active": false},
//! ]);
//! let df = RecordLoader::new().load_value(&rows).unwrap();
//! assert_eq!(df.row_count(), 2);
//! assert_eq!(df.column_by_name("name").unwrap().data_type(), DataType::Text);
//! assert_eq!(df.column_by_name("units").unwrap().data_type(), DataType::Numeric);
//! assert_eq!(df.column_by_name("active").unwrap().data_type(), DataType::Boolean);
//! ```

use crate::dataframe::{Column, DataFrame, DataType, ValidityBitmap};
use crate::error::InsightError;
use serde_json::{Map, Value};
use tracing::debug;

/// Record loader configuration and entry point.
#[derive(Debug, Clone, Default)]
pub struct RecordLoader {
    /// Treat the string forms `"NaN"`, `"null"` and `""` as missing.
    string_nulls: bool,
}

impl RecordLoader {
    /// Creates a loader with default settings (only JSON `null` is missing).
    pub fn new() -> Self {
        Self::default()
    }

    /// Also treats empty strings and textual null markers as missing.
    pub fn string_nulls(mut self, enabled: bool) -> Self {
        self.string_nulls = enabled;
        self
    }

    /// Parses a JSON document and loads it.
    pub fn load_str(&self, input: &str) -> Result<DataFrame, InsightError> {
        let value: Value = serde_json::from_str(input)?;
        self.load_value(&value)
    }

    /// Loads a JSON value, which must be an array of objects.
    pub fn load_value(&self, value: &Value) -> Result<DataFrame, InsightError> {
        match value {
            Value::Array(records) => self.load_records(records),
            other => Err(InsightError::InvalidInput(format!(
                "expected an array of records, got {}",
                json_kind(other)
            ))),
        }
    }

    /// Loads a slice of record objects.
    pub fn load_records(&self, records: &[Value]) -> Result<DataFrame, InsightError> {
        let mut rows: Vec<&Map<String, Value>> = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            match record {
                Value::Object(map) => rows.push(map),
                other => {
                    return Err(InsightError::InvalidInput(format!(
                        "record {i} is {}, expected an object",
                        json_kind(other)
                    )))
                }
            }
        }

        // Column order follows first appearance across records.
        let mut headers: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !headers.iter().any(|h| h == key) {
                    headers.push(key.clone());
                }
            }
        }

        let mut df = DataFrame::new();
        for name in headers {
            let cells: Vec<Option<&Value>> = rows
                .iter()
                .map(|row| row.get(&name).filter(|v| !self.is_null(v)))
                .collect();
            let column = build_column(&cells);
            debug!(column = %name, dtype = column.dtype_label(), "inferred column type");
            df.add_column(name, column)?;
        }

        Ok(df)
    }

    fn is_null(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(s) if self.string_nulls => {
                matches!(s.trim(), "" | "NaN" | "nan" | "null" | "NULL" | "None" | "NA")
            }
            _ => false,
        }
    }
}

// ── Column construction ───────────────────────────────────────────────

/// Determines the most specific type that fits all present values.
fn infer_type(cells: &[Option<&Value>]) -> DataType {
    let mut present = cells.iter().flatten().peekable();
    if present.peek().is_none() {
        return DataType::Text;
    }
    let present: Vec<&&Value> = present.collect();
    if present.iter().all(|v| v.is_number()) {
        DataType::Numeric
    } else if present.iter().all(|v| v.is_boolean()) {
        DataType::Boolean
    } else {
        DataType::Text
    }
}

fn build_column(cells: &[Option<&Value>]) -> Column {
    match infer_type(cells) {
        DataType::Numeric => build_numeric_column(cells),
        DataType::Boolean => build_boolean_column(cells),
        DataType::Text => build_text_column(cells),
    }
}

fn build_numeric_column(cells: &[Option<&Value>]) -> Column {
    let mut nums = Vec::with_capacity(cells.len());
    let mut validity = ValidityBitmap::empty();
    let mut integral = true;

    for cell in cells {
        match cell.and_then(|v| v.as_f64()) {
            Some(x) => {
                if let Some(v) = cell {
                    integral &= v.is_i64() || v.is_u64();
                }
                nums.push(x);
                validity.push(true);
            }
            None => {
                nums.push(0.0);
                validity.push(false);
            }
        }
    }

    if integral {
        Column::integer(nums, validity)
    } else {
        Column::numeric(nums, validity)
    }
}

fn build_boolean_column(cells: &[Option<&Value>]) -> Column {
    let mut bools = Vec::with_capacity(cells.len());
    let mut validity = ValidityBitmap::empty();

    for cell in cells {
        match cell.and_then(|v| v.as_bool()) {
            Some(b) => {
                bools.push(b);
                validity.push(true);
            }
            None => {
                bools.push(false);
                validity.push(false);
            }
        }
    }

    Column::boolean(bools, validity)
}

fn build_text_column(cells: &[Option<&Value>]) -> Column {
    let mut texts = Vec::with_capacity(cells.len());
    let mut validity = ValidityBitmap::empty();

    for cell in cells {
        match cell {
            Some(Value::String(s)) => {
                texts.push(s.clone());
                validity.push(true);
            }
            Some(other) => {
                texts.push(other.to_string());
                validity.push(true);
            }
            None => {
                texts.push(String::new());
                validity.push(false);
            }
        }
    }

    Column::text(texts, validity)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
