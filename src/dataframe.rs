//! Column-major table for record data.
//!
//! The [`DataFrame`] stores data in column-major order with typed columns
//! and a compact validity bitmap for tracking missing values.
//!
//! # Column Types
//!
//! | Type | Storage | Source values |
//! |------|---------|---------------|
//! | [`Numeric`](Column::Numeric) | `Vec<f64>` + bitmap | JSON numbers |
//! | [`Boolean`](Column::Boolean) | `Vec<bool>` + bitmap | JSON booleans |
//! | [`Text`](Column::Text) | `Vec<String>` + bitmap | strings, mixed or nested values |
//!
//! # Example
//!
//! ```
//! use insight_engine::dataframe::{DataFrame, Column, ValidityBitmap};
//!
//! let mut df = DataFrame::new();
//! df.add_column(
//!     "revenue".to_string(),
//!     Column::numeric(vec![20.5, 21.3, 19.8], ValidityBitmap::all_valid(3)),
//! ).unwrap();
//! assert_eq!(df.row_count(), 3);
//! assert_eq!(df.numeric_column_names(), vec!["revenue".to_string()]);
//! ```

use crate::error::InsightError;

// ── ValidityBitmap ────────────────────────────────────────────────────

/// Bit-packed validity bitmap using `Vec<u64>`.
///
/// Each bit indicates whether the corresponding row is valid (1) or
/// missing (0).
#[derive(Debug, Clone, PartialEq)]
pub struct ValidityBitmap {
    bits: Vec<u64>,
    len: usize,
}

impl ValidityBitmap {
    /// Creates a bitmap where all `len` positions are valid.
    pub fn all_valid(len: usize) -> Self {
        let n_words = len.div_ceil(64);
        let mut bits = vec![u64::MAX; n_words];
        let trailing = len % 64;
        if trailing != 0 && n_words > 0 {
            bits[n_words - 1] = (1u64 << trailing) - 1;
        }
        Self { bits, len }
    }

    /// Creates an empty bitmap with no rows.
    pub fn empty() -> Self {
        Self {
            bits: Vec::new(),
            len: 0,
        }
    }

    /// Returns `true` if the value at `idx` is present.
    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len, "index {idx} out of bounds (len={})", self.len);
        let (word, bit) = (idx / 64, idx % 64);
        (self.bits[word] >> bit) & 1 == 1
    }

    /// Marks position `idx` as missing.
    #[inline]
    pub fn set_invalid(&mut self, idx: usize) {
        debug_assert!(idx < self.len, "index {idx} out of bounds (len={})", self.len);
        let (word, bit) = (idx / 64, idx % 64);
        self.bits[word] &= !(1u64 << bit);
    }

    /// Appends a new position (present or missing).
    pub fn push(&mut self, valid: bool) {
        let idx = self.len;
        self.len += 1;
        let (word, bit) = (idx / 64, idx % 64);
        if word >= self.bits.len() {
            self.bits.push(0);
        }
        if valid {
            self.bits[word] |= 1u64 << bit;
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Counts the missing positions.
    pub fn null_count(&self) -> usize {
        let valid_count: usize = self.bits.iter().map(|w| w.count_ones() as usize).sum();
        self.len - valid_count
    }

    /// Counts the present positions.
    pub fn valid_count(&self) -> usize {
        self.len - self.null_count()
    }

    /// Returns an iterator over indices of present positions.
    pub fn valid_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.is_valid(i))
    }
}

// ── DataType ──────────────────────────────────────────────────────────

/// Semantic data type inferred for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Numeric,
    Boolean,
    Text,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric => write!(f, "Numeric"),
            Self::Boolean => write!(f, "Boolean"),
            Self::Text => write!(f, "Text"),
        }
    }
}

// ── Column ────────────────────────────────────────────────────────────

/// A typed column with validity bitmap for missing values.
///
/// Missing positions hold a placeholder (`0.0`, `false`, empty string) that
/// must be ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Dense `f64` values. `integral` is true when every value was supplied
    /// as an integer literal.
    Numeric {
        values: Vec<f64>,
        validity: ValidityBitmap,
        integral: bool,
    },
    Boolean {
        values: Vec<bool>,
        validity: ValidityBitmap,
    },
    Text {
        values: Vec<String>,
        validity: ValidityBitmap,
    },
}

impl Column {
    /// Creates a floating-point numeric column.
    pub fn numeric(values: Vec<f64>, validity: ValidityBitmap) -> Self {
        Self::Numeric {
            values,
            validity,
            integral: false,
        }
    }

    /// Creates a numeric column whose values were all integer literals.
    pub fn integer(values: Vec<f64>, validity: ValidityBitmap) -> Self {
        Self::Numeric {
            values,
            validity,
            integral: true,
        }
    }

    pub fn boolean(values: Vec<bool>, validity: ValidityBitmap) -> Self {
        Self::Boolean { values, validity }
    }

    pub fn text(values: Vec<String>, validity: ValidityBitmap) -> Self {
        Self::Text { values, validity }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Self::Numeric { .. } => DataType::Numeric,
            Self::Boolean { .. } => DataType::Boolean,
            Self::Text { .. } => DataType::Text,
        }
    }

    /// Storage label in the vocabulary analysts expect from dataframe tools:
    /// `int64`, `float64`, `bool` or `object`.
    pub fn dtype_label(&self) -> &'static str {
        match self {
            Self::Numeric {
                validity, integral, ..
            } => {
                if *integral && validity.null_count() == 0 {
                    "int64"
                } else {
                    "float64"
                }
            }
            Self::Boolean { validity, .. } => {
                if validity.null_count() == 0 {
                    "bool"
                } else {
                    "object"
                }
            }
            Self::Text { .. } => "object",
        }
    }

    pub fn len(&self) -> usize {
        self.validity().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validity(&self) -> &ValidityBitmap {
        match self {
            Self::Numeric { validity, .. }
            | Self::Boolean { validity, .. }
            | Self::Text { validity, .. } => validity,
        }
    }

    pub fn null_count(&self) -> usize {
        self.validity().null_count()
    }

    pub fn valid_count(&self) -> usize {
        self.validity().valid_count()
    }

    pub fn is_valid(&self, idx: usize) -> bool {
        self.validity().is_valid(idx)
    }

    /// Returns the numeric value at `idx`, or `None` if missing or not numeric.
    pub fn numeric_at(&self, idx: usize) -> Option<f64> {
        match self {
            Self::Numeric {
                values, validity, ..
            } if validity.is_valid(idx) => Some(values[idx]),
            _ => None,
        }
    }

    /// Returns present numeric values (missing excluded), in row order.
    pub fn valid_numeric_values(&self) -> Option<Vec<f64>> {
        match self {
            Self::Numeric {
                values, validity, ..
            } => Some(validity.valid_indices().map(|i| values[i]).collect()),
            _ => None,
        }
    }

    /// Returns every row as `Some(value)` or `None` when missing.
    pub fn numeric_options(&self) -> Option<Vec<Option<f64>>> {
        match self {
            Self::Numeric { .. } => Some((0..self.len()).map(|i| self.numeric_at(i)).collect()),
            _ => None,
        }
    }

    /// Returns the column with missing values replaced by the mean of the
    /// present ones. An all-missing column imputes to `0.0`.
    pub fn mean_imputed(&self) -> Option<Vec<f64>> {
        let present = self.valid_numeric_values()?;
        let fill = if present.is_empty() {
            0.0
        } else {
            present.iter().sum::<f64>() / present.len() as f64
        };
        Some(
            (0..self.len())
                .map(|i| self.numeric_at(i).unwrap_or(fill))
                .collect(),
        )
    }
}

// ── DataFrame ─────────────────────────────────────────────────────────

/// Column-major tabular data structure.
///
/// Stores named columns of typed data. All columns have the same number of
/// rows; column order is the order in which columns were added.
#[derive(Debug, Clone)]
pub struct DataFrame {
    names: Vec<String>,
    columns: Vec<Column>,
    row_count: usize,
}

impl DataFrame {
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            columns: Vec::new(),
            row_count: 0,
        }
    }

    /// Adds a named column.
    ///
    /// Returns an error if the column length doesn't match the existing
    /// row count (unless this is the first column).
    pub fn add_column(&mut self, name: String, column: Column) -> Result<(), InsightError> {
        let col_len = column.len();
        if self.columns.is_empty() {
            self.row_count = col_len;
        } else if col_len != self.row_count {
            return Err(InsightError::DimensionMismatch {
                expected: self.row_count,
                actual: col_len,
            });
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Returns an iterator over (name, column) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(|s| s.as_str()).zip(self.columns.iter())
    }

    /// Names of numeric columns, in table order.
    pub fn numeric_column_names(&self) -> Vec<String> {
        self.iter()
            .filter(|(_, c)| c.data_type() == DataType::Numeric)
            .map(|(n, _)| n.to_string())
            .collect()
    }

    /// Present values of a numeric column.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<f64>, InsightError> {
        let column = self.column_by_name(name).ok_or_else(|| InsightError::ColumnNotFound {
            name: name.to_string(),
        })?;
        column
            .valid_numeric_values()
            .ok_or_else(|| InsightError::NonNumericColumn {
                column: name.to_string(),
            })
    }

    /// Mean-imputed values of each named numeric column (column-major).
    pub fn imputed_columns(&self, names: &[String]) -> Result<Vec<Vec<f64>>, InsightError> {
        names
            .iter()
            .map(|name| {
                let column =
                    self.column_by_name(name)
                        .ok_or_else(|| InsightError::ColumnNotFound {
                            name: name.clone(),
                        })?;
                column
                    .mean_imputed()
                    .ok_or_else(|| InsightError::NonNumericColumn {
                        column: name.clone(),
                    })
            })
            .collect()
    }

    /// Rows in which every named numeric column is present, as row-major
    /// points, together with their original row indices.
    pub fn complete_rows(&self, names: &[String]) -> Result<(Vec<usize>, Vec<Vec<f64>>), InsightError> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let column = self
                .column_by_name(name)
                .ok_or_else(|| InsightError::ColumnNotFound { name: name.clone() })?;
            if column.data_type() != DataType::Numeric {
                return Err(InsightError::NonNumericColumn {
                    column: name.clone(),
                });
            }
            columns.push(column);
        }

        let mut indices = Vec::new();
        let mut rows = Vec::new();
        for i in 0..self.row_count {
            let row: Option<Vec<f64>> = columns.iter().map(|c| c.numeric_at(i)).collect();
            if let Some(row) = row {
                indices.push(i);
                rows.push(row);
            }
        }
        Ok((indices, rows))
    }
}

impl Default for DataFrame {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn with_gaps(values: Vec<f64>, missing: &[usize]) -> Column {
        let mut validity = ValidityBitmap::all_valid(values.len());
        for &i in missing {
            validity.set_invalid(i);
        }
        Column::numeric(values, validity)
    }

    #[test]
    fn bitmap_push_across_word_boundary() {
        let mut bm = ValidityBitmap::empty();
        for i in 0..130 {
            bm.push(i % 3 != 0);
        }
        assert_eq!(bm.len(), 130);
        let expected_nulls = (0..130).filter(|i| i % 3 == 0).count();
        assert_eq!(bm.null_count(), expected_nulls);
        assert!(bm.is_valid(128));
        assert!(!bm.is_valid(129));
    }

    #[test]
    fn bitmap_valid_indices() {
        let mut bm = ValidityBitmap::all_valid(5);
        bm.set_invalid(1);
        bm.set_invalid(3);
        let indices: Vec<usize> = bm.valid_indices().collect();
        assert_eq!(indices, vec![0, 2, 4]);
    }

    #[test]
    fn mean_imputation_fills_gaps() {
        let col = with_gaps(vec![1.0, 0.0, 3.0, 0.0], &[1, 3]);
        assert_eq!(col.valid_numeric_values(), Some(vec![1.0, 3.0]));
        assert_eq!(col.mean_imputed(), Some(vec![1.0, 2.0, 3.0, 2.0]));
    }

    #[test]
    fn dtype_labels() {
        let ints = Column::integer(vec![1.0, 2.0], ValidityBitmap::all_valid(2));
        assert_eq!(ints.dtype_label(), "int64");
        let gappy_ints = Column::Numeric {
            values: vec![1.0, 0.0],
            validity: {
                let mut v = ValidityBitmap::all_valid(2);
                v.set_invalid(1);
                v
            },
            integral: true,
        };
        assert_eq!(gappy_ints.dtype_label(), "float64");
        let text = Column::text(vec!["a".into()], ValidityBitmap::all_valid(1));
        assert_eq!(text.dtype_label(), "object");
    }

    #[test]
    fn column_length_mismatch() {
        let mut df = DataFrame::new();
        df.add_column(
            "x".to_string(),
            Column::numeric(vec![1.0, 2.0], ValidityBitmap::all_valid(2)),
        )
        .unwrap();

        let result = df.add_column(
            "y".to_string(),
            Column::numeric(vec![1.0, 2.0, 3.0], ValidityBitmap::all_valid(3)),
        );
        assert!(matches!(result, Err(InsightError::DimensionMismatch { .. })));
    }

    #[test]
    fn complete_rows_skip_gaps() {
        let mut df = DataFrame::new();
        df.add_column("a".into(), with_gaps(vec![1.0, 2.0, 3.0], &[1]))
            .unwrap();
        df.add_column("b".into(), with_gaps(vec![4.0, 5.0, 6.0], &[2]))
            .unwrap();
        let (idx, rows) = df
            .complete_rows(&["a".to_string(), "b".to_string()])
            .unwrap();
        assert_eq!(idx, vec![0]);
        assert_eq!(rows, vec![vec![1.0, 4.0]]);
    }

    #[test]
    fn numeric_lookup_errors() {
        let mut df = DataFrame::new();
        df.add_column(
            "label".into(),
            Column::text(vec!["a".into()], ValidityBitmap::all_valid(1)),
        )
        .unwrap();
        assert!(matches!(
            df.numeric_values("label"),
            Err(InsightError::NonNumericColumn { .. })
        ));
        assert!(matches!(
            df.numeric_values("nope"),
            Err(InsightError::ColumnNotFound { .. })
        ));
    }
}
