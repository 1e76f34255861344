//! Typed tabular data
//!
//! A [`Table`] wraps a polars [`DataFrame`] and exposes every column through
//! an explicit [`ColumnKind`] derived from its dtype. All pipeline stages read
//! and write columns through this type so that dtype handling lives in one
//! place.

use crate::error::{AuditError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Declared kind of a column, derived from its polars dtype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Integer or floating point values
    Numeric,
    /// Everything else: strings, booleans, categoricals
    Categorical,
}

impl ColumnKind {
    /// Classify a polars dtype
    pub fn from_dtype(dtype: &DataType) -> Self {
        if is_numeric_dtype(dtype) {
            ColumnKind::Numeric
        } else {
            ColumnKind::Categorical
        }
    }
}

/// Check if dtype is numeric
pub(crate) fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Name and kind of one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub kind: ColumnKind,
}

/// An in-memory table with uniquely named, typed columns
#[derive(Debug, Clone)]
pub struct Table {
    frame: DataFrame,
}

impl Table {
    /// Wrap a data frame
    pub fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    /// Borrow the underlying frame
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Consume the table and return the underlying frame
    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.frame.width()
    }

    /// Column names in table order
    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    /// Kind of the named column, if present
    pub fn kind(&self, name: &str) -> Option<ColumnKind> {
        self.frame
            .column(name)
            .ok()
            .map(|c| ColumnKind::from_dtype(c.dtype()))
    }

    /// Whether the named column holds strings
    pub fn is_text(&self, name: &str) -> bool {
        self.frame
            .column(name)
            .map(|c| c.dtype() == &DataType::String)
            .unwrap_or(false)
    }

    /// Schema of every column in table order
    pub fn schema(&self) -> Vec<ColumnSchema> {
        self.frame
            .get_columns()
            .iter()
            .map(|c| ColumnSchema {
                name: c.name().to_string(),
                kind: ColumnKind::from_dtype(c.dtype()),
            })
            .collect()
    }

    fn series(&self, name: &str) -> Result<&Series> {
        self.frame
            .column(name)
            .map(|c| c.as_materialized_series())
            .map_err(|_| AuditError::FeatureNotFound(name.to_string()))
    }

    /// Values of a column cast to `f64`; unparsable or missing entries are `None`
    pub fn numeric_values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let series = self.series(name)?.cast(&DataType::Float64)?;
        Ok(series.f64()?.into_iter().collect())
    }

    /// Values of a column rendered as text; missing entries are `None`
    pub fn text_values(&self, name: &str) -> Result<Vec<Option<String>>> {
        let series = self.series(name)?.cast(&DataType::String)?;
        Ok(series
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect())
    }

    /// Insert or replace a float column
    pub fn set_numeric(&mut self, name: &str, values: Vec<Option<f64>>) -> Result<()> {
        self.check_len(name, values.len())?;
        self.frame.with_column(Series::new(name.into(), values))?;
        Ok(())
    }

    /// Insert or replace an integer column
    pub fn set_integer(&mut self, name: &str, values: Vec<i64>) -> Result<()> {
        self.check_len(name, values.len())?;
        self.frame.with_column(Series::new(name.into(), values))?;
        Ok(())
    }

    /// Insert or replace a text column
    pub fn set_text(&mut self, name: &str, values: Vec<Option<String>>) -> Result<()> {
        self.check_len(name, values.len())?;
        self.frame.with_column(Series::new(name.into(), values))?;
        Ok(())
    }

    fn check_len(&self, name: &str, len: usize) -> Result<()> {
        if self.frame.width() > 0 && len != self.frame.height() {
            return Err(AuditError::ShapeError {
                expected: format!("{} rows for column '{}'", self.frame.height(), name),
                actual: format!("{} rows", len),
            });
        }
        Ok(())
    }

    /// Drop the named columns; names that are not present are ignored
    pub fn drop_columns(&mut self, names: &[String]) -> Result<()> {
        for name in names {
            if self.has_column(name) {
                self.frame = self.frame.drop(name)?;
            }
        }
        Ok(())
    }

    /// Copy of the table without one column
    pub fn without_column(&self, name: &str) -> Result<Table> {
        Ok(Table::new(self.frame.drop(name)?))
    }

    /// Copy of the table with only the named columns that are present
    pub fn select_present(&self, names: &[String]) -> Result<Table> {
        let present: Vec<&str> = names
            .iter()
            .map(|s| s.as_str())
            .filter(|s| self.has_column(s))
            .collect();
        Ok(Table::new(self.frame.select(present)?))
    }

    /// Copy of the table restricted to the given row indices, in that order
    pub fn take_rows(&self, indices: &[usize]) -> Result<Table> {
        let idx: Vec<IdxSize> = indices.iter().map(|&i| i as IdxSize).collect();
        let idx = IdxCa::from_vec("idx".into(), idx);
        Ok(Table::new(self.frame.take(&idx)?))
    }
}

impl From<DataFrame> for Table {
    fn from(frame: DataFrame) -> Self {
        Table::new(frame)
    }
}
