//! Missing value imputation

use crate::error::{AuditError, Result};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Strategy for imputing missing values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with the median (numeric only)
    Median,
    /// Replace with the most frequent value; ties resolve to the smallest
    MostFrequent,
}

/// Fitted fill value for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeValue {
    Numeric(f64),
    Text(String),
}

/// Imputer for handling missing values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: BTreeMap<String, ImputeValue>,
    is_fitted: bool,
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: BTreeMap::new(),
            is_fitted: false,
        }
    }

    /// Learn fill values for `columns`.
    ///
    /// Columns without a single observed value get no fill value; callers
    /// check [`Imputer::fill_value`] to find them.
    pub fn fit(&mut self, table: &Table, columns: &[String]) -> Result<&mut Self> {
        for name in columns {
            let fill = match self.strategy {
                ImputeStrategy::Median => {
                    let observed: Vec<f64> = table
                        .numeric_values(name)?
                        .into_iter()
                        .flatten()
                        .filter(|v| !v.is_nan())
                        .collect();
                    median(&observed).map(ImputeValue::Numeric)
                }
                ImputeStrategy::MostFrequent => {
                    let observed: Vec<String> = table.text_values(name)?.into_iter().flatten().collect();
                    most_frequent(&observed).map(ImputeValue::Text)
                }
            };
            if let Some(fill) = fill {
                self.fill_values.insert(name.clone(), fill);
            }
        }

        self.is_fitted = true;
        Ok(self)
    }

    pub fn fill_value(&self, column: &str) -> Option<&ImputeValue> {
        self.fill_values.get(column)
    }

    /// Fill missing numeric entries of `column`
    pub fn impute_numeric(&self, column: &str, values: Vec<Option<f64>>) -> Result<Vec<f64>> {
        match self.lookup(column)? {
            ImputeValue::Numeric(fill) => Ok(values
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()).unwrap_or(*fill))
                .collect()),
            ImputeValue::Text(_) => Err(AuditError::DataError(format!(
                "column '{}' was fitted as categorical",
                column
            ))),
        }
    }

    /// Fill missing text entries of `column`
    pub fn impute_text(&self, column: &str, values: Vec<Option<String>>) -> Result<Vec<String>> {
        match self.lookup(column)? {
            ImputeValue::Text(fill) => Ok(values
                .into_iter()
                .map(|v| v.unwrap_or_else(|| fill.clone()))
                .collect()),
            ImputeValue::Numeric(_) => Err(AuditError::DataError(format!(
                "column '{}' was fitted as numeric",
                column
            ))),
        }
    }

    fn lookup(&self, column: &str) -> Result<&ImputeValue> {
        if !self.is_fitted {
            return Err(AuditError::ModelNotFitted);
        }
        self.fill_values
            .get(column)
            .ok_or_else(|| AuditError::FeatureNotFound(column.to_string()))
    }
}

/// Median of the observed values; `None` when empty
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Most frequent value; the smallest value wins a tie
pub fn most_frequent(values: &[String]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in values {
        *counts.entry(v.as_str()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|(a, ca), (b, cb)| ca.cmp(cb).then_with(|| b.cmp(a)))
        .map(|(v, _)| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_most_frequent_tie_breaks_to_smallest() {
        let values: Vec<String> = ["b", "a", "b", "a", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(most_frequent(&values), Some("a".to_string()));
    }

    #[test]
    fn test_fit_and_impute() {
        let table = Table::new(
            df!(
                "bmi" => &[Some(20.0), None, Some(30.0), Some(40.0)],
                "race" => &[Some("x"), Some("y"), None, Some("y")],
            )
            .unwrap(),
        );
        let mut numeric = Imputer::new(ImputeStrategy::Median);
        numeric.fit(&table, &["bmi".to_string()]).unwrap();
        let filled = numeric
            .impute_numeric("bmi", table.numeric_values("bmi").unwrap())
            .unwrap();
        assert_eq!(filled, vec![20.0, 30.0, 30.0, 40.0]);

        let mut text = Imputer::new(ImputeStrategy::MostFrequent);
        text.fit(&table, &["race".to_string()]).unwrap();
        let filled = text.impute_text("race", table.text_values("race").unwrap()).unwrap();
        assert_eq!(filled, vec!["x", "y", "y", "y"]);
    }

    #[test]
    fn test_all_missing_column_has_no_fill() {
        let table = Table::new(df!("empty" => &[None::<f64>, None]).unwrap());
        let mut imputer = Imputer::new(ImputeStrategy::Median);
        imputer.fit(&table, &["empty".to_string()]).unwrap();
        assert!(imputer.fill_value("empty").is_none());
    }

    #[test]
    fn test_unfitted_imputer() {
        let imputer = Imputer::new(ImputeStrategy::Median);
        assert!(matches!(
            imputer.impute_numeric("x", vec![None]),
            Err(AuditError::ModelNotFitted)
        ));
    }
}
