//! Per-subgroup performance

use super::metrics::{accuracy, binary_f1};
use crate::error::{AuditError, Result};
use crate::table::{ColumnKind, Table};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use std::collections::BTreeSet;

/// Groups with fewer rows are left out of the result
pub const MIN_GROUP_SIZE: usize = 10;

/// Metrics for the rows sharing one subgroup value
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, Deserialize)]
pub struct GroupMetrics {
    pub n: usize,
    pub accuracy: f64,
    pub f1: f64,
}

/// Subgroup value to metrics, in ascending value order.
///
/// Serialized as a JSON object whose keys keep that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubgroupResult {
    groups: Vec<(String, GroupMetrics)>,
}

impl SubgroupResult {
    pub fn get(&self, value: &str) -> Option<&GroupMetrics> {
        self.groups.iter().find(|(k, _)| k == value).map(|(_, m)| m)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Serialize for SubgroupResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (key, metrics) in &self.groups {
            map.serialize_entry(key, metrics)?;
        }
        map.end()
    }
}

/// Render a numeric subgroup key; integral values carry no fraction
fn numeric_key(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

/// Accuracy and binary F1 for every value of `column` with enough rows.
///
/// Missing values are excluded. An absent column yields an empty result.
pub fn subgroup_metrics(table: &Table, y_true: &[f64], y_pred: &[f64], column: &str) -> Result<SubgroupResult> {
    let Some(kind) = table.kind(column) else {
        return Ok(SubgroupResult::default());
    };
    if table.height() != y_true.len() || y_true.len() != y_pred.len() {
        return Err(AuditError::ShapeError {
            expected: format!("{} labels and predictions", table.height()),
            actual: format!("{} labels, {} predictions", y_true.len(), y_pred.len()),
        });
    }

    // (key, row mask) in ascending value order
    let groups: Vec<(String, Vec<bool>)> = match kind {
        ColumnKind::Numeric => {
            let values = table.numeric_values(column)?;
            // `+ 0.0` folds -0.0 into 0.0 so the key renders as "0"
            let mut distinct: Vec<f64> = values
                .iter()
                .flatten()
                .filter(|v| !v.is_nan())
                .map(|v| v + 0.0)
                .collect();
            distinct.sort_by(|a, b| a.total_cmp(b));
            distinct.dedup();
            distinct
                .into_iter()
                .map(|d| (numeric_key(d), values.iter().map(|v| *v == Some(d)).collect()))
                .collect()
        }
        ColumnKind::Categorical => {
            let values = table.text_values(column)?;
            let distinct: BTreeSet<&str> = values.iter().flatten().map(|s| s.as_str()).collect();
            distinct
                .into_iter()
                .map(|d| (d.to_string(), values.iter().map(|v| v.as_deref() == Some(d)).collect()))
                .collect()
        }
    };

    let mut result = SubgroupResult::default();
    for (key, mask) in groups {
        let (t, p): (Vec<f64>, Vec<f64>) = mask
            .iter()
            .zip(y_true.iter().zip(y_pred))
            .filter(|(m, _)| **m)
            .map(|(_, (t, p))| (*t, *p))
            .unzip();
        if t.len() < MIN_GROUP_SIZE {
            continue;
        }
        result.groups.push((
            key,
            GroupMetrics {
                n: t.len(),
                accuracy: accuracy(&t, &p),
                f1: binary_f1(&t, &p),
            },
        ));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_small_groups_skipped() {
        let mut gender = vec!["F"; 10];
        gender.extend(vec!["M"; 9]);
        let table = Table::new(df!("gender" => gender).unwrap());
        let y_true = vec![1.0; 19];
        let y_pred = vec![1.0; 19];

        let result = subgroup_metrics(&table, &y_true, &y_pred, "gender").unwrap();
        assert_eq!(result.len(), 1);
        let f = result.get("F").unwrap();
        assert_eq!(f.n, 10);
        assert_eq!(f.accuracy, 1.0);
        assert_eq!(f.f1, 1.0);
        assert!(result.get("M").is_none());
    }

    #[test]
    fn test_missing_values_excluded() {
        let mut race: Vec<Option<&str>> = vec![Some("a"); 10];
        race.extend(vec![None; 5]);
        let table = Table::new(df!("race" => race).unwrap());
        let y = vec![0.0; 15];
        let result = subgroup_metrics(&table, &y, &y, "race").unwrap();
        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(result.get("a").unwrap().n, 10);
    }

    #[test]
    fn test_numeric_keys_sorted_numerically() {
        let mut age = vec![5i64; 10];
        age.extend(vec![65; 10]);
        age.extend(vec![100; 10]);
        let table = Table::new(df!("age" => age).unwrap());
        let y = vec![1.0; 30];
        let result = subgroup_metrics(&table, &y, &y, "age").unwrap();
        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["5", "65", "100"]);

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.starts_with(r#"{"5":{"n":10"#));
    }

    #[test]
    fn test_negative_zero_joins_zero_group() {
        let mut score = vec![0.0f64; 10];
        score.extend(vec![-0.0f64; 10]);
        let table = Table::new(df!("score" => score).unwrap());
        let y = vec![1.0; 20];
        let result = subgroup_metrics(&table, &y, &y, "score").unwrap();
        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["0"]);
        assert_eq!(result.get("0").unwrap().n, 20);
    }

    #[test]
    fn test_absent_column_is_empty() {
        let table = Table::new(df!("x" => &[1.0]).unwrap());
        let result = subgroup_metrics(&table, &[1.0], &[1.0], "gender").unwrap();
        assert!(result.is_empty());
    }
}
