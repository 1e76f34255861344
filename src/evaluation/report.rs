//! Evaluation report over persisted predictions

use super::metrics::{classification_metrics, distinct_labels, MetricSet};
use super::subgroup::{subgroup_metrics, SubgroupResult};
use super::threshold::{tune_threshold_for, TuningMetric};
use crate::config::EvaluationSection;
use crate::error::{AuditError, Result};
use crate::table::Table;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const Y_TRUE_COLUMN: &str = "y_true";
pub const Y_PRED_COLUMN: &str = "y_pred";
pub const Y_PROB_COLUMN: &str = "y_prob";

/// How the report is built
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOptions {
    pub threshold_metric: TuningMetric,
    pub threshold_step: f64,
    /// Demographic columns to slice on when present in the prediction table
    pub subgroup_columns: Vec<String>,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            threshold_metric: TuningMetric::F1,
            threshold_step: 0.01,
            subgroup_columns: vec!["gender".to_string(), "race".to_string(), "age".to_string()],
        }
    }
}

impl EvaluationOptions {
    pub fn from_section(section: &EvaluationSection) -> Result<Self> {
        Ok(Self {
            threshold_metric: section.threshold_metric.parse()?,
            threshold_step: section.threshold_step,
            subgroup_columns: section.subgroup_columns.clone(),
        })
    }
}

/// `{metrics, subgroups}` as written to the report file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub metrics: MetricSet,
    pub subgroups: BTreeMap<String, SubgroupResult>,
}

fn required_labels(table: &Table, column: &str) -> Result<Vec<f64>> {
    if !table.has_column(column) {
        return Err(AuditError::FeatureNotFound(column.to_string()));
    }
    table
        .numeric_values(column)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.filter(|x| !x.is_nan()).ok_or_else(|| {
                AuditError::DataError(format!("'{}' is missing at row {}", column, row))
            })
        })
        .collect()
}

/// Score predictions against the true labels.
///
/// Threshold tuning runs only when probabilities are present and the true
/// labels take exactly two values.
pub fn evaluate(y_true: &Table, predictions: &Table, options: &EvaluationOptions) -> Result<EvaluationReport> {
    let truth = required_labels(y_true, Y_TRUE_COLUMN)?;
    let pred = required_labels(predictions, Y_PRED_COLUMN)?;
    let prob = if predictions.has_column(Y_PROB_COLUMN) {
        Some(required_labels(predictions, Y_PROB_COLUMN)?)
    } else {
        None
    };

    if truth.len() != pred.len() {
        return Err(AuditError::ShapeError {
            expected: format!("{} predictions", truth.len()),
            actual: format!("{} predictions", pred.len()),
        });
    }

    let mut metrics = classification_metrics(&truth, &pred, prob.as_deref());

    if let Some(prob) = prob.as_deref() {
        if distinct_labels(&truth).len() == 2 {
            let best = tune_threshold_for(&truth, prob, options.threshold_metric, options.threshold_step)?;
            let name = best.metric.as_str();
            metrics.insert(format!("best_thr_{}", name), best.threshold);
            metrics.insert(format!("best_{}", name), best.score);
            debug!(metric = name, threshold = best.threshold, score = best.score, "Tuned threshold");
        }
    }

    let mut subgroups = BTreeMap::new();
    for column in &options.subgroup_columns {
        if predictions.has_column(column) {
            let result = subgroup_metrics(predictions, &truth, &pred, column)?;
            subgroups.insert(column.clone(), result);
        }
    }

    info!(
        rows = truth.len(),
        metrics = metrics.len(),
        subgroup_columns = subgroups.len(),
        "Evaluated predictions"
    );
    Ok(EvaluationReport { metrics, subgroups })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn tables(n: usize) -> (Table, Table) {
        let y_true: Vec<i64> = (0..n).map(|i| (i % 2) as i64).collect();
        let y_prob: Vec<f64> = (0..n).map(|i| if i % 2 == 1 { 0.7 } else { 0.2 }).collect();
        let y_pred: Vec<i64> = y_prob.iter().map(|&p| i64::from(p > 0.5)).collect();
        let gender: Vec<&str> = (0..n).map(|i| if i < n / 2 { "Female" } else { "Male" }).collect();
        (
            Table::new(df!("y_true" => y_true).unwrap()),
            Table::new(df!("y_pred" => y_pred, "y_prob" => y_prob, "gender" => gender).unwrap()),
        )
    }

    #[test]
    fn test_full_report() {
        let (truth, preds) = tables(40);
        let report = evaluate(&truth, &preds, &EvaluationOptions::default()).unwrap();

        assert_eq!(report.metrics.get("accuracy"), Some(1.0));
        assert_eq!(report.metrics.get("auroc"), Some(1.0));
        assert_eq!(report.metrics.get("best_f1"), Some(1.0));
        // 0.21 is the first grid point above every negative probability
        let thr = report.metrics.get("best_thr_f1").unwrap();
        assert!((thr - 0.21).abs() < 1e-9);

        let gender = &report.subgroups["gender"];
        assert_eq!(gender.get("Female").unwrap().n, 20);
        assert!(!report.subgroups.contains_key("race"));
    }

    #[test]
    fn test_no_tuning_without_probabilities() {
        let (truth, preds) = tables(20);
        let preds = preds.without_column("y_prob").unwrap();
        let report = evaluate(&truth, &preds, &EvaluationOptions::default()).unwrap();
        assert!(report.metrics.contains("f1"));
        assert!(!report.metrics.contains("auroc"));
        assert!(!report.metrics.contains("best_thr_f1"));
    }

    #[test]
    fn test_tuning_metric_names_keys() {
        let (truth, preds) = tables(20);
        let options = EvaluationOptions {
            threshold_metric: TuningMetric::Recall,
            ..EvaluationOptions::default()
        };
        let report = evaluate(&truth, &preds, &options).unwrap();
        assert_eq!(report.metrics.get("best_thr_recall"), Some(0.0));
        assert_eq!(report.metrics.get("best_recall"), Some(1.0));
    }

    #[test]
    fn test_missing_prediction_column() {
        let (truth, preds) = tables(10);
        let preds = preds.without_column("y_pred").unwrap();
        let result = evaluate(&truth, &preds, &EvaluationOptions::default());
        assert!(matches!(result, Err(AuditError::FeatureNotFound(_))));
    }

    #[test]
    fn test_report_json_shape() {
        let (truth, preds) = tables(20);
        let report = evaluate(&truth, &preds, &EvaluationOptions::default()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["metrics"]["accuracy"].is_number());
        assert_eq!(json["subgroups"]["gender"]["Male"]["n"], 10);
    }
}
