//! Decision threshold tuning

use super::metrics::{accuracy, binary_f1, precision, recall, roc_auc};
use crate::error::{AuditError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Metric maximized by [`tune_threshold`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningMetric {
    F1,
    Accuracy,
    Precision,
    Recall,
    /// Threshold-invariant; the first grid point wins when defined
    RocAuc,
}

impl TuningMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            TuningMetric::F1 => "f1",
            TuningMetric::Accuracy => "accuracy",
            TuningMetric::Precision => "precision",
            TuningMetric::Recall => "recall",
            TuningMetric::RocAuc => "roc_auc",
        }
    }

    fn score(&self, y_true: &[f64], y_prob: &[f64], y_pred: &[f64]) -> f64 {
        match self {
            TuningMetric::F1 => binary_f1(y_true, y_pred),
            TuningMetric::Accuracy => accuracy(y_true, y_pred),
            TuningMetric::Precision => precision(y_true, y_pred),
            TuningMetric::Recall => recall(y_true, y_pred),
            TuningMetric::RocAuc => roc_auc(y_true, y_prob).unwrap_or(-1.0),
        }
    }
}

impl fmt::Display for TuningMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TuningMetric {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "f1" => Ok(TuningMetric::F1),
            "accuracy" => Ok(TuningMetric::Accuracy),
            "precision" => Ok(TuningMetric::Precision),
            "recall" => Ok(TuningMetric::Recall),
            "roc_auc" => Ok(TuningMetric::RocAuc),
            other => Err(AuditError::UnsupportedMetric(other.to_string())),
        }
    }
}

/// Best threshold found on the grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdResult {
    pub threshold: f64,
    pub score: f64,
    pub metric: TuningMetric,
}

/// Grid-search the probability cut that maximizes `metric`.
///
/// Candidates are `i * step` for `i = 0..=round(1 / step)`, capped at 1.
/// Rows with `prob >= threshold` are predicted positive. The search starts
/// from `(0.5, -1)` and only a strictly better score replaces the incumbent,
/// so ties go to the smallest threshold.
pub fn tune_threshold(y_true: &[f64], y_prob: &[f64], metric: &str, step: f64) -> Result<ThresholdResult> {
    let metric: TuningMetric = metric.parse()?;
    tune_threshold_for(y_true, y_prob, metric, step)
}

/// [`tune_threshold`] with an already parsed metric
pub fn tune_threshold_for(
    y_true: &[f64],
    y_prob: &[f64],
    metric: TuningMetric,
    step: f64,
) -> Result<ThresholdResult> {
    if !(step > 0.0 && step <= 1.0) {
        return Err(AuditError::InvalidParameter {
            name: "step".to_string(),
            value: step.to_string(),
            reason: "must be within (0, 1]".to_string(),
        });
    }
    if y_true.len() != y_prob.len() {
        return Err(AuditError::ShapeError {
            expected: format!("{} probabilities", y_true.len()),
            actual: format!("{} probabilities", y_prob.len()),
        });
    }

    // multiples of `step` up to 1.0; the epsilon absorbs 1/step landing just below an integer
    let n_steps = (1.0 / step + 1e-9).floor() as usize;
    let mut best = ThresholdResult {
        threshold: 0.5,
        score: -1.0,
        metric,
    };
    let mut y_pred = vec![0.0; y_prob.len()];

    for i in 0..=n_steps {
        let threshold = (i as f64 * step).min(1.0);
        for (pred, &p) in y_pred.iter_mut().zip(y_prob) {
            *pred = if p >= threshold { 1.0 } else { 0.0 };
        }
        let score = metric.score(y_true, y_prob, &y_pred);
        if score > best.score {
            best.threshold = threshold;
            best.score = score;
        }
    }
    Ok(best)
}
