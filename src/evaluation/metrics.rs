//! Classification metrics

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered map of metric name to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricSet(BTreeMap<String, f64>);

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Confusion counts for one positive label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionCounts {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl ConfusionCounts {
    pub fn from_labels(y_true: &[f64], y_pred: &[f64], positive: f64) -> Self {
        let mut counts = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t == positive, p == positive) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (false, false) => counts.tn += 1,
                (true, false) => counts.fn_ += 1,
            }
        }
        counts
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        ratio(2 * self.tp, 2 * self.tp + self.fp + self.fn_)
    }
}

/// `num / den`, or 0 when the denominator is zero
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Distinct labels in ascending order
pub fn distinct_labels(values: &[f64]) -> Vec<f64> {
    let mut labels = values.to_vec();
    labels.sort_by(|a, b| a.total_cmp(b));
    labels.dedup();
    labels
}

/// True when `y_true` holds exactly the labels {0, 1}
pub fn is_binary_pair(y_true: &[f64]) -> bool {
    distinct_labels(y_true) == [0.0, 1.0]
}

pub fn accuracy(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    ratio(correct, y_true.len())
}

pub fn precision(y_true: &[f64], y_pred: &[f64]) -> f64 {
    ConfusionCounts::from_labels(y_true, y_pred, 1.0).precision()
}

pub fn recall(y_true: &[f64], y_pred: &[f64]) -> f64 {
    ConfusionCounts::from_labels(y_true, y_pred, 1.0).recall()
}

/// F1 of the positive label 1
pub fn binary_f1(y_true: &[f64], y_pred: &[f64]) -> f64 {
    ConfusionCounts::from_labels(y_true, y_pred, 1.0).f1()
}

/// Unweighted mean of per-label F1 over the union of labels
pub fn macro_f1(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let all: Vec<f64> = y_true.iter().chain(y_pred).copied().collect();
    let labels = distinct_labels(&all);
    if labels.is_empty() {
        return 0.0;
    }
    labels
        .iter()
        .map(|&l| ConfusionCounts::from_labels(y_true, y_pred, l).f1())
        .sum::<f64>()
        / labels.len() as f64
}

/// Binary F1 when every label is 0 or 1, macro F1 otherwise
pub fn f1_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let binary = y_true
        .iter()
        .chain(y_pred)
        .all(|&v| v == 0.0 || v == 1.0);
    if binary {
        binary_f1(y_true, y_pred)
    } else {
        macro_f1(y_true, y_pred)
    }
}

/// Area under the ROC curve from ranks, averaging tied scores.
///
/// `None` unless `y_true` holds exactly {0, 1}.
pub fn roc_auc(y_true: &[f64], y_score: &[f64]) -> Option<f64> {
    if y_true.len() != y_score.len() || !is_binary_pair(y_true) {
        return None;
    }
    let n = y_true.len();
    let n_pos = y_true.iter().filter(|&&v| v == 1.0).count() as f64;
    let n_neg = n as f64 - n_pos;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| y_score[a].total_cmp(&y_score[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && y_score[order[j + 1]] == y_score[order[i]] {
            j += 1;
        }
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = (0..n).filter(|&k| y_true[k] == 1.0).map(|k| ranks[k]).sum();
    Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Average precision: `Σ (R_k - R_{k-1}) P_k` over descending score thresholds.
///
/// `None` unless `y_true` holds exactly {0, 1}.
pub fn average_precision(y_true: &[f64], y_score: &[f64]) -> Option<f64> {
    if y_true.len() != y_score.len() || !is_binary_pair(y_true) {
        return None;
    }
    let n = y_true.len();
    let n_pos = y_true.iter().filter(|&&v| v == 1.0).count() as f64;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| y_score[b].total_cmp(&y_score[a]));

    let (mut tp, mut fp) = (0.0, 0.0);
    let mut prev_recall = 0.0;
    let mut ap = 0.0;
    let mut i = 0;
    while i < n {
        let score = y_score[order[i]];
        while i < n && y_score[order[i]] == score {
            if y_true[order[i]] == 1.0 {
                tp += 1.0;
            } else {
                fp += 1.0;
            }
            i += 1;
        }
        let recall = tp / n_pos;
        let precision = tp / (tp + fp);
        ap += (recall - prev_recall) * precision;
        prev_recall = recall;
    }
    Some(ap)
}

/// Accuracy, F1 and, given probabilities for a {0, 1} target, AUROC and AUPRC
pub fn classification_metrics(y_true: &[f64], y_pred: &[f64], y_prob: Option<&[f64]>) -> MetricSet {
    let mut metrics = MetricSet::new();
    metrics.insert("accuracy", accuracy(y_true, y_pred));
    metrics.insert("f1", f1_score(y_true, y_pred));

    if let Some(prob) = y_prob {
        if let (Some(auroc), Some(auprc)) = (roc_auc(y_true, prob), average_precision(y_true, prob)) {
            metrics.insert("auroc", auroc);
            metrics.insert("auprc", auprc);
        }
    }
    metrics
}
