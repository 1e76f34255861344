//! Stratified k-fold cross-validation on the training partition

use crate::error::{AuditError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// A single train/validation split, as positions within the training partition
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Stratified k-fold without shuffling.
///
/// Rows are sorted by class, dealt round-robin to find how many of each class
/// every fold receives, and then assigned to folds in their original order.
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_splits: usize,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Generate the folds for labels `y`
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CVSplit>> {
        let k = self.n_splits;
        if k < 2 {
            return Err(AuditError::InvalidParameter {
                name: "n_splits".to_string(),
                value: k.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if y.len() < k {
            return Err(AuditError::InsufficientData(format!(
                "cannot make {} folds from {} rows",
                k,
                y.len()
            )));
        }

        // Class index per row, classes in ascending label order
        let mut labels: Vec<f64> = y.to_vec();
        labels.sort_by(|a, b| a.total_cmp(b));
        labels.dedup();
        let class_of: Vec<usize> = y
            .iter()
            .map(|v| labels.iter().position(|l| l == v).unwrap_or(0))
            .collect();
        let n_classes = labels.len();

        let mut sorted = class_of.clone();
        sorted.sort_unstable();
        // allocation[fold][class]
        let mut allocation = vec![vec![0usize; n_classes]; k];
        for (i, &class) in sorted.iter().enumerate() {
            allocation[i % k][class] += 1;
        }

        let mut fold_of = vec![0usize; y.len()];
        for class in 0..n_classes {
            let mut slots = (0..k).flat_map(|fold| std::iter::repeat(fold).take(allocation[fold][class]));
            for (row, _) in class_of.iter().enumerate().filter(|(_, &c)| c == class) {
                fold_of[row] = slots.next().unwrap_or(k - 1);
            }
        }

        Ok((0..k)
            .map(|fold_idx| {
                let (test_indices, train_indices): (Vec<usize>, Vec<usize>) =
                    (0..y.len()).partition(|&row| fold_of[row] == fold_idx);
                CVSplit {
                    train_indices,
                    test_indices,
                    fold_idx,
                }
            })
            .collect())
    }
}

/// Outcome of cross-validation: both scores, or the reason they are absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CvScores {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv_roc_auc_mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv_roc_auc_std: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CvScores {
    /// Mean and population standard deviation of fold scores
    pub fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self::failed("no fold scores");
        }
        let n = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        Self {
            cv_roc_auc_mean: Some(mean),
            cv_roc_auc_std: Some(variance.sqrt()),
            error: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            cv_roc_auc_mean: None,
            cv_roc_auc_std: None,
            error: Some(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.cv_roc_auc_mean.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stratified_folds_cover_rows() {
        let y = Array1::from_vec(vec![0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0]);
        let splits = StratifiedKFold::new(3).split(&y).unwrap();
        assert_eq!(splits.len(), 3);

        let mut all: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all.sort_unstable();
        assert_eq!(all, (0..9).collect::<Vec<_>>());

        // 6 negatives and 3 positives: two and one per fold
        for split in &splits {
            let pos = split.test_indices.iter().filter(|&&i| y[i] == 1.0).count();
            assert_eq!(pos, 1);
            assert_eq!(split.test_indices.len(), 3);
            assert_eq!(split.train_indices.len(), 6);
        }
    }

    #[test]
    fn test_folds_are_contiguous_per_class() {
        let y = Array1::from_vec(vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0]);
        let splits = StratifiedKFold::new(2).split(&y).unwrap();
        assert_eq!(splits[0].test_indices, vec![0, 1, 4]);
        assert_eq!(splits[1].test_indices, vec![2, 3, 5]);
    }

    #[test]
    fn test_deterministic() {
        let y = Array1::from_vec((0..30).map(|i| (i % 3 == 0) as i32 as f64).collect());
        let a = StratifiedKFold::new(3).split(&y).unwrap();
        let b = StratifiedKFold::new(3).split(&y).unwrap();
        for (sa, sb) in a.iter().zip(&b) {
            assert_eq!(sa.test_indices, sb.test_indices);
        }
    }

    #[test]
    fn test_cv_scores_population_std() {
        let scores = CvScores::from_scores(&[0.6, 0.8]);
        assert!((scores.cv_roc_auc_mean.unwrap() - 0.7).abs() < 1e-12);
        assert!((scores.cv_roc_auc_std.unwrap() - 0.1).abs() < 1e-12);
        assert!(scores.is_success());
    }

    #[test]
    fn test_failed_serializes_error_only() {
        let json = serde_json::to_value(CvScores::failed("single class")).unwrap();
        assert_eq!(json, serde_json::json!({"error": "single class"}));
    }
}
