//! Training engine

use super::cross_validation::{CvScores, StratifiedKFold};
use super::linear_models::LogisticRegression;
use super::models::Classifier;
use crate::config::TrainingSection;
use crate::error::{AuditError, Result};
use crate::evaluation::roc_auc;
use crate::preprocessing::{FittedPreprocessor, PreprocessingSpec};
use crate::split::{Partition, TrainPartition};
use ndarray::Array1;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{info, warn};

/// Model and cross-validation settings
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerConfig {
    pub c: f64,
    pub max_iter: usize,
    pub cross_validate: bool,
    pub cv_folds: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            cross_validate: true,
            cv_folds: 3,
        }
    }
}

impl From<&TrainingSection> for TrainerConfig {
    fn from(section: &TrainingSection) -> Self {
        Self {
            c: section.c,
            max_iter: section.max_iter,
            cross_validate: section.cross_validate,
            cv_folds: section.cv_folds,
        }
    }
}

/// Preprocessing plus classifier, fitted on the training partition
#[derive(Debug, Clone)]
pub struct TrainedModel {
    preprocessor: FittedPreprocessor,
    model: LogisticRegression,
}

impl TrainedModel {
    pub fn preprocessor(&self) -> &FittedPreprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &LogisticRegression {
        &self.model
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.preprocessor.feature_names()
    }

    /// Positive-class probabilities for a partition
    pub fn predict_proba(&self, partition: &Partition) -> Result<Array1<f64>> {
        let x = self.preprocessor.transform(partition)?;
        Classifier::predict_proba(&self.model, &x)
    }

    /// 0/1 predictions for a partition
    pub fn predict(&self, partition: &Partition) -> Result<Array1<f64>> {
        let x = self.preprocessor.transform(partition)?;
        Classifier::predict(&self.model, &x)
    }
}

/// Fits the preprocessing + logistic regression pipeline
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    fn classifier(&self) -> LogisticRegression {
        LogisticRegression::new()
            .with_c(self.config.c)
            .with_max_iter(self.config.max_iter)
    }

    /// Fit preprocessing and the classifier on the training partition
    pub fn fit(&self, spec: &PreprocessingSpec, train: &TrainPartition) -> Result<TrainedModel> {
        let start = Instant::now();
        let preprocessor = spec.fit(train)?;
        if preprocessor.fitted_rows() != train.len() {
            return Err(AuditError::ShapeError {
                expected: format!("preprocessing fitted on {} training rows", train.len()),
                actual: format!("{} rows", preprocessor.fitted_rows()),
            });
        }

        let x = preprocessor.transform(train)?;
        let mut model = self.classifier();
        model.fit(&x, &train.target)?;

        info!(
            rows = x.nrows(),
            features = x.ncols(),
            iterations = model.n_iter,
            secs = start.elapsed().as_secs_f64(),
            "Trained logistic regression"
        );
        Ok(TrainedModel { preprocessor, model })
    }

    /// Stratified k-fold ROC-AUC on the training partition.
    ///
    /// Each fold refits preprocessing on its own training rows. Folds run in
    /// parallel; any failing fold turns the whole result into a recorded error.
    pub fn cross_validate(&self, spec: &PreprocessingSpec, train: &TrainPartition) -> CvScores {
        let splits = match StratifiedKFold::new(self.config.cv_folds).split(&train.target) {
            Ok(splits) => splits,
            Err(e) => return self.record_failure(e),
        };

        let results: Vec<Result<f64>> = splits
            .par_iter()
            .map(|split| {
                let fold_train = train.fold(&split.train_indices)?;
                let fold_valid = train.subset(&split.test_indices)?;
                let fitted = self.fit(spec, &fold_train)?;
                let proba = fitted.predict_proba(&fold_valid)?;
                roc_auc(&fold_valid.target.to_vec(), &proba.to_vec()).ok_or_else(|| {
                    AuditError::TrainingError(format!(
                        "ROC-AUC undefined on fold {}: validation rows contain a single class",
                        split.fold_idx
                    ))
                })
            })
            .collect();

        let scores: Result<Vec<f64>> = results.into_iter().collect();
        match scores {
            Ok(scores) => {
                let cv = CvScores::from_scores(&scores);
                info!(
                    folds = scores.len(),
                    mean = ?cv.cv_roc_auc_mean,
                    std = ?cv.cv_roc_auc_std,
                    "Cross-validated ROC-AUC"
                );
                cv
            }
            Err(e) => self.record_failure(e),
        }
    }

    fn record_failure(&self, error: AuditError) -> CvScores {
        warn!(error = %error, "Cross-validation failed");
        CvScores::failed(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::{stratified_split, SplitConfig};
    use crate::table::Table;
    use polars::prelude::*;

    fn table(n: usize) -> Table {
        let signal: Vec<f64> = (0..n)
            .map(|i| (if i % 2 == 0 { -1.0 } else { 1.0 }) + (i % 7) as f64 * 0.05)
            .collect();
        let group: Vec<&str> = (0..n).map(|i| if i % 3 == 0 { "a" } else { "b" }).collect();
        let target: Vec<i64> = (0..n).map(|i| (i % 2) as i64).collect();
        Table::new(df!("signal" => signal, "group" => group, "target" => target).unwrap())
    }

    #[test]
    fn test_fit_and_predict() {
        let split = stratified_split(&table(60), "target", &SplitConfig::new()).unwrap();
        let spec = PreprocessingSpec::from_schema(&split.train.features);
        let model = Trainer::default().fit(&spec, &split.train).unwrap();

        let pred = model.predict(&split.test).unwrap();
        assert_eq!(pred, split.test.target);
        let proba = model.predict_proba(&split.test).unwrap();
        assert_eq!(proba.len(), split.test.len());

        // scaled numerics first, then one-hot blocks
        assert_eq!(model.feature_names(), vec!["signal", "group_a", "group_b"]);
        let coefficients = model.model().coefficients.as_ref().unwrap();
        assert_eq!(coefficients.len(), 3);
        assert!(coefficients[0] > 0.0);
        assert!(model.model().is_fitted);
    }

    #[test]
    fn test_cross_validate_scores() {
        let split = stratified_split(&table(90), "target", &SplitConfig::new()).unwrap();
        let spec = PreprocessingSpec::from_schema(&split.train.features);
        let cv = Trainer::default().cross_validate(&spec, &split.train);
        assert!(cv.is_success(), "{:?}", cv.error);
        assert!((cv.cv_roc_auc_mean.unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(cv.cv_roc_auc_std, Some(0.0));
    }

    #[test]
    fn test_cross_validate_records_failure() {
        let split = stratified_split(&table(30), "target", &SplitConfig::new()).unwrap();
        let spec = PreprocessingSpec::from_schema(&split.train.features);
        let trainer = Trainer::new(TrainerConfig {
            cv_folds: 50,
            ..TrainerConfig::default()
        });
        let cv = trainer.cross_validate(&spec, &split.train);
        assert!(!cv.is_success());
        assert!(cv.error.is_some());
    }

    #[test]
    fn test_single_class_fold_recorded_and_fit_completes() {
        // two positives over three folds: fold 0 validates on negatives only
        let n = 30;
        let signal: Vec<f64> = (0..n).map(|i| if i >= n - 2 { 2.0 } else { (i % 5) as f64 * 0.1 }).collect();
        let target: Vec<f64> = (0..n).map(|i| if i >= n - 2 { 1.0 } else { 0.0 }).collect();
        let train = TrainPartition::new(Partition {
            features: Table::new(df!("signal" => signal).unwrap()),
            target: Array1::from(target),
            row_indices: (0..n).collect(),
        });
        let spec = PreprocessingSpec::from_schema(&train.features);
        let trainer = Trainer::new(TrainerConfig {
            cv_folds: 3,
            ..TrainerConfig::default()
        });

        let cv = trainer.cross_validate(&spec, &train);
        assert!(!cv.is_success());
        assert_eq!(cv.cv_roc_auc_mean, None);
        assert_eq!(cv.cv_roc_auc_std, None);
        let reason = cv.error.unwrap();
        assert!(reason.contains("fold 0"), "{}", reason);

        let model = trainer.fit(&spec, &train).unwrap();
        assert_eq!(model.predict_proba(&train).unwrap().len(), n);
    }
}
