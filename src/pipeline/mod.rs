//! End-to-end training and evaluation runs
//!
//! [`run_training`] goes from a raw CSV to the persisted artifacts:
//! load, clean, strip the target's source column, detect leaks, apply drops,
//! split, fit, cross-validate, train and predict the test partition. Nothing is
//! written until every stage has succeeded.
//!
//! [`run_evaluation`] scores persisted predictions and writes the report.

use crate::config::AuditConfig;
use crate::error::Result;
use crate::evaluation::{evaluate, EvaluationOptions, EvaluationReport, Y_PRED_COLUMN, Y_PROB_COLUMN, Y_TRUE_COLUMN};
use crate::leakage::{ColumnDropResolver, DropDecision, LeakageDetector, LeakageReport};
use crate::presets::{load_dataset, DatasetKind, TARGET_COLUMN};
use crate::preprocessing::PreprocessingSpec;
use crate::split::{stratified_split, SplitConfig};
use crate::table::{ColumnKind, Table};
use crate::training::{CvScores, Trainer, TrainerConfig};
use crate::utils::{DataLoader, DataSaver};
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const LEAKAGE_REPORT_FILE: &str = "leakage_report.json";
pub const DROP_REPORT_FILE: &str = "column_drop_report.json";
pub const Y_TRUE_FILE: &str = "y_true.parquet";
pub const PREDICTIONS_FILE: &str = "preds.parquet";
pub const CV_SCORES_FILE: &str = "cv_scores.json";

/// Everything a training run persists, held in memory until the run succeeds
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    pub leakage_report: LeakageReport,
    pub drop_decision: DropDecision,
    /// `y_true` for the test partition
    pub y_true: Table,
    /// `y_pred`, `y_prob` and demographic columns for the test partition
    pub predictions: Table,
    pub cv_scores: CvScores,
}

/// Every file a training run writes, in commit order
pub const ARTIFACT_FILES: [&str; 5] = [
    LEAKAGE_REPORT_FILE,
    DROP_REPORT_FILE,
    Y_TRUE_FILE,
    PREDICTIONS_FILE,
    CV_SCORES_FILE,
];

impl RunArtifacts {
    /// Write every artifact into `output_dir`.
    ///
    /// Files are staged in a temporary directory under `output_dir` and then
    /// renamed into place. If a rename fails, the files already committed by
    /// this call are removed again.
    pub fn write(&self, output_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(output_dir)?;
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(output_dir)?;
        let stage = staging.path();

        DataSaver::save_json(&self.leakage_report, &stage.join(LEAKAGE_REPORT_FILE))?;
        DataSaver::save_json(&self.drop_decision, &stage.join(DROP_REPORT_FILE))?;

        let mut y_true: DataFrame = self.y_true.frame().clone();
        DataSaver::save_parquet(&mut y_true, &stage.join(Y_TRUE_FILE))?;
        let mut predictions: DataFrame = self.predictions.frame().clone();
        DataSaver::save_parquet(&mut predictions, &stage.join(PREDICTIONS_FILE))?;

        DataSaver::save_json(&self.cv_scores, &stage.join(CV_SCORES_FILE))?;

        let mut committed: Vec<PathBuf> = Vec::with_capacity(ARTIFACT_FILES.len());
        for name in ARTIFACT_FILES {
            let target = output_dir.join(name);
            if let Err(e) = std::fs::rename(stage.join(name), &target) {
                warn!(file = name, error = %e, "Commit failed, rolling back artifacts");
                for path in &committed {
                    if let Err(cleanup) = std::fs::remove_file(path) {
                        warn!(path = %path.display(), error = %cleanup, "Could not remove artifact");
                    }
                }
                return Err(e.into());
            }
            committed.push(target);
        }

        info!(dir = %output_dir.display(), "Wrote run artifacts");
        Ok(())
    }
}

/// Run every training stage on a cleaned table without touching the filesystem
pub fn train_on_table(mut table: Table, kind: DatasetKind, config: &AuditConfig) -> Result<RunArtifacts> {
    let demographics = table.select_present(&config.evaluation.subgroup_columns)?;

    let source = kind.target_source();
    let mut target_artifacts = Vec::new();
    if source != TARGET_COLUMN && table.has_column(source) {
        table.drop_columns(&[source.to_string()])?;
        target_artifacts.push(source.to_string());
    }

    let leaks = LeakageDetector::new()
        .with_id_threshold(config.leakage.id_threshold)
        .with_corr_threshold(config.leakage.corr_threshold)
        .detect(&table, TARGET_COLUMN)?;
    info!(suspected = leaks.len(), "Scanned for leakage");

    let decision = ColumnDropResolver::from_config(config)
        .resolve(&table.column_names(), &leaks, TARGET_COLUMN)
        .with_target_artifacts(target_artifacts);
    decision.apply(&mut table)?;

    let split = stratified_split(&table, TARGET_COLUMN, &SplitConfig::from(&config.split))?;
    let spec = PreprocessingSpec::from_schema(&split.train.features);

    let trainer = Trainer::new(TrainerConfig::from(&config.training));
    let cv_scores = if config.training.cross_validate {
        trainer.cross_validate(&spec, &split.train)
    } else {
        CvScores::default()
    };

    let model = trainer.fit(&spec, &split.train)?;
    debug!(
        features = ?model.feature_names(),
        intercept = ?model.model().intercept,
        "Fitted classifier"
    );
    let y_prob = model.predict_proba(&split.test)?;
    let y_pred = model.predict(&split.test)?;

    let mut y_true = Table::new(DataFrame::empty());
    y_true.set_integer(Y_TRUE_COLUMN, split.test.target.iter().map(|&v| v as i64).collect())?;

    let mut predictions = Table::new(DataFrame::empty());
    predictions.set_integer(Y_PRED_COLUMN, y_pred.iter().map(|&v| v as i64).collect())?;
    predictions.set_numeric(Y_PROB_COLUMN, y_prob.iter().map(|&p| Some(p)).collect())?;

    let test_demographics = demographics.take_rows(&split.test.row_indices)?;
    for name in test_demographics.column_names() {
        match test_demographics.kind(&name) {
            Some(ColumnKind::Numeric) => predictions.set_numeric(&name, test_demographics.numeric_values(&name)?)?,
            _ => predictions.set_text(&name, test_demographics.text_values(&name)?)?,
        }
    }

    Ok(RunArtifacts {
        leakage_report: LeakageReport { suspected_leaks: leaks },
        drop_decision: decision,
        y_true,
        predictions,
        cv_scores,
    })
}

/// Load `csv_path`, train, and write the artifacts into `output_dir`
pub fn run_training(
    csv_path: &Path,
    kind: DatasetKind,
    output_dir: &Path,
    config: &AuditConfig,
) -> Result<RunArtifacts> {
    let table = load_dataset(csv_path, kind)?;
    let artifacts = train_on_table(table, kind, config)?;
    artifacts.write(output_dir)?;
    Ok(artifacts)
}

/// Score persisted predictions and write the evaluation report
pub fn run_evaluation(
    pred_path: &Path,
    ytrue_path: &Path,
    report_path: &Path,
    options: &EvaluationOptions,
) -> Result<EvaluationReport> {
    let loader = DataLoader::new();
    let predictions = Table::new(loader.load_parquet(pred_path)?);
    let y_true = Table::new(loader.load_parquet(ytrue_path)?);

    let report = evaluate(&y_true, &predictions, options)?;
    DataSaver::save_json(&report, report_path)?;
    info!(path = %report_path.display(), "Wrote evaluation report");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn pima_like(n: usize) -> Table {
        let glucose: Vec<f64> = (0..n)
            .map(|i| if i % 2 == 1 { 150.0 } else { 95.0 } + (i % 11) as f64)
            .collect();
        let bmi: Vec<f64> = (0..n).map(|i| 22.0 + (i % 13) as f64).collect();
        let outcome: Vec<i64> = (0..n).map(|i| (i % 2) as i64).collect();
        let raw = Table::new(df!("Glucose" => glucose, "BMI" => bmi, "Outcome" => outcome).unwrap());
        DatasetKind::Pima.clean(raw).unwrap()
    }

    #[test]
    fn test_target_source_removed_and_recorded() {
        let config = AuditConfig::default().with_cross_validation(false);
        let artifacts = train_on_table(pima_like(100), DatasetKind::Pima, &config).unwrap();
        assert_eq!(artifacts.drop_decision.target_artifacts, vec!["Outcome"]);
        assert!(artifacts
            .leakage_report
            .suspected_leaks
            .iter()
            .all(|l| l.column != "Outcome" && l.column != TARGET_COLUMN));
        assert_eq!(artifacts.y_true.height(), 20);
        assert_eq!(artifacts.predictions.height(), 20);
        assert_eq!(artifacts.cv_scores, CvScores::default());
    }

    #[test]
    fn test_configured_drop_applied() {
        let config = AuditConfig::default().with_drops(&["BMI", "target"]);
        let artifacts = train_on_table(pima_like(100), DatasetKind::Pima, &config).unwrap();
        assert_eq!(artifacts.drop_decision.applied_drops, vec!["BMI"]);
        assert!(artifacts.cv_scores.is_success());
    }

    #[test]
    fn test_write_commits_every_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = AuditConfig::default().with_cross_validation(false);
        let artifacts = train_on_table(pima_like(100), DatasetKind::Pima, &config).unwrap();
        artifacts.write(dir.path()).unwrap();

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        let mut expected: Vec<String> = ARTIFACT_FILES.iter().map(|s| s.to_string()).collect();
        expected.sort();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_failed_commit_leaves_no_partial_run() {
        let dir = tempfile::TempDir::new().unwrap();
        // a non-empty directory where the predictions file should go
        let blocker = dir.path().join(PREDICTIONS_FILE);
        std::fs::create_dir_all(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), b"x").unwrap();

        let config = AuditConfig::default().with_cross_validation(false);
        let artifacts = train_on_table(pima_like(100), DatasetKind::Pima, &config).unwrap();
        assert!(artifacts.write(dir.path()).is_err());

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![PREDICTIONS_FILE.to_string()]);
    }
}
