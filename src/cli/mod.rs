//! Leakage audit CLI
//!
//! `train` writes run artifacts, `evaluate` scores them, `run` chains both.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::AuditConfig;
use crate::evaluation::{EvaluationOptions, EvaluationReport};
use crate::pipeline::{self, RunArtifacts, PREDICTIONS_FILE, Y_TRUE_FILE};
use crate::presets::DatasetKind;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<24} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "leakage-audit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Leakage-aware training and fairness evaluation for tabular diabetes data")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean, audit for leakage, train and write run artifacts
    Train {
        /// Input CSV file
        csv: PathBuf,

        /// Dataset preset (uci_hospitals, pima); overrides the config
        #[arg(short, long)]
        kind: Option<DatasetKind>,

        /// Directory receiving the artifacts
        #[arg(short, long, default_value = "artifacts")]
        output_dir: PathBuf,

        /// YAML or JSON configuration document
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Score persisted predictions and write the evaluation report
    Evaluate {
        /// Prediction table (y_pred, y_prob, demographic columns)
        #[arg(long, default_value = "artifacts/preds.parquet")]
        pred_path: PathBuf,

        /// True labels (y_true)
        #[arg(long, default_value = "artifacts/y_true.parquet")]
        ytrue_path: PathBuf,

        /// Output JSON report
        #[arg(long, default_value = "artifacts/eval_report.json")]
        report_path: PathBuf,

        /// YAML or JSON configuration document
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Train, then evaluate the fresh artifacts
    Run {
        /// Input CSV file
        csv: PathBuf,

        /// Dataset preset (uci_hospitals, pima); overrides the config
        #[arg(short, long)]
        kind: Option<DatasetKind>,

        /// Directory receiving the artifacts and the report
        #[arg(short, long, default_value = "artifacts")]
        output_dir: PathBuf,

        /// YAML or JSON configuration document
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Name of the report written next to the artifacts by `run`
pub const REPORT_FILE: &str = "eval_report.json";

/// Defaults when no path is given; a given path must exist
pub fn load_config(path: Option<&Path>) -> crate::Result<AuditConfig> {
    match path {
        Some(p) => AuditConfig::load(p),
        None => Ok(AuditConfig::default()),
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    csv: &Path,
    kind: Option<DatasetKind>,
    output_dir: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<RunArtifacts> {
    section("Train");

    let config = load_config(config_path)?;
    let kind = config.resolve_kind(kind);
    kv("Dataset", &format!("{} ({})", csv.display(), kind));

    step_run("Training");
    let start = Instant::now();
    let artifacts = pipeline::run_training(csv, kind, output_dir, &config)?;
    step_done(&format!("{:?}", start.elapsed()));

    let leaks = &artifacts.leakage_report.suspected_leaks;
    if leaks.is_empty() {
        step_ok("No suspected leaks");
    } else {
        for leak in leaks {
            println!(
                "  {} {} {}",
                "!".yellow(),
                leak.column.yellow(),
                dim(&format!("{:?} {:.3}", leak.reason, leak.value))
            );
        }
    }

    let dropped = &artifacts.drop_decision.applied_drops;
    kv("Dropped columns", &if dropped.is_empty() { "none".to_string() } else { dropped.join(", ") });
    match (artifacts.cv_scores.cv_roc_auc_mean, artifacts.cv_scores.cv_roc_auc_std) {
        (Some(mean), Some(std)) => kv("CV ROC-AUC", &format!("{:.4} ± {:.4}", mean, std)),
        _ => {
            if let Some(reason) = &artifacts.cv_scores.error {
                kv("CV ROC-AUC", &format!("failed: {}", reason));
            }
        }
    }
    kv("Test rows", &artifacts.predictions.height().to_string());
    step_ok(&format!("Artifacts written to {}", output_dir.display()));
    println!();

    Ok(artifacts)
}

pub fn cmd_evaluate(
    pred_path: &Path,
    ytrue_path: &Path,
    report_path: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<EvaluationReport> {
    section("Evaluate");

    let config = load_config(config_path)?;
    let options = EvaluationOptions::from_section(&config.evaluation)?;

    step_run("Scoring predictions");
    let start = Instant::now();
    let report = pipeline::run_evaluation(pred_path, ytrue_path, report_path, &options)?;
    step_done(&format!("{:?}", start.elapsed()));

    for (name, value) in report.metrics.iter() {
        kv(name, &format!("{:.4}", value));
    }
    for (column, result) in &report.subgroups {
        println!("  {} {}", accent("›"), column.white().bold());
        for key in result.keys() {
            if let Some(m) = result.get(key) {
                println!(
                    "    {:<20} {} {}",
                    muted(key),
                    format!("acc {:.3}  f1 {:.3}", m.accuracy, m.f1).white(),
                    dim(&format!("n={}", m.n))
                );
            }
        }
    }
    step_ok(&format!("Report written to {}", report_path.display()));
    println!();

    Ok(report)
}

pub fn cmd_run(
    csv: &Path,
    kind: Option<DatasetKind>,
    output_dir: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<EvaluationReport> {
    cmd_train(csv, kind, output_dir, config_path)?;
    cmd_evaluate(
        &output_dir.join(PREDICTIONS_FILE),
        &output_dir.join(Y_TRUE_FILE),
        &output_dir.join(REPORT_FILE),
        config_path,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuditError;

    #[test]
    fn test_parse_train_args() {
        let cli = Cli::try_parse_from(["leakage-audit", "train", "data.csv", "--kind", "pima"]).unwrap();
        match cli.command {
            Commands::Train { csv, kind, output_dir, config } => {
                assert_eq!(csv, PathBuf::from("data.csv"));
                assert_eq!(kind, Some(DatasetKind::Pima));
                assert_eq!(output_dir, PathBuf::from("artifacts"));
                assert!(config.is_none());
            }
            _ => panic!("expected train"),
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(Cli::try_parse_from(["leakage-audit", "train", "data.csv", "--kind", "mimic"]).is_err());
    }

    #[test]
    fn test_missing_config_path() {
        let err = load_config(Some(Path::new("/nonexistent/audit.yaml"))).unwrap_err();
        assert!(matches!(err, AuditError::SourceNotFound { .. }));
    }
}
