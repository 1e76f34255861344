//! Leakage audit - leakage-aware training and fairness evaluation
//!
//! This crate trains a logistic-regression baseline on tabular diabetes data
//! while guarding against target leakage:
//! - Dataset presets that normalize raw CSVs into a binary `target`
//! - Leakage detection (identifier-like and target-correlated columns)
//! - Drop resolution from configuration, detection and an allowlist
//! - Deterministic stratified train/valid/test splitting
//! - Train-only preprocessing, logistic regression and k-fold CV
//! - Metrics, threshold tuning and per-subgroup evaluation
//!
//! # Modules
//!
//! - [`presets`] - Dataset cleaning rules
//! - [`leakage`] - Leak detection and column drop resolution
//! - [`split`] - Stratified splitting
//! - [`preprocessing`] - Imputation, scaling, one-hot encoding
//! - [`training`] - Logistic regression and cross-validation
//! - [`evaluation`] - Metrics, thresholds, subgroups, reports
//! - [`pipeline`] - End-to-end runs and artifact persistence
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;
pub mod table;
pub mod utils;

// Pipeline stages
pub mod presets;
pub mod leakage;
pub mod split;
pub mod preprocessing;
pub mod training;
pub mod evaluation;

// Services
pub mod pipeline;
pub mod cli;

pub use error::{AuditError, Result};

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::AuditConfig;
    pub use crate::error::{AuditError, Result};
    pub use crate::evaluation::{evaluate, EvaluationOptions, EvaluationReport, MetricSet};
    pub use crate::leakage::{ColumnDropResolver, LeakageDetector};
    pub use crate::pipeline::{run_evaluation, run_training, RunArtifacts};
    pub use crate::presets::{DatasetKind, TARGET_COLUMN};
    pub use crate::split::{stratified_split, SplitConfig};
    pub use crate::table::Table;
    pub use crate::training::{Trainer, TrainerConfig};
}
