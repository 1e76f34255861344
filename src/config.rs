//! Run configuration
//!
//! The configuration document is YAML (`.yaml`/`.yml`) or JSON (`.json`).
//! Every section and field is optional and falls back to its default; unknown
//! keys are rejected so that a misspelled option never goes unnoticed.

use crate::error::{AuditError, Result};
use crate::evaluation::TuningMetric;
use crate::presets::DatasetKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete run configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    pub dataset: DatasetSection,
    pub leakage: LeakageSection,
    pub columns: ColumnsSection,
    pub split: SplitSection,
    pub training: TrainingSection,
    pub evaluation: EvaluationSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasetSection {
    /// Dataset preset; the command line takes precedence when given
    pub kind: Option<DatasetKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LeakageSection {
    /// Distinct-value ratio above which a column looks like an identifier
    pub id_threshold: f64,
    /// Absolute Pearson correlation with the target above which a column is flagged
    pub corr_threshold: f64,
    /// Drop detected columns automatically (minus the allowlist)
    pub auto_drop: bool,
}

impl Default for LeakageSection {
    fn default() -> Self {
        Self {
            id_threshold: 0.90,
            corr_threshold: 0.95,
            auto_drop: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnsSection {
    /// Columns always removed before modeling
    pub drop: Vec<String>,
    /// Columns exempt from automatic leak removal
    pub allowlist: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitSection {
    pub seed: u64,
    pub valid_size: f64,
    pub test_size: f64,
}

impl Default for SplitSection {
    fn default() -> Self {
        Self {
            seed: 42,
            valid_size: 0.2,
            test_size: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingSection {
    /// Run k-fold cross-validation on the training split
    pub cross_validate: bool,
    pub cv_folds: usize,
    /// Inverse L2 regularization strength
    pub c: f64,
    pub max_iter: usize,
}

impl Default for TrainingSection {
    fn default() -> Self {
        Self {
            cross_validate: true,
            cv_folds: 3,
            c: 1.0,
            max_iter: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationSection {
    /// Metric maximized by threshold tuning
    pub threshold_metric: String,
    pub threshold_step: f64,
    /// Demographic columns carried into the prediction table and sliced on
    pub subgroup_columns: Vec<String>,
}

impl Default for EvaluationSection {
    fn default() -> Self {
        Self {
            threshold_metric: "f1".to_string(),
            threshold_step: 0.01,
            subgroup_columns: vec!["gender".to_string(), "race".to_string(), "age".to_string()],
        }
    }
}

impl AuditConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration document, choosing the format from the extension
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AuditError::SourceNotFound {
                path: path.display().to_string(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let config: Self = match ext.as_str() {
            "json" => serde_json::from_str(&text)
                .map_err(|e| AuditError::ConfigError(format!("{}: {}", path.display(), e)))?,
            "yaml" | "yml" => Self::from_yaml(&text)?,
            other => {
                return Err(AuditError::ConfigError(format!(
                    "unsupported config format '{}' for {}",
                    other,
                    path.display()
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML document; an empty document yields the defaults
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Resolve the dataset kind: explicit override, then config, then `uci_hospitals`
    pub fn resolve_kind(&self, cli_kind: Option<DatasetKind>) -> DatasetKind {
        cli_kind
            .or(self.dataset.kind)
            .unwrap_or(DatasetKind::UciHospitals)
    }

    /// Builder method to set configured drops
    pub fn with_drops(mut self, drops: &[&str]) -> Self {
        self.columns.drop = drops.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Builder method to set the allowlist
    pub fn with_allowlist(mut self, allow: &[&str]) -> Self {
        self.columns.allowlist = allow.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Builder method to enable automatic leak removal
    pub fn with_auto_drop(mut self, auto_drop: bool) -> Self {
        self.leakage.auto_drop = auto_drop;
        self
    }

    /// Builder method to set the split seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.split.seed = seed;
        self
    }

    /// Builder method to toggle cross-validation
    pub fn with_cross_validation(mut self, enabled: bool) -> Self {
        self.training.cross_validate = enabled;
        self
    }

    /// Check ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("leakage.id_threshold", self.leakage.id_threshold),
            ("leakage.corr_threshold", self.leakage.corr_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AuditError::InvalidParameter {
                    name: name.to_string(),
                    value: value.to_string(),
                    reason: "must be within [0, 1]".to_string(),
                });
            }
        }
        if self.training.cv_folds < 2 {
            return Err(AuditError::InvalidParameter {
                name: "training.cv_folds".to_string(),
                value: self.training.cv_folds.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if self.training.c <= 0.0 {
            return Err(AuditError::InvalidParameter {
                name: "training.c".to_string(),
                value: self.training.c.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        self.threshold_metric()?;
        Ok(())
    }

    /// Parsed threshold tuning metric
    pub fn threshold_metric(&self) -> Result<TuningMetric> {
        self.evaluation.threshold_metric.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AuditConfig::default();
        assert_eq!(config.leakage.id_threshold, 0.90);
        assert_eq!(config.leakage.corr_threshold, 0.95);
        assert!(!config.leakage.auto_drop);
        assert_eq!(config.split.seed, 42);
        assert_eq!(config.training.cv_folds, 3);
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
dataset:
  kind: pima
leakage:
  auto_drop: true
columns:
  drop: [Insulin]
  allowlist: [BMI]
"#;
        let config = AuditConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.dataset.kind, Some(DatasetKind::Pima));
        assert!(config.leakage.auto_drop);
        assert_eq!(config.leakage.id_threshold, 0.90);
        assert_eq!(config.columns.drop, vec!["Insulin"]);
        assert_eq!(config.columns.allowlist, vec!["BMI"]);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let yaml = "leakage:\n  auto_dorp: true\n";
        assert!(AuditConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_kind_precedence() {
        let config = AuditConfig::from_yaml("dataset:\n  kind: pima\n").unwrap();
        assert_eq!(config.resolve_kind(None), DatasetKind::Pima);
        assert_eq!(
            config.resolve_kind(Some(DatasetKind::UciHospitals)),
            DatasetKind::UciHospitals
        );
        assert_eq!(AuditConfig::default().resolve_kind(None), DatasetKind::UciHospitals);
    }

    #[test]
    fn test_load_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"split": {{"seed": 7}}}}"#).unwrap();
        let config = AuditConfig::load(file.path()).unwrap();
        assert_eq!(config.split.seed, 7);
        assert_eq!(config.split.test_size, 0.2);
    }

    #[test]
    fn test_load_missing_file() {
        let result = AuditConfig::load(Path::new("/nonexistent/config.yaml"));
        assert!(matches!(result, Err(AuditError::SourceNotFound { .. })));
    }

    #[test]
    fn test_invalid_metric_rejected() {
        let mut file: NamedTempFile = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "evaluation:\n  threshold_metric: logloss").unwrap();
        let result = AuditConfig::load(file.path());
        assert!(matches!(result, Err(AuditError::UnsupportedMetric(_))));
    }
}
