//! Dataset presets
//!
//! Each [`DatasetKind`] knows how to normalize one public diabetes dataset
//! into a table with a binary `target` column:
//! - [`DatasetKind::UciHospitals`] - UCI "130 US hospitals" readmission data
//! - [`DatasetKind::Pima`] - Pima Indians diabetes data

mod pima;
mod uci;

use crate::error::{AuditError, Result};
use crate::table::Table;
use crate::utils::DataLoader;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Name of the unified label column produced by every preset
pub const TARGET_COLUMN: &str = "target";

/// Supported dataset presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    UciHospitals,
    Pima,
}

impl DatasetKind {
    /// Snake-case name used in configuration and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::UciHospitals => "uci_hospitals",
            DatasetKind::Pima => "pima",
        }
    }

    /// Source column the target is derived from
    pub fn target_source(&self) -> &'static str {
        match self {
            DatasetKind::UciHospitals => uci::READMISSION_COLUMN,
            DatasetKind::Pima => pima::OUTCOME_COLUMN,
        }
    }

    /// Apply the preset's cleaning rules
    pub fn clean(&self, table: Table) -> Result<Table> {
        let cleaned = match self {
            DatasetKind::UciHospitals => uci::clean(table)?,
            DatasetKind::Pima => pima::clean(table)?,
        };

        if !cleaned.has_column(TARGET_COLUMN) {
            return Err(AuditError::MissingTarget {
                kind: self.as_str().to_string(),
                expected: self.target_source().to_string(),
            });
        }
        Ok(cleaned)
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "uci_hospitals" => Ok(DatasetKind::UciHospitals),
            "pima" => Ok(DatasetKind::Pima),
            other => Err(AuditError::UnknownDatasetKind(other.to_string())),
        }
    }
}

/// Load a CSV and apply the preset for `kind`
pub fn load_dataset(path: &Path, kind: DatasetKind) -> Result<Table> {
    let raw = DataLoader::new().load_csv(path)?;
    info!(
        kind = %kind,
        rows = raw.height(),
        columns = raw.width(),
        "Loaded source table"
    );
    let cleaned = kind.clean(raw)?;
    info!(kind = %kind, columns = cleaned.width(), "Applied dataset preset");
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!("pima".parse::<DatasetKind>().unwrap(), DatasetKind::Pima);
        assert_eq!(
            "uci_hospitals".parse::<DatasetKind>().unwrap(),
            DatasetKind::UciHospitals
        );
        let err = "mimic".parse::<DatasetKind>().unwrap_err();
        assert!(matches!(err, AuditError::UnknownDatasetKind(ref k) if k == "mimic"));
    }

    #[test]
    fn test_kind_serde_names() {
        let json = serde_json::to_string(&DatasetKind::UciHospitals).unwrap();
        assert_eq!(json, "\"uci_hospitals\"");
    }

    #[test]
    fn test_missing_target_names_source_column() {
        let table = Table::new(df!("Glucose" => &[90.0, 120.0]).unwrap());
        let err = DatasetKind::Pima.clean(table).unwrap_err();
        match err {
            AuditError::MissingTarget { kind, expected } => {
                assert_eq!(kind, "pima");
                assert_eq!(expected, "Outcome");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_uci_missing_readmitted() {
        let table = Table::new(df!("gender" => &["Male", "Female"]).unwrap());
        let err = DatasetKind::UciHospitals.clean(table).unwrap_err();
        assert!(matches!(err, AuditError::MissingTarget { .. }));
    }
}
