//! Pima Indians diabetes preset

use super::TARGET_COLUMN;
use crate::error::{AuditError, Result};
use crate::table::{ColumnKind, Table};

pub(super) const OUTCOME_COLUMN: &str = "Outcome";

/// Physiological measurements where zero encodes "not measured"
const ZERO_AS_MISSING: [&str; 5] = ["Glucose", "BloodPressure", "SkinThickness", "Insulin", "BMI"];

pub(super) fn clean(mut table: Table) -> Result<Table> {
    for col in ZERO_AS_MISSING {
        if table.kind(col) == Some(ColumnKind::Numeric) {
            let values: Vec<Option<f64>> = table
                .numeric_values(col)?
                .into_iter()
                .map(|v| v.filter(|x| *x != 0.0))
                .collect();
            table.set_numeric(col, values)?;
        }
    }

    if table.has_column(OUTCOME_COLUMN) {
        let target = table
            .numeric_values(OUTCOME_COLUMN)?
            .into_iter()
            .enumerate()
            .map(|(row, v)| match v {
                Some(x) if x == 0.0 || x == 1.0 => Ok(x as i64),
                Some(x) => Err(AuditError::DataError(format!(
                    "'{}' must be 0 or 1, found {} at row {}",
                    OUTCOME_COLUMN, x, row
                ))),
                None => Err(AuditError::DataError(format!(
                    "'{}' is missing at row {}",
                    OUTCOME_COLUMN, row
                ))),
            })
            .collect::<Result<Vec<i64>>>()?;
        table.set_integer(TARGET_COLUMN, target)?;
    }

    Ok(table)
}
