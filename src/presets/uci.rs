//! UCI "Diabetes 130-US hospitals" preset

use super::TARGET_COLUMN;
use crate::error::{AuditError, Result};
use crate::table::Table;
use regex::Regex;
use tracing::debug;

pub(super) const READMISSION_COLUMN: &str = "readmitted";

/// Identifier, mostly-missing and free-text columns
const DROP_COLUMNS: [&str; 5] = [
    "encounter_id",
    "patient_nbr",
    "weight",
    "payer_code",
    "medical_specialty",
];

const MISSING_SENTINEL: &str = "?";
const EARLY_READMISSION: &str = "<30";
const INVALID_GENDER: &str = "Unknown/Invalid";
const LAB_RESULT_COLUMNS: [&str; 2] = ["A1Cresult", "max_glu_serum"];
const DIAGNOSIS_COLUMNS: [&str; 3] = ["diag_1", "diag_2", "diag_3"];

pub(super) fn clean(mut table: Table) -> Result<Table> {
    replace_sentinel(&mut table)?;

    let present: Vec<String> = DROP_COLUMNS
        .iter()
        .filter(|c| table.has_column(c))
        .map(|c| c.to_string())
        .collect();
    if !present.is_empty() {
        debug!(columns = ?present, "Dropping identifier and free-text columns");
        table.drop_columns(&present)?;
    }

    if table.has_column(READMISSION_COLUMN) {
        let target: Vec<i64> = table
            .text_values(READMISSION_COLUMN)?
            .iter()
            .map(|v| i64::from(v.as_deref() == Some(EARLY_READMISSION)))
            .collect();
        table.set_integer(TARGET_COLUMN, target)?;
    }

    if table.has_column("gender") {
        let gender: Vec<Option<String>> = table
            .text_values("gender")?
            .into_iter()
            .map(|v| v.filter(|g| g != INVALID_GENDER))
            .collect();
        table.set_text("gender", gender)?;
    }

    if table.has_column("age") {
        let ages = table.text_values("age")?;
        if ages.iter().flatten().any(|a| a.starts_with('[')) {
            let mids: Vec<Option<f64>> = ages
                .iter()
                .map(|a| a.as_deref().and_then(age_midpoint))
                .collect();
            table.set_numeric("age_mid", mids)?;
        }
    }

    for col in LAB_RESULT_COLUMNS {
        if table.has_column(col) {
            let ranks: Vec<Option<f64>> = table
                .text_values(col)?
                .iter()
                .map(|v| v.as_deref().and_then(lab_result_rank))
                .collect();
            table.set_numeric(col, ranks)?;
        }
    }

    let prefix = Regex::new(r"^(\d{3})").map_err(|e| AuditError::DataError(e.to_string()))?;
    for col in DIAGNOSIS_COLUMNS {
        if table.has_column(col) {
            let codes: Vec<Option<String>> = table
                .text_values(col)?
                .iter()
                .map(|v| {
                    v.as_deref()
                        .and_then(|code| prefix.captures(code))
                        .and_then(|caps| caps.get(1))
                        .map(|m| m.as_str().to_string())
                })
                .collect();
            table.set_text(col, codes)?;
        }
    }

    Ok(table)
}

/// Replace the `"?"` sentinel with missing in every string column
fn replace_sentinel(table: &mut Table) -> Result<()> {
    for name in table.column_names() {
        if !table.is_text(&name) {
            continue;
        }
        let values = table.text_values(&name)?;
        if values.iter().flatten().any(|v| v == MISSING_SENTINEL) {
            let cleaned: Vec<Option<String>> = values
                .into_iter()
                .map(|v| v.filter(|s| s != MISSING_SENTINEL))
                .collect();
            table.set_text(&name, cleaned)?;
        }
    }
    Ok(())
}

/// Midpoint of an age bracket such as `"[60-70)"`
fn age_midpoint(bracket: &str) -> Option<f64> {
    let inner = bracket.trim_matches(|c| matches!(c, '[' | ']' | '(' | ')'));
    let mut parts = inner.split('-');
    let lo: i64 = parts.next()?.trim().parse().ok()?;
    let hi: i64 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((lo + hi) as f64 / 2.0)
}

/// Ordinal rank of an A1C / glucose serum result
fn lab_result_rank(value: &str) -> Option<f64> {
    match value {
        "None" => Some(0.0),
        "Norm" => Some(1.0),
        ">7" | ">200" => Some(2.0),
        ">8" | ">300" => Some(3.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn raw_table() -> Table {
        Table::new(
            df!(
                "encounter_id" => &[1i64, 2, 3, 4],
                "patient_nbr" => &[10i64, 20, 30, 40],
                "race" => &["Caucasian", "?", "AfricanAmerican", "Other"],
                "gender" => &["Female", "Male", "Unknown/Invalid", "Female"],
                "age" => &["[60-70)", "[70-80)", "garbage", "[0-10)"],
                "A1Cresult" => &["None", ">7", ">8", "High"],
                "max_glu_serum" => &["Norm", ">200", ">300", "None"],
                "diag_1" => &["250.83", "V45", "414", "E909"],
                "readmitted" => &["<30", "NO", ">30", "<30"],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_drops_identifier_columns() {
        let table = clean(raw_table()).unwrap();
        assert!(!table.has_column("encounter_id"));
        assert!(!table.has_column("patient_nbr"));
        assert!(table.has_column("readmitted"));
    }

    #[test]
    fn test_target_is_early_readmission() {
        let table = clean(raw_table()).unwrap();
        let target = table.numeric_values(TARGET_COLUMN).unwrap();
        assert_eq!(target, vec![Some(1.0), Some(0.0), Some(0.0), Some(1.0)]);
    }

    #[test]
    fn test_sentinel_and_gender_become_missing() {
        let table = clean(raw_table()).unwrap();
        assert_eq!(table.text_values("race").unwrap()[1], None);
        assert_eq!(table.text_values("gender").unwrap()[2], None);
        assert_eq!(table.text_values("gender").unwrap()[0].as_deref(), Some("Female"));
    }

    #[test]
    fn test_age_midpoint() {
        let table = clean(raw_table()).unwrap();
        let mids = table.numeric_values("age_mid").unwrap();
        assert_eq!(mids, vec![Some(65.0), Some(75.0), None, Some(5.0)]);
        assert_eq!(age_midpoint("[90-100)"), Some(95.0));
        assert_eq!(age_midpoint("[-5-10)"), None);
    }

    #[test]
    fn test_lab_results_are_ordinal() {
        let table = clean(raw_table()).unwrap();
        assert_eq!(
            table.numeric_values("A1Cresult").unwrap(),
            vec![Some(0.0), Some(2.0), Some(3.0), None]
        );
        assert_eq!(
            table.numeric_values("max_glu_serum").unwrap(),
            vec![Some(1.0), Some(2.0), Some(3.0), Some(0.0)]
        );
    }

    #[test]
    fn test_diagnosis_prefix() {
        let table = clean(raw_table()).unwrap();
        assert_eq!(
            table.text_values("diag_1").unwrap(),
            vec![Some("250".to_string()), None, Some("414".to_string()), None]
        );
    }

    #[test]
    fn test_age_without_brackets_is_left_alone() {
        let table = Table::new(
            df!("age" => &[45i64, 50], "readmitted" => &["NO", "<30"]).unwrap(),
        );
        let cleaned = clean(table).unwrap();
        assert!(!cleaned.has_column("age_mid"));
    }
}
