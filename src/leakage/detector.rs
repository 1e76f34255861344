//! Leakage candidate detection

use crate::error::Result;
use crate::table::{ColumnKind, Table};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Why a column was flagged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakReason {
    /// Nearly every row has its own value: looks like an identifier
    HighUniqueness,
    /// Linear correlation with the target is suspiciously strong
    HighCorrelation,
}

/// A column suspected of leaking the target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakCandidate {
    pub column: String,
    pub reason: LeakReason,
    /// Uniqueness ratio or signed Pearson correlation, depending on `reason`
    pub value: f64,
}

/// Persisted form of the detector output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakageReport {
    pub suspected_leaks: Vec<LeakCandidate>,
}

/// Flags identifier-like and target-correlated columns
#[derive(Debug, Clone)]
pub struct LeakageDetector {
    id_threshold: f64,
    corr_threshold: f64,
}

impl Default for LeakageDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LeakageDetector {
    /// Create a detector with thresholds 0.90 (uniqueness) and 0.95 (correlation)
    pub fn new() -> Self {
        Self {
            id_threshold: 0.90,
            corr_threshold: 0.95,
        }
    }

    pub fn with_id_threshold(mut self, threshold: f64) -> Self {
        self.id_threshold = threshold;
        self
    }

    pub fn with_corr_threshold(mut self, threshold: f64) -> Self {
        self.corr_threshold = threshold;
        self
    }

    /// Scan every non-target column.
    ///
    /// Uniqueness flags come first, in table column order, followed by
    /// correlation flags in the same order. A column can be flagged for both
    /// reasons. Correlation is only checked when the target is numeric.
    pub fn detect(&self, table: &Table, target: &str) -> Result<Vec<LeakCandidate>> {
        let n_rows = table.height();
        if n_rows == 0 {
            return Ok(Vec::new());
        }

        let schema = table.schema();
        let mut leaks = Vec::new();

        for col in schema.iter().filter(|c| c.name != target) {
            let distinct = distinct_count(table, &col.name, col.kind)?;
            let ratio = distinct as f64 / n_rows as f64;
            if ratio > self.id_threshold {
                leaks.push(LeakCandidate {
                    column: col.name.clone(),
                    reason: LeakReason::HighUniqueness,
                    value: ratio,
                });
            }
        }

        if table.kind(target) == Some(ColumnKind::Numeric) {
            let y = table.numeric_values(target)?;
            for col in schema
                .iter()
                .filter(|c| c.name != target && c.kind == ColumnKind::Numeric)
            {
                let x = table.numeric_values(&col.name)?;
                if let Some(r) = pearson_correlation(&x, &y) {
                    if r.abs() > self.corr_threshold {
                        leaks.push(LeakCandidate {
                            column: col.name.clone(),
                            reason: LeakReason::HighCorrelation,
                            value: r,
                        });
                    }
                }
            }
        }

        Ok(leaks)
    }
}

/// Number of distinct non-missing values
fn distinct_count(table: &Table, name: &str, kind: ColumnKind) -> Result<usize> {
    match kind {
        ColumnKind::Numeric => {
            let seen: HashSet<u64> = table
                .numeric_values(name)?
                .into_iter()
                .flatten()
                .filter(|v| !v.is_nan())
                // fold -0.0 into 0.0
                .map(|v| (v + 0.0).to_bits())
                .collect();
            Ok(seen.len())
        }
        ColumnKind::Categorical => {
            let seen: HashSet<String> = table.text_values(name)?.into_iter().flatten().collect();
            Ok(seen.len())
        }
    }
}

/// Pearson correlation over rows where both values are present.
///
/// Returns `None` when fewer than two complete pairs exist or either side has
/// zero variance.
pub fn pearson_correlation(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) if !a.is_nan() && !b.is_nan() => Some((*a, *b)),
            _ => None,
        })
        .collect();

    let n = pairs.len() as f64;
    if pairs.len() < 2 {
        return None;
    }

    let x_mean = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let y_mean = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;
    let mut sum_y2 = 0.0;

    for &(xi, yi) in &pairs {
        let dx = xi - x_mean;
        let dy = yi - y_mean;
        sum_xy += dx * dy;
        sum_x2 += dx * dx;
        sum_y2 += dy * dy;
    }

    let denom = (sum_x2 * sum_y2).sqrt();
    if denom == 0.0 {
        None
    } else {
        Some((sum_xy / denom).clamp(-1.0, 1.0))
    }
}
