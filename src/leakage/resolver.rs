//! Final drop list from configuration and detected leaks

use super::LeakCandidate;
use crate::config::AuditConfig;
use crate::error::Result;
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Audit record of which columns were removed and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropDecision {
    /// Columns actually removed, in table column order
    pub applied_drops: Vec<String>,
    /// Configured drops, sorted
    pub config_drops: Vec<String>,
    pub auto_drop: bool,
    /// Allowlisted columns, sorted
    pub allowlist: Vec<String>,
    /// Columns the target was derived from, removed before detection
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_artifacts: Vec<String>,
}

impl DropDecision {
    pub fn with_target_artifacts(mut self, artifacts: Vec<String>) -> Self {
        self.target_artifacts = artifacts;
        self
    }

    /// Remove the applied drops from a table
    pub fn apply(&self, table: &mut Table) -> Result<()> {
        table.drop_columns(&self.applied_drops)
    }
}

/// Merges configured drops, detected leaks and the allowlist
#[derive(Debug, Clone, Default)]
pub struct ColumnDropResolver {
    configured: BTreeSet<String>,
    allowlist: BTreeSet<String>,
    auto_drop: bool,
}

impl ColumnDropResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AuditConfig) -> Self {
        Self {
            configured: config.columns.drop.iter().cloned().collect(),
            allowlist: config.columns.allowlist.iter().cloned().collect(),
            auto_drop: config.leakage.auto_drop,
        }
    }

    pub fn with_configured<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.configured = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_allowlist<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowlist = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_auto_drop(mut self, auto_drop: bool) -> Self {
        self.auto_drop = auto_drop;
        self
    }

    /// Requested drops before intersecting with the table's columns.
    ///
    /// `configured ∪ (detected − allowlist)` when auto-drop is on, otherwise
    /// only the configured set. The target is always removed.
    pub fn drop_set(&self, detected: &[LeakCandidate], target: &str) -> BTreeSet<String> {
        let mut drops = self.configured.clone();
        if self.auto_drop {
            drops.extend(
                detected
                    .iter()
                    .map(|c| c.column.clone())
                    .filter(|c| !self.allowlist.contains(c)),
            );
        }
        drops.remove(target);
        drops
    }

    /// Resolve the drops for a table with the given columns
    pub fn resolve(&self, columns: &[String], detected: &[LeakCandidate], target: &str) -> DropDecision {
        let drops = self.drop_set(detected, target);
        let applied_drops: Vec<String> = columns
            .iter()
            .filter(|c| drops.contains(*c))
            .cloned()
            .collect();

        let ignored: Vec<&String> = drops.iter().filter(|d| !columns.contains(*d)).collect();
        if !ignored.is_empty() {
            debug!(columns = ?ignored, "Requested drops not present in table");
        }
        info!(
            applied = applied_drops.len(),
            auto_drop = self.auto_drop,
            "Resolved column drops"
        );

        DropDecision {
            applied_drops,
            config_drops: self.configured.iter().cloned().collect(),
            auto_drop: self.auto_drop,
            allowlist: self.allowlist.iter().cloned().collect(),
            target_artifacts: Vec::new(),
        }
    }
}
