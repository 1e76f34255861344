//! Column plan and fitted preprocessing

use super::encoder::OneHotEncoder;
use super::imputer::{ImputeStrategy, Imputer};
use super::scaler::StandardScaler;
use crate::error::{AuditError, Result};
use crate::split::{Partition, TrainPartition};
use crate::table::{ColumnKind, Table};
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Which columns get which treatment, derived from dtypes alone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessingSpec {
    /// Median impute, then standard scale
    pub numeric: Vec<String>,
    /// Most-frequent impute, then one-hot
    pub categorical: Vec<String>,
}

impl PreprocessingSpec {
    /// Classify every column of `table` by its kind
    pub fn from_schema(table: &Table) -> Self {
        let mut numeric = Vec::new();
        let mut categorical = Vec::new();
        for col in table.schema() {
            match col.kind {
                ColumnKind::Numeric => numeric.push(col.name),
                ColumnKind::Categorical => categorical.push(col.name),
            }
        }
        Self { numeric, categorical }
    }

    /// Fit imputation, scaling and encoding statistics on training rows
    pub fn fit(&self, train: &TrainPartition) -> Result<FittedPreprocessor> {
        let table = &train.features;

        let mut numeric_imputer = Imputer::new(ImputeStrategy::Median);
        numeric_imputer.fit(table, &self.numeric)?;
        let mut categorical_imputer = Imputer::new(ImputeStrategy::MostFrequent);
        categorical_imputer.fit(table, &self.categorical)?;

        let (numeric, dropped_numeric) = split_fitted(&self.numeric, &numeric_imputer);
        let (categorical, dropped_categorical) = split_fitted(&self.categorical, &categorical_imputer);
        let dropped: Vec<String> = dropped_numeric.into_iter().chain(dropped_categorical).collect();
        if !dropped.is_empty() {
            warn!(columns = ?dropped, "Dropping columns with no observed training values");
        }

        let mut scaler = StandardScaler::new();
        for name in &numeric {
            let filled = numeric_imputer.impute_numeric(name, table.numeric_values(name)?)?;
            scaler.fit_column(name, &filled);
        }

        let mut encoder = OneHotEncoder::new();
        for name in &categorical {
            let filled = categorical_imputer.impute_text(name, table.text_values(name)?)?;
            encoder.fit_column(name, &filled);
        }

        let fitted = FittedPreprocessor {
            numeric,
            categorical,
            dropped,
            numeric_imputer,
            categorical_imputer,
            scaler,
            encoder,
            fitted_rows: train.len(),
        };
        debug!(
            features = fitted.n_features(),
            rows = fitted.fitted_rows,
            "Fitted preprocessing"
        );
        Ok(fitted)
    }
}

/// Keep columns with a fill value; the rest were never observed
fn split_fitted(columns: &[String], imputer: &Imputer) -> (Vec<String>, Vec<String>) {
    columns
        .iter()
        .cloned()
        .partition(|c| imputer.fill_value(c).is_some())
}

/// Preprocessing with statistics learned from a training partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    numeric: Vec<String>,
    categorical: Vec<String>,
    dropped: Vec<String>,
    numeric_imputer: Imputer,
    categorical_imputer: Imputer,
    scaler: StandardScaler,
    encoder: OneHotEncoder,
    fitted_rows: usize,
}

impl FittedPreprocessor {
    /// Number of training rows the statistics were computed from
    pub fn fitted_rows(&self) -> usize {
        self.fitted_rows
    }

    /// Columns removed at fit time because every training value was missing
    pub fn dropped_columns(&self) -> &[String] {
        &self.dropped
    }

    pub fn n_features(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|c| self.encoder.width(c))
                .sum::<usize>()
    }

    /// Output column names: scaled numerics, then one-hot indicators
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self.numeric.clone();
        for c in &self.categorical {
            names.extend(self.encoder.feature_names(c));
        }
        names
    }

    /// Dense design matrix for any partition
    pub fn transform(&self, partition: &Partition) -> Result<Array2<f64>> {
        self.transform_table(&partition.features)
    }

    /// Dense design matrix for a feature table; extra columns are ignored
    pub fn transform_table(&self, table: &Table) -> Result<Array2<f64>> {
        let n_rows = table.height();
        let mut out = Array2::<f64>::zeros((n_rows, self.n_features()));

        for (j, name) in self.numeric.iter().enumerate() {
            if table.kind(name) != Some(ColumnKind::Numeric) {
                return Err(missing_or_mistyped(table, name));
            }
            let mut values = self
                .numeric_imputer
                .impute_numeric(name, table.numeric_values(name)?)?;
            self.scaler.transform_column(name, &mut values)?;
            for (i, v) in values.into_iter().enumerate() {
                out[[i, j]] = v;
            }
        }

        let mut offset = self.numeric.len();
        for name in &self.categorical {
            let width = self.encoder.width(name);
            let values = self
                .categorical_imputer
                .impute_text(name, table.text_values(name)?)?;
            self.encoder
                .transform_column(name, &values, out.slice_mut(s![.., offset..offset + width]))?;
            offset += width;
        }

        Ok(out)
    }
}

fn missing_or_mistyped(table: &Table, name: &str) -> AuditError {
    if table.has_column(name) {
        AuditError::DataError(format!("column '{}' is no longer numeric", name))
    } else {
        AuditError::FeatureNotFound(name.to_string())
    }
}
