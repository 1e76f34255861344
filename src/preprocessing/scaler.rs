//! Feature scaling

use crate::error::{AuditError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters for a fitted column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub center: f64,
    pub scale: f64,
}

/// Standard scaler: `(x - mean) / std` with the population standard deviation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    params: BTreeMap<String, ScalerParams>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit one column from fully imputed values
    pub fn fit_column(&mut self, name: &str, values: &[f64]) -> &mut Self {
        self.params.insert(name.to_string(), Self::compute_params(values));
        self.is_fitted = true;
        self
    }

    pub fn params(&self, name: &str) -> Option<ScalerParams> {
        self.params.get(name).copied()
    }

    /// Scale one column in place
    pub fn transform_column(&self, name: &str, values: &mut [f64]) -> Result<()> {
        if !self.is_fitted {
            return Err(AuditError::ModelNotFitted);
        }
        let p = self
            .params
            .get(name)
            .ok_or_else(|| AuditError::FeatureNotFound(name.to_string()))?;
        for v in values.iter_mut() {
            *v = (*v - p.center) / p.scale;
        }
        Ok(())
    }

    fn compute_params(values: &[f64]) -> ScalerParams {
        if values.is_empty() {
            return ScalerParams { center: 0.0, scale: 1.0 };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        ScalerParams {
            center: mean,
            scale: if std == 0.0 { 1.0 } else { std },
        }
    }
}
