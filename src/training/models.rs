//! Classifier trait

use crate::error::Result;
use ndarray::{Array1, Array2};

/// Positive-class probability cut used by [`Classifier::predict`]
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Common trait for binary classifiers
pub trait Classifier: Send + Sync {
    /// Fit the model to training data with 0/1 labels
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Positive-class probability per row
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Class labels; positive iff probability `> 0.5`
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p > DECISION_THRESHOLD { 1.0 } else { 0.0 }))
    }
}
