//! Linear models

use super::models::Classifier;
use crate::error::{AuditError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// L2-regularized logistic regression fitted by gradient descent.
///
/// Minimizes the mean log-loss plus `alpha / 2 * ||w||²` with
/// `alpha = 1 / (C * n_samples)`, which matches the usual
/// `C`-parameterized objective scaled by `1 / n_samples`. The intercept is
/// not penalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    /// Inverse regularization strength
    pub c: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    /// Learning rate
    pub learning_rate: f64,
    /// Iterations run by the last fit
    pub n_iter: usize,
    /// Whether model is fitted
    pub is_fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            c: 1.0,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
            n_iter: 0,
            is_fitted: false,
        }
    }

    /// Set inverse regularization strength
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sigmoid function
    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }

    fn check_labels(y: &Array1<f64>) -> Result<()> {
        if let Some(bad) = y.iter().find(|&&v| v != 0.0 && v != 1.0) {
            return Err(AuditError::TrainingError(format!(
                "labels must be 0 or 1, found {}",
                bad
            )));
        }
        let positives = y.iter().filter(|&&v| v == 1.0).count();
        if positives == 0 || positives == y.len() {
            return Err(AuditError::TrainingError(
                "training labels contain a single class".to_string(),
            ));
        }
        Ok(())
    }

    /// Fit the model using gradient descent
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(AuditError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if self.c <= 0.0 {
            return Err(AuditError::InvalidParameter {
                name: "c".to_string(),
                value: self.c.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Self::check_labels(y)?;

        let mut weights = Array1::zeros(n_features);
        let mut bias = 0.0;

        let lr = self.learning_rate;
        let alpha = 1.0 / (self.c * n_samples as f64);

        let mut n_iter = 0;
        for _ in 0..self.max_iter {
            n_iter += 1;
            let linear = x.dot(&weights) + bias;
            let predictions = Self::sigmoid(&linear);

            let errors = &predictions - y;
            let dw = (x.t().dot(&errors) / n_samples as f64) + (alpha * &weights);
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - lr * dw;
            bias -= lr * db;
        }

        if n_iter == self.max_iter {
            debug!(max_iter = self.max_iter, "Logistic regression reached the iteration limit");
        }

        self.coefficients = Some(weights);
        self.intercept = Some(bias);
        self.n_iter = n_iter;
        self.is_fitted = true;

        Ok(self)
    }

    /// Predict positive-class probabilities
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = match (&self.coefficients, self.is_fitted) {
            (Some(c), true) => c,
            _ => return Err(AuditError::ModelNotFitted),
        };
        if x.ncols() != coefficients.len() {
            return Err(AuditError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let intercept = self.intercept.unwrap_or(0.0);
        let linear = x.dot(coefficients) + intercept;
        Ok(Self::sigmoid(&linear))
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        LogisticRegression::fit(self, x, y).map(|_| ())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        LogisticRegression::predict_proba(self, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Array1<f64>) {
        let x = array![[-2.0, 0.1], [-1.5, -0.3], [-1.0, 0.2], [1.0, -0.1], [1.5, 0.3], [2.0, 0.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_logistic_regression_separates() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();

        let pred = Classifier::predict(&model, &x).unwrap();
        assert_eq!(pred, y);

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
        assert!(proba[0] < proba[5]);
    }

    #[test]
    fn test_stronger_regularization_shrinks_weights() {
        let (x, y) = separable();
        let mut loose = LogisticRegression::new().with_c(100.0);
        let mut tight = LogisticRegression::new().with_c(0.01);
        loose.fit(&x, &y).unwrap();
        tight.fit(&x, &y).unwrap();
        let norm = |m: &LogisticRegression| m.coefficients.as_ref().unwrap().mapv(|w| w * w).sum();
        assert!(norm(&tight) < norm(&loose));
    }

    #[test]
    fn test_single_class_rejected() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, 1.0];
        let result = LogisticRegression::new().fit(&x, &y).map(|_| ());
        assert!(matches!(result, Err(AuditError::TrainingError(_))));
    }

    #[test]
    fn test_not_fitted() {
        let model = LogisticRegression::new();
        let x = array![[1.0]];
        assert!(matches!(model.predict_proba(&x), Err(AuditError::ModelNotFitted)));
    }

    #[test]
    fn test_zero_weights_predict_negative() {
        // probability exactly 0.5 is not positive
        let mut model = LogisticRegression::new();
        model.coefficients = Some(array![0.0]);
        model.intercept = Some(0.0);
        model.is_fitted = true;
        let pred = Classifier::predict(&model, &array![[3.0]]).unwrap();
        assert_eq!(pred, array![0.0]);
    }
}
