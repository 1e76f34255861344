//! One-hot encoding of categorical columns

use crate::error::{AuditError, Result};
use ndarray::ArrayViewMut2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One-hot encoder that ignores categories unseen at fit time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// Column name -> sorted categories
    categories: BTreeMap<String, Vec<String>>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit_column(&mut self, name: &str, values: &[String]) -> &mut Self {
        let distinct: BTreeSet<&str> = values.iter().map(|s| s.as_str()).collect();
        self.categories
            .insert(name.to_string(), distinct.into_iter().map(str::to_string).collect());
        self.is_fitted = true;
        self
    }

    pub fn categories(&self, name: &str) -> Option<&[String]> {
        self.categories.get(name).map(|c| c.as_slice())
    }

    /// Output width for one column
    pub fn width(&self, name: &str) -> usize {
        self.categories.get(name).map_or(0, |c| c.len())
    }

    /// `<column>_<category>` names of the indicator columns
    pub fn feature_names(&self, name: &str) -> Vec<String> {
        self.categories
            .get(name)
            .map(|cats| cats.iter().map(|c| format!("{}_{}", name, c)).collect())
            .unwrap_or_default()
    }

    /// Write the indicator block for one column into `out`.
    ///
    /// `out` must have one row per value and [`OneHotEncoder::width`] columns.
    /// Unseen values leave their row all zero.
    pub fn transform_column(&self, name: &str, values: &[String], mut out: ArrayViewMut2<f64>) -> Result<()> {
        if !self.is_fitted {
            return Err(AuditError::ModelNotFitted);
        }
        let cats = self
            .categories
            .get(name)
            .ok_or_else(|| AuditError::FeatureNotFound(name.to_string()))?;
        if out.dim() != (values.len(), cats.len()) {
            return Err(AuditError::ShapeError {
                expected: format!("({}, {})", values.len(), cats.len()),
                actual: format!("{:?}", out.dim()),
            });
        }

        out.fill(0.0);
        for (row, value) in values.iter().enumerate() {
            if let Ok(j) = cats.binary_search(value) {
                out[[row, j]] = 1.0;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_categories_sorted() {
        let mut encoder = OneHotEncoder::new();
        encoder.fit_column("race", &strings(&["b", "a", "c", "a"]));
        assert_eq!(encoder.categories("race").unwrap(), &strings(&["a", "b", "c"])[..]);
        assert_eq!(encoder.feature_names("race"), vec!["race_a", "race_b", "race_c"]);
    }

    #[test]
    fn test_unseen_category_is_all_zero() {
        let mut encoder = OneHotEncoder::new();
        encoder.fit_column("g", &strings(&["f", "m"]));

        let mut out = Array2::<f64>::from_elem((3, 2), 9.0);
        encoder
            .transform_column("g", &strings(&["m", "x", "f"]), out.view_mut())
            .unwrap();
        assert_eq!(out, ndarray::array![[0.0, 1.0], [0.0, 0.0], [1.0, 0.0]]);
    }

    #[test]
    fn test_shape_mismatch() {
        let mut encoder = OneHotEncoder::new();
        encoder.fit_column("g", &strings(&["f", "m"]));
        let mut out = Array2::<f64>::zeros((1, 3));
        assert!(encoder
            .transform_column("g", &strings(&["f"]), out.view_mut())
            .is_err());
    }
}
