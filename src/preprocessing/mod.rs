//! Data preprocessing module
//!
//! Turns feature tables into dense design matrices:
//! - numeric columns: median imputation, then standard scaling
//! - categorical columns: most-frequent imputation, then one-hot encoding
//!
//! A [`PreprocessingSpec`] is derived from column kinds alone and can only be
//! fitted on a [`TrainPartition`](crate::split::TrainPartition).

mod encoder;
mod imputer;
mod scaler;
mod spec;

pub use encoder::OneHotEncoder;
pub use imputer::{median, most_frequent, ImputeStrategy, ImputeValue, Imputer};
pub use scaler::{ScalerParams, StandardScaler};
pub use spec::{FittedPreprocessor, PreprocessingSpec};
