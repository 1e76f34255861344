//! Model training module
//!
//! - [`LogisticRegression`]: L2-regularized logistic regression
//! - [`StratifiedKFold`] / [`CvScores`]: cross-validation on the training split
//! - [`Trainer`]: fits preprocessing and the classifier together

mod engine;
mod models;
pub mod cross_validation;
pub mod linear_models;

pub use cross_validation::{CVSplit, CvScores, StratifiedKFold};
pub use engine::{TrainedModel, Trainer, TrainerConfig};
pub use linear_models::LogisticRegression;
pub use models::{Classifier, DECISION_THRESHOLD};
