//! Leakage detection and column-drop resolution
//!
//! - [`LeakageDetector`] scans a cleaned table for identifier-like columns and
//!   columns that track the target too closely.
//! - [`ColumnDropResolver`] merges configured drops, detected leaks and the
//!   allowlist into the final [`DropDecision`].

mod detector;
mod resolver;

pub use detector::{pearson_correlation, LeakCandidate, LeakReason, LeakageDetector, LeakageReport};
pub use resolver::{ColumnDropResolver, DropDecision};
