//! Model evaluation
//!
//! Metric computation, threshold tuning, subgroup slicing and the combined
//! evaluation report.

mod metrics;
mod report;
mod subgroup;
mod threshold;

pub use metrics::{
    accuracy, average_precision, binary_f1, classification_metrics, distinct_labels, f1_score, is_binary_pair,
    macro_f1, precision, recall, roc_auc, ConfusionCounts, MetricSet,
};
pub use report::{evaluate, EvaluationOptions, EvaluationReport, Y_PRED_COLUMN, Y_PROB_COLUMN, Y_TRUE_COLUMN};
pub use subgroup::{subgroup_metrics, GroupMetrics, SubgroupResult, MIN_GROUP_SIZE};
pub use threshold::{tune_threshold, tune_threshold_for, ThresholdResult, TuningMetric};
