//! Evaluation framework: ground truth, metrics (R@K, median/mean rank), folds,
//! retrieval inspection and reports.

pub mod explain;
pub mod folds;
pub mod ground_truth;
pub mod labels;
pub mod metrics;
pub mod report;

pub use explain::RetrievalExplainer;
pub use folds::{DirectionOutcome, EvalSettings, Evaluation, FoldEvaluator, FoldOutcome};
pub use ground_truth::{GroundTruth, QueryRanks};
pub use labels::LabelSet;
pub use metrics::{mean_rank, median_rank, recall_at_k, RecallMetrics};
pub use report::EvaluationReport;
