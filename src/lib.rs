pub mod config;
pub mod error;
pub mod embeddings;
pub mod rank;
pub mod eval;

pub use config::Config;
pub use error::{CmrevalError, Result};
pub use eval::{EvalSettings, Evaluation, FoldEvaluator, RecallMetrics};
pub use rank::{Direction, Measure, RankMatrix, ShardedRanker};
