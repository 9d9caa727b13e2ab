//! Recall@K, median rank and mean rank over per-query 0-based ranks.

use crate::error::{CmrevalError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Retrieval metrics for one direction and one fold (or their mean).
///
/// Recalls are percentages in `[0, 100]`; ranks are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RecallMetrics {
    pub r1: f64,
    pub r5: f64,
    pub r10: f64,
    pub median_rank: f64,
    pub mean_rank: f64,
}

impl RecallMetrics {
    /// Reduce 0-based ranks to metrics. Fails on an empty slice.
    pub fn from_ranks(ranks: &[usize]) -> Result<Self> {
        if ranks.is_empty() {
            return Err(CmrevalError::EmptyInput(
                "cannot compute metrics without ranks".to_string(),
            ));
        }
        Ok(Self {
            r1: recall_at_k(ranks, 1),
            r5: recall_at_k(ranks, 5),
            r10: recall_at_k(ranks, 10),
            median_rank: median_rank(ranks),
            mean_rank: mean_rank(ranks),
        })
    }

    /// Element-wise mean across folds.
    pub fn mean(results: &[RecallMetrics]) -> Result<Self> {
        if results.is_empty() {
            return Err(CmrevalError::EmptyInput(
                "cannot average zero fold results".to_string(),
            ));
        }
        let n = results.len() as f64;
        let sum = results.iter().fold(RecallMetrics::default(), |acc, m| RecallMetrics {
            r1: acc.r1 + m.r1,
            r5: acc.r5 + m.r5,
            r10: acc.r10 + m.r10,
            median_rank: acc.median_rank + m.median_rank,
            mean_rank: acc.mean_rank + m.mean_rank,
        });
        Ok(RecallMetrics {
            r1: sum.r1 / n,
            r5: sum.r5 / n,
            r10: sum.r10 / n,
            median_rank: sum.median_rank / n,
            mean_rank: sum.mean_rank / n,
        })
    }
}

impl fmt::Display for RecallMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "R@1: {:.1} R@5: {:.1} R@10: {:.1} Med: {:.1} Mean: {:.1}",
            self.r1, self.r5, self.r10, self.median_rank, self.mean_rank
        )
    }
}

/// Recall at K: percentage of queries whose rank is below `k`.
/// Returns 0.0 for an empty slice.
pub fn recall_at_k(ranks: &[usize], k: usize) -> f64 {
    if ranks.is_empty() {
        return 0.0;
    }
    let hits = ranks.iter().filter(|&&rank| rank < k).count();
    100.0 * hits as f64 / ranks.len() as f64
}

/// floor(median) + 1. Even-length input averages the two middle ranks first.
pub fn median_rank(ranks: &[usize]) -> f64 {
    if ranks.is_empty() {
        return 0.0;
    }
    let mut sorted = ranks.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
    } else {
        sorted[mid] as f64
    };
    median.floor() + 1.0
}

/// Arithmetic mean + 1.
pub fn mean_rank(ranks: &[usize]) -> f64 {
    if ranks.is_empty() {
        return 0.0;
    }
    let sum: f64 = ranks.iter().map(|&rank| rank as f64).sum();
    sum / ranks.len() as f64 + 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recall_all_first() {
        let metrics = RecallMetrics::from_ranks(&[0, 0, 0]).unwrap();
        assert_eq!(metrics.r1, 100.0);
        assert_eq!(metrics.r10, 100.0);
        assert_eq!(metrics.median_rank, 1.0);
        assert_eq!(metrics.mean_rank, 1.0);
    }

    #[test]
    fn recall_partial() {
        let ranks = [0, 3, 7, 20];
        assert_eq!(recall_at_k(&ranks, 1), 25.0);
        assert_eq!(recall_at_k(&ranks, 5), 50.0);
        assert_eq!(recall_at_k(&ranks, 10), 75.0);
    }

    #[test]
    fn recall_threshold_is_strict() {
        assert_eq!(recall_at_k(&[5], 5), 0.0);
        assert_eq!(recall_at_k(&[4], 5), 100.0);
    }

    #[test]
    fn recall_empty_is_zero() {
        assert_eq!(recall_at_k(&[], 10), 0.0);
    }

    #[test]
    fn recalls_are_monotonic() {
        let distributions: [&[usize]; 4] = [&[0, 1, 2], &[9, 10, 11], &[4, 5, 100, 0], &[50]];
        for ranks in distributions {
            let m = RecallMetrics::from_ranks(ranks).unwrap();
            assert!(m.r1 <= m.r5 && m.r5 <= m.r10, "{:?}", ranks);
        }
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median_rank(&[4, 0, 2]), 3.0);
        // median of [1, 2] is 1.5 -> floor 1 -> +1
        assert_eq!(median_rank(&[2, 1]), 2.0);
        assert_eq!(median_rank(&[0, 1, 2, 3]), 2.0);
    }

    #[test]
    fn mean_rank_is_one_based() {
        assert!((mean_rank(&[0, 1, 2, 5]) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn single_query() {
        let metrics = RecallMetrics::from_ranks(&[6]).unwrap();
        assert_eq!(metrics.r1, 0.0);
        assert_eq!(metrics.r5, 0.0);
        assert_eq!(metrics.r10, 100.0);
        assert_eq!(metrics.median_rank, 7.0);
        assert_eq!(metrics.mean_rank, 7.0);
    }

    #[test]
    fn empty_ranks_rejected() {
        assert!(matches!(
            RecallMetrics::from_ranks(&[]),
            Err(CmrevalError::EmptyInput(_))
        ));
    }

    #[test]
    fn mean_of_two_folds() {
        let perfect = RecallMetrics::from_ranks(&[0, 0]).unwrap();
        let missed = RecallMetrics::from_ranks(&[20, 30]).unwrap();
        let mean = RecallMetrics::mean(&[perfect, missed]).unwrap();
        assert_eq!(mean.r1, 50.0);
        assert_eq!(mean.r10, 50.0);
        assert_eq!(mean.median_rank, (1.0 + 26.0) / 2.0);
    }

    #[test]
    fn mean_of_nothing_rejected() {
        assert!(RecallMetrics::mean(&[]).is_err());
    }

    #[test]
    fn display_format() {
        let metrics = RecallMetrics::from_ranks(&[0, 1]).unwrap();
        assert_eq!(
            metrics.to_string(),
            "R@1: 50.0 R@5: 100.0 R@10: 100.0 Med: 1.0 Mean: 1.5"
        );
    }
}
