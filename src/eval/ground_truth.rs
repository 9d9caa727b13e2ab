//! Ground-truth resolution under the fixed images-to-captions grouping.
//!
//! Each unique image `i` owns the caption rows `[g*i, g*i + g)`. A caption query
//! has exactly one correct image; an image query is credited with its best
//! ranked caption.

use crate::error::{CmrevalError, Result};
use crate::rank::{Direction, RankMatrix};
use std::ops::Range;

/// Number of captions aligned to each image unless configured otherwise.
pub const DEFAULT_GROUP_SIZE: usize = 5;

/// Per-query ranks and top-1 candidates for one direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRanks {
    /// 0-based position of the best correct candidate
    pub ranks: Vec<usize>,
    /// Candidate ranked first for each query
    pub top1: Vec<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct GroundTruth {
    group_size: usize,
}

impl GroundTruth {
    pub fn new(group_size: usize) -> Result<Self> {
        if group_size == 0 {
            return Err(CmrevalError::Config(
                "group_size must be greater than 0".to_string(),
            ));
        }
        Ok(Self { group_size })
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Number of unique images behind `num_texts` caption rows.
    pub fn num_groups(&self, num_texts: usize) -> Result<usize> {
        if num_texts % self.group_size != 0 {
            return Err(CmrevalError::IndexOutOfRange(format!(
                "{} items is not a multiple of group size {}",
                num_texts, self.group_size
            )));
        }
        Ok(num_texts / self.group_size)
    }

    /// Candidate indices that count as correct for `query`.
    ///
    /// Saturates instead of overflowing; a saturated range matches no
    /// candidate of any real rank matrix.
    pub fn targets(&self, direction: Direction, query: usize) -> Range<usize> {
        match direction {
            Direction::ImageToText => {
                let first = query.saturating_mul(self.group_size);
                first..first.saturating_add(self.group_size)
            }
            Direction::TextToImage => {
                let image = query / self.group_size;
                image..image + 1
            }
        }
    }

    /// Lowest 0-based position of any correct candidate in the query's ranking.
    pub fn query_rank(
        &self,
        direction: Direction,
        rankings: &RankMatrix,
        query: usize,
    ) -> Result<usize> {
        let row = rankings.row(query)?;
        let targets = self.targets(direction, query);
        row.iter()
            .position(|candidate| targets.contains(candidate))
            .ok_or_else(|| {
                CmrevalError::IndexOutOfRange(format!(
                    "no ground truth in {:?} ranked for query {}",
                    targets, query
                ))
            })
    }

    /// Ranks and top-1 candidates for every query of `rankings`.
    ///
    /// The matrix must be (N/g × N) for image queries or (N × N/g) for caption
    /// queries.
    pub fn resolve(&self, direction: Direction, rankings: &RankMatrix) -> Result<QueryRanks> {
        let num_texts = match direction {
            Direction::ImageToText => rankings.num_candidates(),
            Direction::TextToImage => rankings.num_queries(),
        };
        let num_images = self.num_groups(num_texts)?;
        let expected = match direction {
            Direction::ImageToText => (num_images, num_texts),
            Direction::TextToImage => (num_texts, num_images),
        };
        let actual = (rankings.num_queries(), rankings.num_candidates());
        if actual != expected {
            return Err(CmrevalError::IndexOutOfRange(format!(
                "{} rank matrix is {:?}, expected {:?} for group size {}",
                direction, actual, expected, self.group_size
            )));
        }

        let mut ranks = Vec::with_capacity(actual.0);
        let mut top1 = Vec::with_capacity(actual.0);
        for query in 0..actual.0 {
            ranks.push(self.query_rank(direction, rankings, query)?);
            top1.push(rankings.row(query)?[0]);
        }
        Ok(QueryRanks { ranks, top1 })
    }
}

impl Default for GroundTruth {
    fn default() -> Self {
        Self {
            group_size: DEFAULT_GROUP_SIZE,
        }
    }
}
