//! Full candidate ranking for a batch of queries, computed shard by shard.
//!
//! Only one (shard_size × num_candidates) score block is alive per worker at a
//! time, so peak memory is bounded by the shard size rather than by
//! `num_queries × num_candidates`. The shard size never changes the output.

use super::{Direction, Measure, RankMatrix};
use crate::error::{CmrevalError, Result};
use ndarray::{s, Array2, ArrayView1, ArrayView2};
use rayon::prelude::*;
use std::cmp::Ordering;

/// Default number of queries scored per shard.
pub const DEFAULT_SHARD_SIZE: usize = 25;

/// Ranks every candidate for every query under one similarity measure.
#[derive(Debug, Clone)]
pub struct ShardedRanker {
    measure: Measure,
    shard_size: usize,
    parallel: bool,
}

impl ShardedRanker {
    /// Create a sequential ranker. Fails if `shard_size` is zero.
    pub fn new(measure: Measure, shard_size: usize) -> Result<Self> {
        if shard_size == 0 {
            return Err(CmrevalError::Config(
                "shard_size must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            measure,
            shard_size,
            parallel: false,
        })
    }

    /// Process shards on the rayon pool instead of one after another.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn measure(&self) -> Measure {
        self.measure
    }

    pub fn shard_size(&self) -> usize {
        self.shard_size
    }

    /// Rank all `candidates` for each row of `queries`.
    ///
    /// # Arguments
    ///
    /// * `direction` - Which modality the queries belong to (decides argument order for the measure)
    /// * `queries` - Q × D query embeddings
    /// * `candidates` - C × D candidate embeddings
    ///
    /// # Returns
    ///
    /// A Q × C [`RankMatrix`]. Equal scores are ordered by ascending candidate index.
    pub fn rank(
        &self,
        direction: Direction,
        queries: ArrayView2<'_, f32>,
        candidates: ArrayView2<'_, f32>,
    ) -> Result<RankMatrix> {
        let num_queries = queries.nrows();
        let num_candidates = candidates.nrows();
        if num_queries == 0 {
            return Err(CmrevalError::EmptyInput("no query embeddings".to_string()));
        }
        if num_candidates == 0 {
            return Err(CmrevalError::EmptyInput(
                "no candidate embeddings".to_string(),
            ));
        }
        if queries.ncols() != candidates.ncols() {
            return Err(CmrevalError::ShapeMismatch(format!(
                "query dimension {} != candidate dimension {}",
                queries.ncols(),
                candidates.ncols()
            )));
        }

        let mut indices = vec![0usize; num_queries * num_candidates];
        let shard_rows = self.shard_size.min(num_queries);
        let block = shard_rows * num_candidates;
        let rank_block = |(shard, out): (usize, &mut [usize])| {
            let start = shard * shard_rows;
            let rows = out.len() / num_candidates;
            log::debug!(
                "{}: ranking queries {}..{} against {} candidates",
                direction,
                start,
                start + rows,
                num_candidates
            );
            let shard_queries = queries.slice(s![start..start + rows, ..]);
            self.rank_shard(direction, shard_queries, candidates, out);
        };

        if self.parallel {
            indices.par_chunks_mut(block).enumerate().for_each(rank_block);
        } else {
            indices.chunks_mut(block).enumerate().for_each(rank_block);
        }

        RankMatrix::from_shape_vec(num_queries, num_candidates, indices)
    }

    /// Score one shard against every candidate and write its sorted rows into `out`.
    fn rank_shard(
        &self,
        direction: Direction,
        shard_queries: ArrayView2<'_, f32>,
        candidates: ArrayView2<'_, f32>,
        out: &mut [usize],
    ) {
        let num_candidates = candidates.nrows();
        let mut scores = Array2::<f32>::zeros((shard_queries.nrows(), num_candidates));
        for (query, mut row) in shard_queries.outer_iter().zip(scores.outer_iter_mut()) {
            for (candidate, slot) in candidates.outer_iter().zip(row.iter_mut()) {
                *slot = direction.score(self.measure, query, candidate);
            }
        }
        for (row_scores, row_out) in scores.outer_iter().zip(out.chunks_mut(num_candidates)) {
            argsort_descending(row_scores, row_out);
        }
    }
}

/// Fill `out` with `0..n` sorted by descending score, ties by ascending index.
fn argsort_descending(scores: ArrayView1<'_, f32>, out: &mut [usize]) {
    for (index, slot) in out.iter_mut().enumerate() {
        *slot = index;
    }
    out.sort_unstable_by(|&a, &b| compare_descending(scores[a], scores[b]).then(a.cmp(&b)));
}

/// Total order on scores, highest first. NaN ranks below every number and
/// -0.0 compares equal to 0.0.
fn compare_descending(a: f32, b: f32) -> Ordering {
    sort_key(b).total_cmp(&sort_key(a))
}

fn sort_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score + 0.0
    }
}
