//! Similarity measures and sharded ranking of candidates per query.

pub mod ranker;
pub mod similarity;

pub use ranker::ShardedRanker;
pub use similarity::Measure;

use crate::error::{CmrevalError, Result};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which modality plays the query role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Query = one unique image, candidates = all captions
    ImageToText,
    /// Query = one caption, candidates = all unique images
    TextToImage,
}

impl Direction {
    /// Score a (query, candidate) pair, passing image and text to the measure in
    /// the right argument positions.
    pub fn score(
        self,
        measure: Measure,
        query: ArrayView1<'_, f32>,
        candidate: ArrayView1<'_, f32>,
    ) -> f32 {
        match self {
            Direction::ImageToText => measure.score(query, candidate),
            Direction::TextToImage => measure.score(candidate, query),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ImageToText => write!(f, "Image to Text"),
            Direction::TextToImage => write!(f, "Text to Image"),
        }
    }
}

/// Candidate indices per query, ordered by descending similarity.
///
/// Row `r` is the full ordering for query `r`. Built once by
/// [`ShardedRanker::rank`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankMatrix {
    indices: Array2<usize>,
}

impl RankMatrix {
    pub(crate) fn from_shape_vec(
        num_queries: usize,
        num_candidates: usize,
        indices: Vec<usize>,
    ) -> Result<Self> {
        let indices = Array2::from_shape_vec((num_queries, num_candidates), indices)
            .map_err(|e| CmrevalError::ShapeMismatch(format!("rank matrix: {}", e)))?;
        Ok(Self { indices })
    }

    pub fn num_queries(&self) -> usize {
        self.indices.nrows()
    }

    pub fn num_candidates(&self) -> usize {
        self.indices.ncols()
    }

    /// Full candidate ordering for one query.
    pub fn row(&self, query: usize) -> Result<&[usize]> {
        if query >= self.num_queries() {
            return Err(CmrevalError::IndexOutOfRange(format!(
                "query {} outside rank matrix with {} rows",
                query,
                self.num_queries()
            )));
        }
        self.indices.row(query).to_slice().ok_or_else(|| {
            CmrevalError::ShapeMismatch("rank matrix row is not contiguous".to_string())
        })
    }

    /// 0-based position of `candidate` in the ordering for `query`.
    pub fn position(&self, query: usize, candidate: usize) -> Result<usize> {
        self.row(query)?
            .iter()
            .position(|&c| c == candidate)
            .ok_or_else(|| {
                CmrevalError::IndexOutOfRange(format!(
                    "candidate {} not ranked for query {}",
                    candidate, query
                ))
            })
    }

    pub fn as_array(&self) -> &Array2<usize> {
        &self.indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_direction_swaps_arguments_for_text_queries() {
        let image = arr1(&[0.0f32, 0.0]);
        let text = arr1(&[1.0f32, 0.0]);
        let i2t = Direction::ImageToText.score(Measure::Order, image.view(), text.view());
        let t2i = Direction::TextToImage.score(Measure::Order, text.view(), image.view());
        assert_eq!(i2t, t2i);
        assert!((i2t + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rank_matrix_row_and_position() {
        let rankings = RankMatrix::from_shape_vec(2, 3, vec![2, 0, 1, 1, 2, 0]).unwrap();
        assert_eq!(rankings.num_queries(), 2);
        assert_eq!(rankings.num_candidates(), 3);
        assert_eq!(rankings.row(1).unwrap(), &[1, 2, 0]);
        assert_eq!(rankings.position(0, 1).unwrap(), 2);
    }

    #[test]
    fn test_rank_matrix_out_of_range() {
        let rankings = RankMatrix::from_shape_vec(1, 2, vec![1, 0]).unwrap();
        assert!(matches!(
            rankings.row(1),
            Err(CmrevalError::IndexOutOfRange(_))
        ));
        assert!(matches!(
            rankings.position(0, 7),
            Err(CmrevalError::IndexOutOfRange(_))
        ));
    }

    #[test]
    fn test_rank_matrix_rejects_bad_shape() {
        let result = RankMatrix::from_shape_vec(2, 2, vec![0, 1, 0]);
        assert!(matches!(result, Err(CmrevalError::ShapeMismatch(_))));
    }
}
