//! Top-N lookup over an existing rank matrix, for eyeballing retrievals.

use crate::error::Result;
use crate::rank::RankMatrix;

/// Read-only view over a [`RankMatrix`]. Never re-ranks.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalExplainer<'a> {
    rankings: &'a RankMatrix,
}

impl<'a> RetrievalExplainer<'a> {
    pub fn new(rankings: &'a RankMatrix) -> Self {
        Self { rankings }
    }

    /// The `n` best candidates for `query`, best first. `n` is clipped to the
    /// number of candidates.
    pub fn top_n(&self, query: usize, n: usize) -> Result<&'a [usize]> {
        let row = self.rankings.row(query)?;
        Ok(&row[..n.min(row.len())])
    }
}
