//! Image/text compatibility scores. Higher is always more similar.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Similarity measure used to rank candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    /// Order-embedding penalty: `-||max(text - image, 0)||_2`
    Order,
    /// Dot product of unit-normalized vectors
    Cosine,
}

impl Measure {
    /// Score one (image, text) pair. Argument order matters for [`Measure::Order`].
    pub fn score(self, image: ArrayView1<'_, f32>, text: ArrayView1<'_, f32>) -> f32 {
        match self {
            Measure::Order => order_similarity(image, text),
            Measure::Cosine => cosine_similarity(image, text),
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measure::Order => write!(f, "order"),
            Measure::Cosine => write!(f, "cosine"),
        }
    }
}

/// Dot product in fixed left-to-right order.
///
/// Inputs are expected to be L2-normalized already; nothing is re-normalized here.
pub fn cosine_similarity(image: ArrayView1<'_, f32>, text: ArrayView1<'_, f32>) -> f32 {
    image
        .iter()
        .zip(text.iter())
        .fold(0.0f32, |acc, (i, t)| acc + i * t)
}

/// Negated length of the part of `text` that exceeds `image`.
///
/// Zero when `text <= image` element-wise, i.e. the text sits above the image
/// in the partial order. Not symmetric.
pub fn order_similarity(image: ArrayView1<'_, f32>, text: ArrayView1<'_, f32>) -> f32 {
    let violation = image.iter().zip(text.iter()).fold(0.0f32, |acc, (i, t)| {
        let clipped = (t - i).max(0.0);
        acc + clipped * clipped
    });
    -violation.sqrt()
}
