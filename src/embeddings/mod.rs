//! Embedding matrices supplied by the upstream encoder, plus load-time
//! preprocessing.

pub mod storage;

pub use storage::{load_embeddings, load_pair, parse_f32_blob, write_raw_f32};

use crate::error::{CmrevalError, Result};
use ndarray::{s, Array2, ArrayView2, Axis};

/// Every `group_size`-th row: the de-duplicated image embeddings.
///
/// A strided view into `images`, nothing is copied. Fails if `group_size` is zero.
pub fn unique_images(images: ArrayView2<'_, f32>, group_size: usize) -> Result<ArrayView2<'_, f32>> {
    let step = isize::try_from(group_size)
        .ok()
        .filter(|&step| step > 0)
        .ok_or_else(|| {
            CmrevalError::Config(format!("group_size {} is not a valid row stride", group_size))
        })?;
    Ok(images.slice_move(s![..;step, ..]))
}

/// N × D embedding matrix for one modality.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingSet {
    matrix: Array2<f32>,
}

impl EmbeddingSet {
    pub fn from_array(matrix: Array2<f32>) -> Self {
        Self { matrix }
    }

    /// Build from row vectors. Every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let dims = rows
            .first()
            .map(Vec::len)
            .ok_or_else(|| CmrevalError::EmptyInput("embedding set has no rows".to_string()))?;
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != dims) {
            return Err(CmrevalError::ShapeMismatch(format!(
                "row {} has {} values, expected {}",
                index,
                row.len(),
                dims
            )));
        }
        let num_rows = rows.len();
        let flat: Vec<f32> = rows.into_iter().flatten().collect();
        let matrix = Array2::from_shape_vec((num_rows, dims), flat)
            .map_err(|e| CmrevalError::ShapeMismatch(e.to_string()))?;
        Ok(Self { matrix })
    }

    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.nrows() == 0
    }

    pub fn dimensions(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.matrix.view()
    }

    pub fn into_array(self) -> Array2<f32> {
        self.matrix
    }

    /// Scale every row to unit L2 norm. All-zero rows are left as they are.
    pub fn l2_normalize(&mut self) {
        for mut row in self.matrix.axis_iter_mut(Axis(0)) {
            let norm = row.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                row.mapv_inplace(|x| x / norm);
            }
        }
    }

    /// Replace every value by its absolute value.
    pub fn abs_in_place(&mut self) {
        self.matrix.mapv_inplace(f32::abs);
    }

    /// View of the first row of each group of `group_size` image rows.
    pub fn unique_images(&self, group_size: usize) -> Result<ArrayView2<'_, f32>> {
        unique_images(self.view(), group_size)
    }

    /// Count groups whose rows are not all copies of the group's first row.
    ///
    /// Only the first row of a group takes part in ranking, so a non-zero count
    /// means the image file is not laid out the way the captions assume.
    pub fn check_image_groups(&self, group_size: usize) -> Result<usize> {
        if group_size == 0 || self.len() % group_size != 0 {
            return Err(CmrevalError::IndexOutOfRange(format!(
                "{} rows is not a multiple of group size {}",
                self.len(),
                group_size
            )));
        }
        let mismatched = self
            .matrix
            .axis_chunks_iter(Axis(0), group_size)
            .filter(|group| {
                let first = group.row(0);
                group.outer_iter().skip(1).any(|row| row != first)
            })
            .count();
        if mismatched > 0 {
            log::warn!(
                "{} of {} image groups contain differing rows; only the first row of each group is ranked",
                mismatched,
                self.len() / group_size
            );
        }
        Ok(mismatched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_from_rows() {
        let set = EmbeddingSet::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.dimensions(), 2);
        assert_eq!(set.view()[[1, 0]], 3.0);
    }

    #[test]
    fn test_from_rows_ragged() {
        let result = EmbeddingSet::from_rows(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(result, Err(CmrevalError::ShapeMismatch(_))));
    }

    #[test]
    fn test_from_rows_empty() {
        assert!(matches!(
            EmbeddingSet::from_rows(Vec::new()),
            Err(CmrevalError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_unique_images_is_strided() {
        let images = arr2(&[[0.0f32], [0.0], [1.0], [1.0], [2.0], [2.0]]);
        let unique = unique_images(images.view(), 2).unwrap();
        assert_eq!(unique, arr2(&[[0.0f32], [1.0], [2.0]]));
    }

    #[test]
    fn test_unique_images_zero_group_size() {
        let set = EmbeddingSet::from_array(arr2(&[[0.0f32], [1.0]]));
        assert!(matches!(set.unique_images(0), Err(CmrevalError::Config(_))));
        assert_eq!(set.unique_images(1).unwrap().nrows(), 2);
    }

    #[test]
    fn test_l2_normalize() {
        let mut set = EmbeddingSet::from_array(arr2(&[[3.0f32, 4.0], [0.0, 0.0]]));
        set.l2_normalize();
        let view = set.view();
        assert!((view[[0, 0]] - 0.6).abs() < 1e-6);
        assert!((view[[0, 1]] - 0.8).abs() < 1e-6);
        assert_eq!(view[[1, 0]], 0.0);
    }

    #[test]
    fn test_abs_in_place() {
        let mut set = EmbeddingSet::from_array(arr2(&[[-0.5f32, 0.25]]));
        set.abs_in_place();
        assert_eq!(set.view(), arr2(&[[0.5f32, 0.25]]));
    }

    #[test]
    fn test_check_image_groups() {
        let set = EmbeddingSet::from_array(arr2(&[[1.0f32], [1.0], [2.0], [3.0]]));
        assert_eq!(set.check_image_groups(2).unwrap(), 1);
        assert_eq!(set.check_image_groups(1).unwrap(), 0);
        assert!(set.check_image_groups(3).is_err());
    }
}
