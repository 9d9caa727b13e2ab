//! Image ids and caption strings for printing retrievals.

use crate::error::{CmrevalError, Result};
use std::ops::Range;
use std::path::Path;

/// Line-aligned labels: one id per unique image, one caption per text row.
#[derive(Debug, Clone, Default)]
pub struct LabelSet {
    image_ids: Vec<String>,
    captions: Vec<String>,
}

impl LabelSet {
    /// Read both label files; lines are trimmed, blank trailing lines dropped.
    pub fn load(ids_path: &Path, captions_path: &Path) -> Result<Self> {
        let ids = std::fs::read_to_string(ids_path)?;
        let captions = std::fs::read_to_string(captions_path)?;
        Ok(Self::from_lines(&ids, &captions))
    }

    pub fn from_lines(ids: &str, captions: &str) -> Self {
        Self {
            image_ids: trimmed_lines(ids),
            captions: trimmed_lines(captions),
        }
    }

    pub fn num_images(&self) -> usize {
        self.image_ids.len()
    }

    pub fn num_captions(&self) -> usize {
        self.captions.len()
    }

    /// Check the labels line up with `num_texts` caption rows grouped by `group_size`.
    pub fn validate(&self, num_texts: usize, group_size: usize) -> Result<()> {
        if self.captions.len() != num_texts {
            return Err(CmrevalError::ShapeMismatch(format!(
                "{} captions for {} text embeddings",
                self.captions.len(),
                num_texts
            )));
        }
        if group_size == 0 || self.image_ids.len() * group_size != num_texts {
            return Err(CmrevalError::ShapeMismatch(format!(
                "{} image ids for {} text embeddings in groups of {}",
                self.image_ids.len(),
                num_texts,
                group_size
            )));
        }
        Ok(())
    }

    pub fn image_index(&self, id: &str) -> Option<usize> {
        self.image_ids.iter().position(|i| i == id)
    }

    /// First caption row whose text matches exactly.
    pub fn caption_index(&self, caption: &str) -> Option<usize> {
        let caption = caption.trim();
        self.captions.iter().position(|c| c == caption)
    }

    pub fn image_id(&self, index: usize) -> Option<&str> {
        self.image_ids.get(index).map(String::as_str)
    }

    pub fn caption(&self, index: usize) -> Option<&str> {
        self.captions.get(index).map(String::as_str)
    }

    /// Caption rows belonging to image `index`.
    pub fn caption_rows(index: usize, group_size: usize) -> Range<usize> {
        index * group_size..(index + 1) * group_size
    }
}

fn trimmed_lines(content: &str) -> Vec<String> {
    let mut lines: Vec<String> = content.lines().map(|l| l.trim().to_string()).collect();
    while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
        lines.pop();
    }
    lines
}
