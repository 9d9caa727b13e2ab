//! Contiguous k-fold evaluation in both retrieval directions.

use crate::embeddings::unique_images;
use crate::error::{CmrevalError, Result};
use crate::eval::ground_truth::{GroundTruth, DEFAULT_GROUP_SIZE};
use crate::eval::metrics::RecallMetrics;
use crate::rank::ranker::DEFAULT_SHARD_SIZE;
use crate::rank::{Direction, Measure, RankMatrix, ShardedRanker};
use ndarray::{s, ArrayView2};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Evaluation parameters. Doubles as the `[eval]` section of `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalSettings {
    pub measure: Measure,
    /// Queries scored per shard
    pub shard_size: usize,
    /// 1 evaluates the whole set as a single fold
    pub num_folds: usize,
    /// Caption rows per fold when `num_folds > 1`
    pub fold_size: usize,
    /// Captions aligned to each image
    pub group_size: usize,
    /// Rank shards on the rayon pool
    pub parallel: bool,
    /// Keep each fold's rank matrices in the result
    pub retain_rankings: bool,
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self {
            measure: Measure::Cosine,
            shard_size: DEFAULT_SHARD_SIZE,
            num_folds: 5,
            fold_size: 5000,
            group_size: DEFAULT_GROUP_SIZE,
            parallel: false,
            retain_rankings: false,
        }
    }
}

impl EvalSettings {
    /// Check parameters that do not depend on the input size.
    pub fn validate(&self) -> Result<()> {
        if self.shard_size == 0 {
            return Err(CmrevalError::Config("shard_size must be greater than 0".to_string()));
        }
        if self.num_folds == 0 {
            return Err(CmrevalError::Config("num_folds must be greater than 0".to_string()));
        }
        if self.group_size == 0 {
            return Err(CmrevalError::Config("group_size must be greater than 0".to_string()));
        }
        if self.num_folds > 1 {
            if self.fold_size == 0 {
                return Err(CmrevalError::Config("fold_size must be greater than 0".to_string()));
            }
            if self.fold_size % self.group_size != 0 {
                return Err(CmrevalError::Config(format!(
                    "fold_size {} is not a multiple of group_size {}",
                    self.fold_size, self.group_size
                )));
            }
        }
        Ok(())
    }
}

/// One direction's result within a fold.
#[derive(Debug, Clone)]
pub struct DirectionOutcome {
    pub direction: Direction,
    pub metrics: RecallMetrics,
    /// 0-based rank per query
    pub ranks: Vec<usize>,
    /// Top-ranked candidate per query
    pub top1: Vec<usize>,
    /// Present when `retain_rankings` is set
    pub rankings: Option<RankMatrix>,
}

#[derive(Debug, Clone)]
pub struct FoldOutcome {
    pub index: usize,
    /// Caption/image rows covered by this fold in the full embedding sets
    pub rows: Range<usize>,
    pub image_to_text: DirectionOutcome,
    pub text_to_image: DirectionOutcome,
}

/// All folds plus the across-fold mean per direction.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub folds: Vec<FoldOutcome>,
    pub image_to_text: RecallMetrics,
    pub text_to_image: RecallMetrics,
}

/// Runs both retrieval directions over contiguous folds and averages them.
#[derive(Debug, Clone)]
pub struct FoldEvaluator {
    settings: EvalSettings,
    ranker: ShardedRanker,
    truth: GroundTruth,
}

impl FoldEvaluator {
    pub fn new(settings: EvalSettings) -> Result<Self> {
        settings.validate()?;
        let ranker =
            ShardedRanker::new(settings.measure, settings.shard_size)?.with_parallel(settings.parallel);
        let truth = GroundTruth::new(settings.group_size)?;
        Ok(Self {
            settings,
            ranker,
            truth,
        })
    }

    pub fn settings(&self) -> &EvalSettings {
        &self.settings
    }

    /// Row ranges of each fold for `num_items` aligned image/caption rows.
    pub fn fold_ranges(&self, num_items: usize) -> Result<Vec<Range<usize>>> {
        self.truth.num_groups(num_items)?;
        if self.settings.num_folds == 1 {
            return Ok(vec![0..num_items]);
        }
        let fold_size = self.settings.fold_size;
        if num_items % fold_size != 0 {
            return Err(CmrevalError::Config(format!(
                "{} items cannot be split into folds of {}",
                num_items, fold_size
            )));
        }
        let covered = self
            .settings
            .num_folds
            .checked_mul(fold_size)
            .filter(|&covered| covered <= num_items)
            .ok_or_else(|| {
                CmrevalError::Config(format!(
                    "{} folds of {} need more than the {} items given",
                    self.settings.num_folds, fold_size, num_items
                ))
            })?;
        if covered < num_items {
            log::warn!(
                "Evaluating first {} of {} items ({} folds of {})",
                covered,
                num_items,
                self.settings.num_folds,
                fold_size
            );
        }
        Ok((0..self.settings.num_folds)
            .map(|fold| fold * fold_size..(fold + 1) * fold_size)
            .collect())
    }

    /// Evaluate all folds. Inputs are validated before any ranking starts.
    ///
    /// # Arguments
    ///
    /// * `images` - N × D image embeddings, each unique image repeated `group_size` times
    /// * `texts` - N × D caption embeddings aligned to `images`
    pub fn evaluate(
        &self,
        images: ArrayView2<'_, f32>,
        texts: ArrayView2<'_, f32>,
    ) -> Result<Evaluation> {
        validate_pair(images, texts)?;
        let ranges = self.fold_ranges(texts.nrows())?;

        let mut folds = Vec::with_capacity(ranges.len());
        for (index, rows) in ranges.into_iter().enumerate() {
            log::info!("Fold {}: rows {}..{}", index, rows.start, rows.end);
            let fold_images = images.slice(s![rows.clone(), ..]);
            let fold_texts = texts.slice(s![rows.clone(), ..]);
            let (image_to_text, text_to_image) = self.evaluate_fold(fold_images, fold_texts)?;
            log::info!("{}: {}", Direction::ImageToText, image_to_text.metrics);
            log::info!("{}: {}", Direction::TextToImage, text_to_image.metrics);
            folds.push(FoldOutcome {
                index,
                rows,
                image_to_text,
                text_to_image,
            });
        }

        let i2t: Vec<RecallMetrics> = folds.iter().map(|f| f.image_to_text.metrics).collect();
        let t2i: Vec<RecallMetrics> = folds.iter().map(|f| f.text_to_image.metrics).collect();
        Ok(Evaluation {
            image_to_text: RecallMetrics::mean(&i2t)?,
            text_to_image: RecallMetrics::mean(&t2i)?,
            folds,
        })
    }

    /// Rank and score one fold in both directions.
    pub fn evaluate_fold(
        &self,
        images: ArrayView2<'_, f32>,
        texts: ArrayView2<'_, f32>,
    ) -> Result<(DirectionOutcome, DirectionOutcome)> {
        validate_pair(images, texts)?;
        self.truth.num_groups(texts.nrows())?;
        let unique = unique_images(images, self.settings.group_size)?;

        let image_to_text = self.run_direction(Direction::ImageToText, unique, texts)?;
        let text_to_image = self.run_direction(Direction::TextToImage, texts, unique)?;
        Ok((image_to_text, text_to_image))
    }

    fn run_direction(
        &self,
        direction: Direction,
        queries: ArrayView2<'_, f32>,
        candidates: ArrayView2<'_, f32>,
    ) -> Result<DirectionOutcome> {
        let rankings = self.ranker.rank(direction, queries, candidates)?;
        let resolved = self.truth.resolve(direction, &rankings)?;
        let metrics = RecallMetrics::from_ranks(&resolved.ranks)?;
        Ok(DirectionOutcome {
            direction,
            metrics,
            ranks: resolved.ranks,
            top1: resolved.top1,
            rankings: self.settings.retain_rankings.then_some(rankings),
        })
    }
}

fn validate_pair(images: ArrayView2<'_, f32>, texts: ArrayView2<'_, f32>) -> Result<()> {
    if images.nrows() == 0 || texts.nrows() == 0 {
        return Err(CmrevalError::EmptyInput(format!(
            "{} image rows, {} text rows",
            images.nrows(),
            texts.nrows()
        )));
    }
    if images.nrows() != texts.nrows() {
        return Err(CmrevalError::ShapeMismatch(format!(
            "{} image rows != {} text rows",
            images.nrows(),
            texts.nrows()
        )));
    }
    if images.ncols() != texts.ncols() {
        return Err(CmrevalError::ShapeMismatch(format!(
            "image dimension {} != text dimension {}",
            images.ncols(),
            texts.ncols()
        )));
    }
    Ok(())
}
