//! Evaluation CLI: rank image/caption embeddings both ways and report R@1/5/10,
//! median and mean rank per fold and averaged over folds.

use clap::Parser;
use cmreval::{
    embeddings::load_pair,
    eval::{EvaluationReport, FoldEvaluator},
    Config, Measure,
};
use std::path::PathBuf;
use std::time::Instant;

/// Cross-modal retrieval evaluation. Flags override config.toml.
#[derive(Parser, Debug)]
#[command(name = "eval")]
struct Args {
    /// Config file (default: $CMREVAL_CONFIG or ./config.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Image embeddings (.json or raw little-endian f32).
    #[arg(long)]
    images: Option<PathBuf>,

    /// Caption embeddings aligned to --images.
    #[arg(long)]
    texts: Option<PathBuf>,

    /// Embedding dimension, needed for raw f32 files.
    #[arg(long)]
    dimensions: Option<usize>,

    /// Similarity measure.
    #[arg(long, value_enum)]
    measure: Option<Measure>,

    /// Queries scored per shard.
    #[arg(long)]
    shard_size: Option<usize>,

    /// Number of folds (1 evaluates the whole set at once).
    #[arg(long)]
    num_folds: Option<usize>,

    /// Caption rows per fold.
    #[arg(long)]
    fold_size: Option<usize>,

    /// Captions per image.
    #[arg(long)]
    group_size: Option<usize>,

    /// Rank shards in parallel.
    #[arg(long)]
    parallel: bool,

    /// L2-normalize embeddings after loading.
    #[arg(long)]
    normalize: bool,

    /// Use absolute values of the embeddings.
    #[arg(long)]
    use_abs: bool,

    /// Write a JSON report to this path.
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Args {
    fn apply(self, mut config: Config) -> anyhow::Result<Config> {
        if self.images.is_some() {
            config.data.images_path = self.images;
        }
        if self.texts.is_some() {
            config.data.texts_path = self.texts;
        }
        if self.dimensions.is_some() {
            config.data.dimensions = self.dimensions;
        }
        if let Some(measure) = self.measure {
            config.eval.measure = measure;
        }
        if let Some(shard_size) = self.shard_size {
            config.eval.shard_size = shard_size;
        }
        if let Some(num_folds) = self.num_folds {
            config.eval.num_folds = num_folds;
        }
        if let Some(fold_size) = self.fold_size {
            config.eval.fold_size = fold_size;
        }
        if let Some(group_size) = self.group_size {
            config.eval.group_size = group_size;
        }
        config.eval.parallel |= self.parallel;
        config.data.normalize |= self.normalize;
        config.data.use_abs |= self.use_abs;
        if self.output.is_some() {
            config.report.output_path = self.output;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = match args.config {
        Some(ref path) => Config::from_path(path)?,
        None => Config::load_or_default()?,
    };
    let config = args.apply(config)?;

    println!("--------------------------------");
    println!("{:#?}", config.eval);
    println!("--------------------------------");

    let (images, texts) = load_pair(&config.data)?;
    println!("Total number of validation samples: {}", texts.len());

    let evaluator = FoldEvaluator::new(config.eval.clone())?;
    let start = Instant::now();
    let evaluation = evaluator.evaluate(images.view(), texts.view())?;
    let duration = start.elapsed();

    for fold in &evaluation.folds {
        println!("Fold: {}", fold.index);
        println!("Image to Text: ");
        println!("{}", fold.image_to_text.metrics);
        println!("Text to Image: ");
        println!("{}", fold.text_to_image.metrics);
        println!("---------------------------------------------");
    }

    let i2t = evaluation.image_to_text;
    let t2i = evaluation.text_to_image;
    println!("Mean metrics: ");
    println!(
        "Image to text: {:.1} {:.1} {:.1} {:.1} {:.1}",
        i2t.r1, i2t.r5, i2t.r10, i2t.median_rank, i2t.mean_rank
    );
    println!(
        "Text to image: {:.1} {:.1} {:.1} {:.1} {:.1}",
        t2i.r1, t2i.r5, t2i.r10, t2i.median_rank, t2i.mean_rank
    );
    println!("Latency: {:?}", duration);

    if let Some(ref path) = config.report.output_path {
        EvaluationReport::new(&config.eval, texts.len(), &evaluation).write_json(path)?;
    }

    Ok(())
}
