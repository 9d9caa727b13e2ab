//! Show what the ranking retrieves for one image id or one caption.

use clap::Parser;
use cmreval::{
    embeddings::{load_pair, unique_images},
    eval::{GroundTruth, LabelSet, RetrievalExplainer},
    Config, Direction, Measure, ShardedRanker,
};
use std::path::PathBuf;

/// Retrieve captions for an image, or images for a caption, over the whole set.
#[derive(Parser, Debug)]
#[command(name = "explain")]
struct Args {
    /// Image id (a line of the ids file) to retrieve captions for.
    #[arg(long, conflicts_with = "caption", required_unless_present = "caption")]
    image: Option<String>,

    /// Caption text (a line of the captions file) to retrieve images for.
    #[arg(long)]
    caption: Option<String>,

    /// How many results to show.
    #[arg(long, default_value_t = 3)]
    top_n: usize,

    /// Config file (default: $CMREVAL_CONFIG or ./config.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Similarity measure (overrides config).
    #[arg(long, value_enum)]
    measure: Option<Measure>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = match args.config {
        Some(ref path) => Config::from_path(path)?,
        None => Config::load_or_default()?,
    };
    if let Some(measure) = args.measure {
        config.eval.measure = measure;
    }

    let ids_path = config
        .data
        .ids_path
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("data.ids_path is not set"))?;
    let captions_path = config
        .data
        .captions_path
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("data.captions_path is not set"))?;
    let labels = LabelSet::load(ids_path, captions_path)?;

    let (images, texts) = load_pair(&config.data)?;
    let group_size = config.eval.group_size;
    labels.validate(texts.len(), group_size)?;

    let ranker = ShardedRanker::new(config.eval.measure, config.eval.shard_size)?
        .with_parallel(config.eval.parallel);
    let unique = unique_images(images.view(), group_size)?;

    if let Some(ref image_id) = args.image {
        let query = labels
            .image_index(image_id)
            .ok_or_else(|| anyhow::anyhow!("Unknown image id: {}", image_id))?;
        let rankings = ranker.rank(Direction::ImageToText, unique, texts.view())?;
        let explainer = RetrievalExplainer::new(&rankings);

        println!("Top {} captions: ", args.top_n);
        for &index in explainer.top_n(query, args.top_n)? {
            println!("{}", labels.caption(index).unwrap_or("<missing caption>"));
        }
        println!("------------------------------------");
        println!("GT captions: ");
        for index in LabelSet::caption_rows(query, group_size) {
            println!("{}", labels.caption(index).unwrap_or("<missing caption>"));
        }
        let rank = GroundTruth::new(group_size)?.query_rank(Direction::ImageToText, &rankings, query)?;
        println!("Best GT caption rank: {}", rank + 1);
    } else if let Some(ref caption) = args.caption {
        let query = labels
            .caption_index(caption)
            .ok_or_else(|| anyhow::anyhow!("Unknown caption: {}", caption))?;
        let rankings = ranker.rank(Direction::TextToImage, texts.view(), unique)?;
        let explainer = RetrievalExplainer::new(&rankings);

        println!("Top {} Images: ", args.top_n);
        for &index in explainer.top_n(query, args.top_n)? {
            println!("{}", labels.image_id(index).unwrap_or("<missing image id>"));
        }
        println!("------------------------------------");
        println!(
            "GT image: {}",
            labels.image_id(query / group_size).unwrap_or("<missing image id>")
        );
    }

    Ok(())
}
