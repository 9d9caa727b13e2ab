use anyhow::Result;
use cmreval::embeddings::load_pair;
use cmreval::eval::EvaluationReport;
use cmreval::{Config, FoldEvaluator};

fn main() -> Result<()> {
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", config.report.log_level.as_str()),
    )
    .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("verify");

    match command {
        "evaluate" => run_evaluation(&config)?,
        "verify" | _ => run_verification(&config)?,
    }

    Ok(())
}

/// Load both embedding sets and check they can be evaluated with the configured settings.
fn run_verification(config: &Config) -> Result<()> {
    let (images, texts) = load_pair(&config.data)?;
    let group_size = config.eval.group_size;

    println!("Images: {} x {}", images.len(), images.dimensions());
    println!("Texts:  {} x {}", texts.len(), texts.dimensions());

    let mismatched = images.check_image_groups(group_size)?;
    println!(
        "Unique images: {} (groups with differing rows: {})",
        images.len() / group_size,
        mismatched
    );

    let evaluator = FoldEvaluator::new(config.eval.clone())?;
    let folds = evaluator.fold_ranges(texts.len())?;
    println!("Folds: {}", folds.len());
    for (index, rows) in folds.iter().enumerate() {
        println!("  Fold {}: rows {}..{}", index, rows.start, rows.end);
    }

    println!("\n✅ Inputs are valid for {} evaluation", config.eval.measure);
    Ok(())
}

/// Evaluate with config values only; see the `eval` binary for CLI overrides.
fn run_evaluation(config: &Config) -> Result<()> {
    let (images, texts) = load_pair(&config.data)?;
    let evaluator = FoldEvaluator::new(config.eval.clone())?;
    let evaluation = evaluator.evaluate(images.view(), texts.view())?;

    println!("Image to text: {}", evaluation.image_to_text);
    println!("Text to image: {}", evaluation.text_to_image);

    if let Some(ref path) = config.report.output_path {
        EvaluationReport::new(&config.eval, texts.len(), &evaluation).write_json(path)?;
    }
    Ok(())
}
