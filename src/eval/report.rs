//! JSON evaluation report.

use crate::error::Result;
use crate::eval::folds::{EvalSettings, Evaluation};
use crate::eval::metrics::RecallMetrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldReport {
    pub fold: usize,
    pub start: usize,
    pub end: usize,
    pub image_to_text: RecallMetrics,
    pub text_to_image: RecallMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub generated_at: DateTime<Utc>,
    pub settings: EvalSettings,
    pub num_items: usize,
    pub folds: Vec<FoldReport>,
    pub image_to_text: RecallMetrics,
    pub text_to_image: RecallMetrics,
}

impl EvaluationReport {
    pub fn new(settings: &EvalSettings, num_items: usize, evaluation: &Evaluation) -> Self {
        let folds = evaluation
            .folds
            .iter()
            .map(|fold| FoldReport {
                fold: fold.index,
                start: fold.rows.start,
                end: fold.rows.end,
                image_to_text: fold.image_to_text.metrics,
                text_to_image: fold.text_to_image.metrics,
            })
            .collect();
        Self {
            generated_at: Utc::now(),
            settings: settings.clone(),
            num_items,
            folds,
            image_to_text: evaluation.image_to_text,
            text_to_image: evaluation.text_to_image,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        log::info!("Wrote evaluation report to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::folds::FoldEvaluator;
    use ndarray::Array2;
    use tempfile::TempDir;

    fn sample_evaluation() -> (EvalSettings, Evaluation) {
        let settings = EvalSettings {
            num_folds: 2,
            fold_size: 10,
            ..EvalSettings::default()
        };
        let images = Array2::from_shape_fn((20, 4), |(r, c)| if r / 5 == c { 1.0f32 } else { 0.0 });
        let evaluation = FoldEvaluator::new(settings.clone())
            .unwrap()
            .evaluate(images.view(), images.view())
            .unwrap();
        (settings, evaluation)
    }

    #[test]
    fn test_report_contents() {
        let (settings, evaluation) = sample_evaluation();
        let report = EvaluationReport::new(&settings, 20, &evaluation);
        assert_eq!(report.folds.len(), 2);
        assert_eq!((report.folds[1].start, report.folds[1].end), (10, 20));
        assert_eq!(report.image_to_text.r1, 100.0);
        let json = report.to_json().unwrap();
        assert!(json.contains("\"measure\": \"cosine\""));
        assert!(json.contains("generated_at"));
    }

    #[test]
    fn test_write_json() {
        let (settings, evaluation) = sample_evaluation();
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report.json");
        EvaluationReport::new(&settings, 20, &evaluation)
            .write_json(&path)
            .unwrap();
        let parsed: EvaluationReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.folds[0].text_to_image.r10, 100.0);
        assert_eq!(parsed.settings, settings);
    }
}
