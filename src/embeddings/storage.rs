use super::EmbeddingSet;
use crate::config::DataConfig;
use crate::error::{CmrevalError, Result};
use ndarray::Array2;
use std::path::Path;

/// Parse a raw little-endian f32 buffer into a row-major matrix
///
/// # Arguments
///
/// * `blob` - Raw bytes, 4 per value
/// * `dimensions` - Values per row
///
/// # Returns
///
/// (len / 4 / dimensions) × dimensions matrix, or a parse error if the byte
/// count does not divide evenly
pub fn parse_f32_blob(blob: &[u8], dimensions: usize) -> Result<Array2<f32>> {
    if dimensions == 0 {
        return Err(CmrevalError::Config("dimensions must be greater than 0".to_string()));
    }
    if blob.len() % 4 != 0 {
        return Err(CmrevalError::Parse(format!(
            "embedding blob length {} is not a multiple of 4",
            blob.len()
        )));
    }
    let values: Vec<f32> = blob
        .chunks_exact(4)
        .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect();
    if values.len() % dimensions != 0 {
        return Err(CmrevalError::Parse(format!(
            "{} values cannot form rows of {}",
            values.len(),
            dimensions
        )));
    }
    let rows = values.len() / dimensions;
    Array2::from_shape_vec((rows, dimensions), values)
        .map_err(|e| CmrevalError::Parse(e.to_string()))
}

/// Write an embedding set as raw little-endian f32, row-major
pub fn write_raw_f32(path: &Path, set: &EmbeddingSet) -> Result<()> {
    let bytes: Vec<u8> = set.view().iter().flat_map(|f| f.to_le_bytes()).collect();
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Load embeddings from `path`
///
/// `.json` files hold an array of row arrays. Anything else is read as raw
/// little-endian f32 and needs `dimensions`.
pub fn load_embeddings(path: &Path, dimensions: Option<usize>) -> Result<EmbeddingSet> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let set = if is_json {
        let content = std::fs::read_to_string(path)?;
        let rows: Vec<Vec<f32>> = serde_json::from_str(&content)?;
        let set = EmbeddingSet::from_rows(rows)?;
        if let Some(expected) = dimensions {
            if set.dimensions() != expected {
                return Err(CmrevalError::ShapeMismatch(format!(
                    "{} has dimension {}, expected {}",
                    path.display(),
                    set.dimensions(),
                    expected
                )));
            }
        }
        set
    } else {
        let dimensions = dimensions.ok_or_else(|| {
            CmrevalError::Config(format!(
                "dimensions must be set to read raw embeddings from {}",
                path.display()
            ))
        })?;
        let blob = std::fs::read(path)?;
        EmbeddingSet::from_array(parse_f32_blob(&blob, dimensions)?)
    };

    log::info!(
        "Loaded {} embeddings of dimension {} from {}",
        set.len(),
        set.dimensions(),
        path.display()
    );
    Ok(set)
}

/// Load and preprocess the image and text sets named in `data`
///
/// Applies L2 normalization and then absolute values when configured, and
/// checks that both sets have the same shape.
pub fn load_pair(data: &DataConfig) -> Result<(EmbeddingSet, EmbeddingSet)> {
    let images_path = data
        .images_path
        .as_deref()
        .ok_or_else(|| CmrevalError::Config("data.images_path is not set".to_string()))?;
    let texts_path = data
        .texts_path
        .as_deref()
        .ok_or_else(|| CmrevalError::Config("data.texts_path is not set".to_string()))?;

    let mut images = load_embeddings(images_path, data.dimensions)?;
    let mut texts = load_embeddings(texts_path, data.dimensions)?;

    if images.len() != texts.len() || images.dimensions() != texts.dimensions() {
        return Err(CmrevalError::ShapeMismatch(format!(
            "images are {}x{}, texts are {}x{}",
            images.len(),
            images.dimensions(),
            texts.len(),
            texts.dimensions()
        )));
    }

    for set in [&mut images, &mut texts] {
        if data.normalize {
            set.l2_normalize();
        }
        if data.use_abs {
            set.abs_in_place();
        }
    }
    Ok((images, texts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_blob_valid() {
        let values = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let blob: Vec<u8> = values.iter().flat_map(|f| f.to_le_bytes()).collect();
        let matrix = parse_f32_blob(&blob, 3).unwrap();
        assert_eq!(matrix, arr2(&[[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]]));
    }

    #[test]
    fn test_parse_blob_invalid_length() {
        let blob = vec![0u8, 1, 2, 3, 4];
        assert!(matches!(parse_f32_blob(&blob, 1), Err(CmrevalError::Parse(_))));
    }

    #[test]
    fn test_parse_blob_partial_row() {
        let blob: Vec<u8> = [1.0f32, 2.0, 3.0].iter().flat_map(|f| f.to_le_bytes()).collect();
        assert!(matches!(parse_f32_blob(&blob, 2), Err(CmrevalError::Parse(_))));
    }

    #[test]
    fn test_raw_file_written_then_loaded() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("images.f32");
        let set = EmbeddingSet::from_array(arr2(&[[0.5f32, -1.5], [2.0, 0.0]]));
        write_raw_f32(&path, &set).unwrap();
        let loaded = load_embeddings(&path, Some(2)).unwrap();
        assert_eq!(loaded, set);
    }

    #[test]
    fn test_raw_file_needs_dimensions() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("texts.bin");
        fs::write(&path, [0u8; 8]).unwrap();
        assert!(matches!(load_embeddings(&path, None), Err(CmrevalError::Config(_))));
    }

    #[test]
    fn test_json_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("texts.json");
        fs::write(&path, "[[1.0, 0.0], [0.0, 1.0], [0.5, 0.5]]").unwrap();
        let loaded = load_embeddings(&path, None).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.dimensions(), 2);
        assert!(matches!(
            load_embeddings(&path, Some(4)),
            Err(CmrevalError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_json_file_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.json");
        fs::write(&path, "[[1.0, 0.0], [0.0").unwrap();
        assert!(matches!(load_embeddings(&path, None), Err(CmrevalError::Json(_))));
    }

    #[test]
    fn test_load_pair_preprocesses() {
        let temp_dir = TempDir::new().unwrap();
        let images_path = temp_dir.path().join("images.json");
        let texts_path = temp_dir.path().join("texts.json");
        fs::write(&images_path, "[[-3.0, 4.0]]").unwrap();
        fs::write(&texts_path, "[[0.0, -2.0]]").unwrap();
        let data = DataConfig {
            images_path: Some(images_path),
            texts_path: Some(texts_path),
            normalize: true,
            use_abs: true,
            ..DataConfig::default()
        };
        let (images, texts) = load_pair(&data).unwrap();
        assert!((images.view()[[0, 0]] - 0.6).abs() < 1e-6);
        assert!((images.view()[[0, 1]] - 0.8).abs() < 1e-6);
        assert_eq!(texts.view(), arr2(&[[0.0f32, 1.0]]));
    }

    #[test]
    fn test_load_pair_shape_mismatch() {
        let temp_dir = TempDir::new().unwrap();
        let images_path = temp_dir.path().join("images.json");
        let texts_path = temp_dir.path().join("texts.json");
        fs::write(&images_path, "[[1.0, 0.0]]").unwrap();
        fs::write(&texts_path, "[[1.0, 0.0], [0.0, 1.0]]").unwrap();
        let data = DataConfig {
            images_path: Some(images_path),
            texts_path: Some(texts_path),
            ..DataConfig::default()
        };
        assert!(matches!(load_pair(&data), Err(CmrevalError::ShapeMismatch(_))));
    }

    #[test]
    fn test_load_pair_missing_path() {
        assert!(matches!(
            load_pair(&DataConfig::default()),
            Err(CmrevalError::Config(_))
        ));
    }
}
