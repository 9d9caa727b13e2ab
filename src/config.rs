use crate::eval::EvalSettings;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub eval: EvalSettings,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Where the embeddings and their labels live, and how to preprocess them
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataConfig {
    /// Image embeddings, one row per caption (each unique image repeated group_size times)
    pub images_path: Option<PathBuf>,
    /// Caption embeddings aligned to images_path
    pub texts_path: Option<PathBuf>,
    /// Row width; required for raw f32 files
    pub dimensions: Option<usize>,
    #[serde(default)]
    pub normalize: bool,
    #[serde(default)]
    pub use_abs: bool,
    /// One image id per line, one line per unique image
    pub ids_path: Option<PathBuf>,
    /// One caption per line, aligned to texts_path
    pub captions_path: Option<PathBuf>,
}

/// Reporting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Write a JSON report here after evaluation
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            output_path: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in CMREVAL_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("CMREVAL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        Self::from_path(&config_path)
    }

    /// Like [`Config::load`], but falls back to defaults when no config file
    /// is named and ./config.toml does not exist.
    pub fn load_or_default() -> Result<Self> {
        let _ = dotenv::dotenv();
        if std::env::var("CMREVAL_CONFIG").is_ok() || Path::new("config.toml").exists() {
            return Self::load();
        }
        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load and validate a specific config file
    pub fn from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("Invalid config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.eval.validate()?;

        if self.data.dimensions == Some(0) {
            anyhow::bail!("data.dimensions must be greater than 0");
        }

        if let Some(ref path) = self.data.images_path {
            if !path.exists() {
                anyhow::bail!("data.images_path does not exist: {}", path.display());
            }
        }

        if let Some(ref path) = self.data.texts_path {
            if !path.exists() {
                anyhow::bail!("data.texts_path does not exist: {}", path.display());
            }
        }

        Ok(())
    }
}
