//! Training configuration persisted as TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize, de::Error as SerdeDeError};
use thiserror::Error;

use crate::app_dirs;
use crate::dataset::{DEFAULT_TRAIN_FRACTION, HeaderMode, LoadOptions, NormalizationScope};
use crate::ml::model::{ModelDims, ModelKind};
use crate::ml::train::TrainOptions;

/// Default filename of the training config inside the app directory.
pub const CONFIG_FILE_NAME: &str = "train.toml";
/// Data file read when no path is configured.
pub const DEFAULT_DATA_FILE: &str = "training_data.csv";

/// Every knob of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub data_path: PathBuf,
    pub delimiter: char,
    pub header: HeaderMode,
    pub model: ModelKind,
    pub normalization: NormalizationScope,
    pub learning_rate: f64,
    pub steps: usize,
    pub eval_interval: usize,
    pub eval_iters: usize,
    pub batch_size: usize,
    pub train_fraction: f64,
    pub hidden_size: usize,
    pub segment_size: usize,
    pub embedding_dim: usize,
    pub hint_vocab: usize,
    pub dropout: f64,
    pub seed: u64,
    /// Held-out row swept cell by cell after training.
    pub eval_row: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        let train = TrainOptions::default();
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_FILE),
            delimiter: '\t',
            header: HeaderMode::Auto,
            model: ModelKind::default(),
            normalization: NormalizationScope::default(),
            learning_rate: train.learning_rate,
            steps: train.steps,
            eval_interval: train.eval_interval,
            eval_iters: train.eval_iters,
            batch_size: train.batch_size,
            train_fraction: DEFAULT_TRAIN_FRACTION,
            hidden_size: 6000,
            segment_size: 32,
            embedding_dim: 8,
            hint_vocab: 16,
            dropout: 0.1,
            seed: train.seed,
            eval_row: 0,
        }
    }
}

impl TrainConfig {
    /// Reject settings that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| Err(ConfigError::Invalid { reason });
        if self.batch_size == 0 {
            return invalid("batch_size must be at least 1".into());
        }
        if self.eval_interval == 0 {
            return invalid("eval_interval must be at least 1".into());
        }
        if self.eval_iters == 0 {
            return invalid("eval_iters must be at least 1".into());
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return invalid(format!("learning_rate must be positive, got {}", self.learning_rate));
        }
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return invalid(format!(
                "train_fraction must lie strictly between 0 and 1, got {}",
                self.train_fraction
            ));
        }
        if self.hidden_size == 0 || self.segment_size == 0 || self.embedding_dim == 0 {
            return invalid("layer sizes must be at least 1".into());
        }
        if self.hint_vocab == 0 {
            return invalid("hint_vocab must be at least 1".into());
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return invalid(format!("dropout must lie in [0, 1), got {}", self.dropout));
        }
        Ok(())
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            delimiter: self.delimiter,
            header: self.header,
        }
    }

    pub fn train_options(&self) -> TrainOptions {
        TrainOptions {
            learning_rate: self.learning_rate,
            steps: self.steps,
            eval_interval: self.eval_interval,
            eval_iters: self.eval_iters,
            batch_size: self.batch_size,
            seed: self.seed,
        }
    }

    pub fn model_dims(&self) -> ModelDims {
        ModelDims {
            hidden: self.hidden_size,
            segment: self.segment_size,
            embedding: self.embedding_dim,
            hint_vocab: self.hint_vocab,
            dropout: self.dropout,
        }
    }
}

/// Errors that may occur while loading or saving the training config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    #[error("No suitable config directory found")]
    NoConfigDir,
    #[error("Invalid training config: {reason}")]
    Invalid { reason: String },
}

/// Resolve the app-directory config path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load `train.toml` from the app directory, returning defaults if missing.
pub fn load_or_default() -> Result<TrainConfig, ConfigError> {
    load_from(&config_path()?)
}

/// Load a config file; a missing file yields the defaults.
pub fn load_from(path: &Path) -> Result<TrainConfig, ConfigError> {
    if !path.exists() {
        return Ok(TrainConfig::default());
    }
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8(bytes).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source: SerdeDeError::custom(source),
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Save configuration to a specific path, creating parent directories as needed.
pub fn save_to_path(config: &TrainConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, data).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            ConfigError::CreateDir { path, source }
        }
    }
}
