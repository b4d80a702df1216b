//! Service Configuration
//!
//! Read once at startup from a TOML file; a missing file means defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::models::EmbeddingResult;

/// Default model identifier (384-dimensional output)
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

/// Environment variable that overrides `embedding.model`
pub const MODEL_ENV_VAR: &str = "EMBEDDINGS_MODEL";

/// Log filter used before a config file has been read, and for unknown levels
pub const DEFAULT_LOG_FILTER: &str = "embedding_service=info,warn";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub embedding: EmbeddingConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub models_dir: String,
    pub max_sequence_length: usize,
    pub batch_size: usize,
    pub num_threads: usize,
    pub normalize: bool,
    pub onnx_runtime_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: String,
}

impl ServiceConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> EmbeddingResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> EmbeddingResult<Self> {
        let config: ServiceConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults, then
    /// apply the environment override for the model identifier.
    pub fn load<P: AsRef<Path>>(path: P) -> EmbeddingResult<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        if let Ok(model) = std::env::var(MODEL_ENV_VAR) {
            if !model.trim().is_empty() {
                config.embedding.model = model;
            }
        }

        Ok(config)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            models_dir: "ml_models/onnx".to_string(),
            max_sequence_length: 256,
            batch_size: 32,
            num_threads: 4,
            normalize: true,
            onnx_runtime_path: String::new(),
        }
    }
}

impl MonitoringConfig {
    /// Default directive for `tracing_subscriber::EnvFilter`; `RUST_LOG` wins over it
    pub fn log_filter(&self) -> &'static str {
        match self.log_level.to_lowercase().as_str() {
            "trace" => "embedding_service=trace,warn",
            "debug" => "embedding_service=debug,warn",
            "warn" => "embedding_service=warn,warn",
            "error" => "embedding_service=error,error",
            _ => DEFAULT_LOG_FILTER,
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
