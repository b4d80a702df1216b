//! Model configuration
//!
//! Resolves the configured model identifier into the files the ONNX engine
//! loads. An identifier is either a directory on disk or a name looked up
//! under `models_dir`, e.g. `ml_models/onnx/all-MiniLM-L6-v2/`.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::models::{EmbeddingError, EmbeddingResult};
use crate::server::config::EmbeddingConfig;

/// Weights file expected inside a model directory
pub const MODEL_FILE: &str = "model.onnx";
/// Tokenizer file expected inside a model directory
pub const TOKENIZER_FILE: &str = "tokenizer.json";
/// Optional HuggingFace model config, used for the hidden size
pub const HF_CONFIG_FILE: &str = "config.json";
/// Optional sentence-transformers config, used for the max sequence length
pub const SBERT_CONFIG_FILE: &str = "sentence_bert_config.json";
/// Optional sentence-transformers pipeline, used to detect a Normalize stage
pub const MODULES_FILE: &str = "modules.json";

const NORMALIZE_MODULE: &str = "sentence_transformers.models.Normalize";

/// Fully resolved settings for the model loaded at startup
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Model identifier as configured
    pub name: String,

    /// File paths
    pub model_dir: PathBuf,
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,

    /// Model parameters
    pub max_sequence_length: usize,
    pub embedding_dimension: Option<usize>,
    pub normalize: bool,

    /// Performance settings
    pub batch_size: usize,
    pub num_threads: usize,

    /// Runtime settings
    pub onnx_runtime_path: String,
}

#[derive(Debug, Deserialize)]
struct HfModelConfig {
    hidden_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct SbertConfig {
    max_seq_length: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct PipelineModule {
    #[serde(rename = "type")]
    kind: String,
}

impl ModelConfig {
    /// Resolve the model named in the service configuration
    pub fn from_settings(settings: &EmbeddingConfig) -> EmbeddingResult<Self> {
        if settings.model.trim().is_empty() {
            return Err(EmbeddingError::ConfigError {
                message: "Model identifier cannot be empty".to_string(),
            });
        }
        if settings.batch_size == 0 {
            return Err(EmbeddingError::ConfigError {
                message: "batch_size must be at least 1".to_string(),
            });
        }

        let model_dir = Self::resolve_model_dir(&settings.model, &settings.models_dir);
        debug!("Resolved model '{}' to {}", settings.model, model_dir.display());

        let embedding_dimension = read_json::<HfModelConfig>(&model_dir.join(HF_CONFIG_FILE))
            .and_then(|config| config.hidden_size)
            .or_else(|| known_dimension(&settings.model));

        // The model directory's own pipeline settings win over the [embedding] values
        let max_sequence_length = read_json::<SbertConfig>(&model_dir.join(SBERT_CONFIG_FILE))
            .and_then(|config| config.max_seq_length)
            .unwrap_or(settings.max_sequence_length);
        let normalize = read_json::<Vec<PipelineModule>>(&model_dir.join(MODULES_FILE))
            .map(|modules| modules.iter().any(|m| m.kind == NORMALIZE_MODULE))
            .unwrap_or(settings.normalize);
        debug!(
            "Model '{}': max_sequence_length={}, normalize={}",
            settings.model, max_sequence_length, normalize
        );

        Ok(Self {
            name: settings.model.clone(),
            model_path: model_dir.join(MODEL_FILE),
            tokenizer_path: model_dir.join(TOKENIZER_FILE),
            model_dir,
            max_sequence_length,
            embedding_dimension,
            normalize,
            batch_size: settings.batch_size,
            num_threads: settings.num_threads,
            onnx_runtime_path: settings.onnx_runtime_path.clone(),
        })
    }

    fn resolve_model_dir(model: &str, models_dir: &str) -> PathBuf {
        let direct = Path::new(model);
        if direct.is_dir() {
            return direct.to_path_buf();
        }
        let name = model.strip_prefix("sentence-transformers/").unwrap_or(model);
        Path::new(models_dir).join(name)
    }

    /// Check that the model files are present before handing them to ONNX Runtime
    pub fn validate(&self) -> EmbeddingResult<()> {
        if !self.model_dir.is_dir() {
            return Err(EmbeddingError::ModelNotFound {
                model_name: format!("{} (no directory at {})", self.name, self.model_dir.display()),
            });
        }
        for path in [&self.model_path, &self.tokenizer_path] {
            if !path.is_file() {
                return Err(EmbeddingError::ModelLoadFailed {
                    error: format!("Missing model file: {}", path.display()),
                });
            }
        }
        Ok(())
    }
}

/// Output dimension of the models this service is usually run with
pub fn known_dimension(model: &str) -> Option<usize> {
    let name = model.rsplit(['/', '\\']).next().unwrap_or(model);
    match name {
        "all-MiniLM-L6-v2" | "paraphrase-MiniLM-L3-v2" | "all-MiniLM-L12-v2" => Some(384),
        "all-mpnet-base-v2" => Some(768),
        _ => None,
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<T>(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring unreadable {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(model: &str, models_dir: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            model: model.to_string(),
            models_dir: models_dir.to_string(),
            ..EmbeddingConfig::default()
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("embedding-service-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_resolve_by_name_under_models_dir() {
        let config = ModelConfig::from_settings(&settings("all-MiniLM-L6-v2", "ml_models/onnx")).unwrap();
        assert_eq!(config.model_dir, Path::new("ml_models/onnx").join("all-MiniLM-L6-v2"));
        assert_eq!(config.model_path, config.model_dir.join("model.onnx"));
        assert_eq!(config.tokenizer_path, config.model_dir.join("tokenizer.json"));
        assert_eq!(config.embedding_dimension, Some(384));
    }

    #[test]
    fn test_hub_prefix_is_stripped() {
        let config = ModelConfig::from_settings(&settings("sentence-transformers/all-mpnet-base-v2", "models")).unwrap();
        assert_eq!(config.model_dir, Path::new("models").join("all-mpnet-base-v2"));
        assert_eq!(config.embedding_dimension, Some(768));
    }

    #[test]
    fn test_directory_identifier_and_hidden_size() {
        let dir = scratch_dir("hidden-size");
        std::fs::write(dir.join("config.json"), r#"{"hidden_size": 512, "model_type": "bert"}"#).unwrap();

        let config = ModelConfig::from_settings(&settings(dir.to_str().unwrap(), "unused")).unwrap();
        assert_eq!(config.model_dir, dir);
        assert_eq!(config.embedding_dimension, Some(512));

        // No model.onnx / tokenizer.json yet
        assert!(config.validate().is_err());

        std::fs::write(dir.join("model.onnx"), b"").unwrap();
        std::fs::write(dir.join("tokenizer.json"), b"{}").unwrap();
        assert!(config.validate().is_ok());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_sentence_transformers_pipeline_settings() {
        let dir = scratch_dir("pipeline");
        std::fs::write(dir.join("sentence_bert_config.json"), r#"{"max_seq_length": 384, "do_lower_case": false}"#).unwrap();
        std::fs::write(
            dir.join("modules.json"),
            r#"[
                {"idx": 0, "name": "0", "path": "", "type": "sentence_transformers.models.Transformer"},
                {"idx": 1, "name": "1", "path": "1_Pooling", "type": "sentence_transformers.models.Pooling"},
                {"idx": 2, "name": "2", "path": "2_Normalize", "type": "sentence_transformers.models.Normalize"}
            ]"#,
        )
        .unwrap();

        let mut fallback = settings(dir.to_str().unwrap(), "unused");
        fallback.normalize = false;
        let config = ModelConfig::from_settings(&fallback).unwrap();
        assert_eq!(config.max_sequence_length, 384);
        assert!(config.normalize);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_pipeline_without_normalize_stage() {
        let dir = scratch_dir("no-normalize");
        std::fs::write(
            dir.join("modules.json"),
            r#"[
                {"idx": 0, "name": "0", "path": "", "type": "sentence_transformers.models.Transformer"},
                {"idx": 1, "name": "1", "path": "1_Pooling", "type": "sentence_transformers.models.Pooling"}
            ]"#,
        )
        .unwrap();
        // Unparsable file falls back to [embedding]
        std::fs::write(dir.join("sentence_bert_config.json"), "not json").unwrap();

        let config = ModelConfig::from_settings(&settings(dir.to_str().unwrap(), "unused")).unwrap();
        assert!(!config.normalize);
        assert_eq!(config.max_sequence_length, 256);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_pipeline_files_absent_use_settings() {
        let mut custom = settings("no-such-model", "/nonexistent/models");
        custom.max_sequence_length = 128;
        custom.normalize = false;

        let config = ModelConfig::from_settings(&custom).unwrap();
        assert_eq!(config.max_sequence_length, 128);
        assert!(!config.normalize);
    }

    #[test]
    fn test_missing_model_directory() {
        let config = ModelConfig::from_settings(&settings("no-such-model", "/nonexistent/models")).unwrap();
        assert_eq!(config.embedding_dimension, None);
        assert!(matches!(config.validate(), Err(EmbeddingError::ModelNotFound { .. })));
    }

    #[test]
    fn test_invalid_settings() {
        assert!(ModelConfig::from_settings(&settings("  ", "models")).is_err());

        let mut zero_batch = settings("all-MiniLM-L6-v2", "models");
        zero_batch.batch_size = 0;
        assert!(ModelConfig::from_settings(&zero_batch).is_err());
    }
}
