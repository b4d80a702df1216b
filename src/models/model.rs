//! Model definitions and traits
//!
//! This module defines the trait the provider encodes through and the
//! ONNX-backed implementation loaded at startup.

use async_trait::async_trait;

use crate::models::config::ModelConfig;
use crate::models::{Embedding, EmbeddingResult};

/// Information about a model
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Model identifier
    pub name: String,
    /// Embedding dimension, when known before the first inference
    pub dimension: Option<usize>,
    /// Maximum sequence length
    pub max_sequence_length: usize,
    /// Whether output vectors are L2-normalized
    pub normalized: bool,
}

impl ModelInfo {
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            name: config.name.clone(),
            dimension: config.embedding_dimension,
            max_sequence_length: config.max_sequence_length,
            normalized: config.normalize,
        }
    }
}

/// Core embedding model trait
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Get model information
    fn info(&self) -> &ModelInfo;

    /// Generate embeddings for a batch of texts, one vector per text in order
    async fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Embedding>>;

    /// Generate the embedding for a single text
    async fn embed_text(&self, text: &str) -> EmbeddingResult<Embedding> {
        let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings.pop().ok_or_else(|| crate::EmbeddingError::InferenceError {
            model_name: self.info().name.clone(),
            error: "No embedding returned".to_string(),
        })
    }
}

/// ONNX-based embedding model implementation
#[cfg(feature = "onnx")]
pub mod onnx {
    use super::*;
    use crate::onnx::{OnnxConfig, OnnxEmbeddingEngine};
    use tokio::sync::Mutex;

    /// ONNX embedding model
    pub struct OnnxEmbeddingModel {
        info: ModelInfo,
        // Inference needs `&mut Session`, so callers take turns.
        engine: Mutex<OnnxEmbeddingEngine>,
    }

    impl OnnxEmbeddingModel {
        /// Load the ONNX session and tokenizer for a resolved model
        pub fn load(config: &ModelConfig) -> EmbeddingResult<Self> {
            config.validate()?;

            let onnx_config = OnnxConfig {
                library_path: config.onnx_runtime_path.clone(),
                thread_pool_size: config.num_threads,
            };
            let engine = OnnxEmbeddingEngine::new_with_config(
                &config.model_path,
                &config.tokenizer_path,
                &onnx_config,
                config.batch_size,
                config.max_sequence_length,
                config.normalize,
            )?;

            Ok(Self {
                info: ModelInfo::from_config(config),
                engine: Mutex::new(engine),
            })
        }
    }

    #[async_trait]
    impl EmbeddingModel for OnnxEmbeddingModel {
        fn info(&self) -> &ModelInfo {
            &self.info
        }

        async fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Embedding>> {
            let mut engine = self.engine.lock().await;
            engine.embed_texts(texts).await
                .map_err(|e| crate::EmbeddingError::InferenceError {
                    model_name: self.info.name.clone(),
                    error: e.to_string(),
                })
        }
    }
}

/// Factory for creating embedding models
pub struct ModelFactory;

impl ModelFactory {
    /// Load the model described by the configuration
    #[cfg(feature = "onnx")]
    pub fn create_model(config: &ModelConfig) -> EmbeddingResult<Box<dyn EmbeddingModel>> {
        Ok(Box::new(onnx::OnnxEmbeddingModel::load(config)?))
    }

    #[cfg(not(feature = "onnx"))]
    pub fn create_model(config: &ModelConfig) -> EmbeddingResult<Box<dyn EmbeddingModel>> {
        Err(crate::EmbeddingError::ModelLoadFailed {
            error: format!("Cannot load '{}': built without the `onnx` feature", config.name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::testing::HashingModel;

    #[tokio::test]
    async fn test_embed_text_defaults_to_batch_of_one() {
        let model = HashingModel::new(16);
        let single = model.embed_text("hello").await.unwrap();
        let batch = model.embed_batch(&["hello".to_string()]).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(single, batch[0]);
        assert_eq!(single.len(), 16);
    }
}
