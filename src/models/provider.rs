//! Embedding Provider
//!
//! Owns the model loaded at startup and exposes the two encode operations the
//! request loop dispatches to. No caching and no retries: every call runs the
//! model and failures go straight back to the caller.

use tracing::{debug, info, instrument};

use crate::models::config::ModelConfig;
use crate::models::model::{EmbeddingModel, ModelFactory, ModelInfo};
use crate::models::{Embedding, EmbeddingResult};

/// Text-to-vector capability backed by a single loaded model
pub struct EmbeddingProvider {
    model: Box<dyn EmbeddingModel>,
}

impl EmbeddingProvider {
    /// Load the configured model. Blocks until the ONNX session is ready.
    pub fn load(config: &ModelConfig) -> EmbeddingResult<Self> {
        info!("[Embeddings] Loading model: {}...", config.name);
        let model = ModelFactory::create_model(config)?;
        info!("[Embeddings] Model loaded successfully");
        Ok(Self::from_model(model))
    }

    /// Wrap an already constructed model
    pub fn from_model(model: Box<dyn EmbeddingModel>) -> Self {
        Self { model }
    }

    /// Information about the loaded model
    pub fn model_info(&self) -> &ModelInfo {
        self.model.info()
    }

    /// Encode a batch of texts; `result[i]` is the vector for `texts[i]`
    #[instrument(skip(self, texts), fields(text_count = texts.len()))]
    pub async fn embed_many(&self, texts: &[String]) -> EmbeddingResult<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let embeddings = self.model.embed_batch(texts).await?;
        debug!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }

    /// Encode a single text, returned unwrapped
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn embed_one(&self, text: &str) -> EmbeddingResult<Embedding> {
        self.model.embed_text(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::testing::{HashingModel, MAX_TEXT_LEN};

    fn provider() -> EmbeddingProvider {
        EmbeddingProvider::from_model(Box::new(HashingModel::new(384)))
    }

    #[tokio::test]
    async fn test_embed_many_preserves_length_and_order() {
        let provider = provider();
        let texts = vec!["alpha".to_string(), "beta".to_string(), "alpha".to_string()];

        let embeddings = provider.embed_many(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 3);
        assert!(embeddings.iter().all(|e| e.len() == 384));
        assert_eq!(embeddings[0], embeddings[2]);
        assert_ne!(embeddings[0], embeddings[1]);
    }

    #[tokio::test]
    async fn test_embed_many_empty() {
        let embeddings = provider().embed_many(&[]).await.unwrap();
        assert!(embeddings.is_empty());
    }

    #[tokio::test]
    async fn test_embed_one_matches_first_of_many() {
        let provider = provider();
        let one = provider.embed_one("hello").await.unwrap();
        let many = provider.embed_many(&["hello".to_string()]).await.unwrap();
        assert_eq!(one, many[0]);
        assert!(one.iter().all(|x| x.is_finite()));
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let provider = provider();
        let too_long = "x".repeat(MAX_TEXT_LEN + 1);
        assert!(provider.embed_one(&too_long).await.is_err());
        assert!(provider.embed_many(&["ok".to_string(), too_long]).await.is_err());
    }
}
