//! Deterministic stand-in model for tests that must not touch model files.

use async_trait::async_trait;

use crate::models::model::{EmbeddingModel, ModelInfo};
use crate::models::{Embedding, EmbeddingError, EmbeddingResult};

/// Texts longer than this are rejected, like an encoder refusing oversized input.
pub const MAX_TEXT_LEN: usize = 1024;

pub struct HashingModel {
    info: ModelInfo,
}

impl HashingModel {
    pub fn new(dimension: usize) -> Self {
        Self {
            info: ModelInfo {
                name: "hashing-test-model".to_string(),
                dimension: Some(dimension),
                max_sequence_length: MAX_TEXT_LEN,
                normalized: true,
            },
        }
    }

    fn encode(&self, text: &str) -> EmbeddingResult<Embedding> {
        if text.len() > MAX_TEXT_LEN {
            return Err(EmbeddingError::InferenceError {
                model_name: self.info.name.clone(),
                error: format!("input of {} bytes exceeds {}", text.len(), MAX_TEXT_LEN),
            });
        }

        let dimension = self.info.dimension.unwrap_or(8);
        let raw: Vec<f32> = (0..dimension)
            .map(|i| {
                // FNV-1a over the text, seeded per component
                let mut hash: u64 = 0xcbf29ce484222325 ^ (i as u64).wrapping_mul(0x100000001b3);
                for byte in text.bytes() {
                    hash ^= byte as u64;
                    hash = hash.wrapping_mul(0x100000001b3);
                }
                (hash % 2001) as f32 / 1000.0 - 1.0
            })
            .collect();

        let norm = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            return Ok(raw);
        }
        Ok(raw.into_iter().map(|x| x / norm).collect())
    }
}

#[async_trait]
impl EmbeddingModel for HashingModel {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    async fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Embedding>> {
        texts.iter().map(|text| self.encode(text)).collect()
    }
}
