//! # ONNX Embedding Engine
//!
//! Sentence embeddings with ONNX Runtime and a HuggingFace tokenizer, the
//! same pipeline sentence-transformers runs: tokenize, run the encoder,
//! mean-pool the token states over the attention mask, L2-normalize.
//!
//! ## Features
//!
//! - Batched inference with batch-longest padding, in chunks of `batch_size`
//! - Truncation at `max_seq_length` tokens
//! - `token_type_ids` only fed to graphs that declare it (BERT yes, MPNet no)
//! - Graphs that already emit a pooled `[batch, hidden]` tensor pass through
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = OnnxEmbeddingEngine::new_with_config(
//!     Path::new("ml_models/onnx/all-MiniLM-L6-v2/model.onnx"),
//!     Path::new("ml_models/onnx/all-MiniLM-L6-v2/tokenizer.json"),
//!     &OnnxConfig::default(),
//!     32,   // batch_size
//!     256,  // max_seq_length
//!     true, // normalize
//! )?;
//! let embeddings = engine.embed_texts(&["Hello world".to_string()]).await?;
//! ```

use crate::models::EmbeddingError;
use ndarray::ArrayViewD;
#[cfg(feature = "onnx")]
use ort::session::{Session, builder::GraphOptimizationLevel};
#[cfg(feature = "onnx")]
use ort::value::Tensor;
#[cfg(feature = "onnx")]
use std::path::Path;
#[cfg(feature = "onnx")]
use tokenizers::{PaddingStrategy, Tokenizer, TruncationParams};
#[cfg(feature = "onnx")]
use tracing::{debug, info, instrument};

/// Configuration for ONNX Runtime
#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// Path to ONNX Runtime library (DLL/so/dylib); empty lets `ort` locate it
    pub library_path: String,
    /// Thread pool size for inference
    pub thread_pool_size: usize,
}

impl Default for OnnxConfig {
    fn default() -> Self {
        Self {
            library_path: String::new(),
            thread_pool_size: 4,
        }
    }
}

/// ONNX-based embedding engine for generating text embeddings
#[cfg(feature = "onnx")]
#[derive(Debug)]
pub struct OnnxEmbeddingEngine {
    /// ONNX Runtime session for model inference
    session: Session,
    /// HuggingFace tokenizer, configured for padding and truncation
    tokenizer: Tokenizer,
    /// Graph output holding the token (or pooled) states
    output_name: String,
    /// Whether the graph takes a `token_type_ids` input
    uses_token_type_ids: bool,
    /// Texts per inference call
    batch_size: usize,
    /// L2-normalize pooled vectors
    normalize: bool,
}

#[cfg(feature = "onnx")]
impl OnnxEmbeddingEngine {
    /// Create a new ONNX embedding engine with custom configuration
    pub fn new_with_config(
        model_path: &Path,
        tokenizer_path: &Path,
        onnx_config: &OnnxConfig,
        batch_size: usize,
        max_seq_length: usize,
        normalize: bool,
    ) -> Result<Self, EmbeddingError> {
        info!("Initializing ONNX embedding engine with model: {}", model_path.display());

        if !onnx_config.library_path.is_empty() {
            std::env::set_var("ORT_DYLIB_PATH", &onnx_config.library_path);
            debug!("Set ORT_DYLIB_PATH to: {}", onnx_config.library_path);
        }

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(onnx_config.thread_pool_size)?
            .commit_from_file(model_path)
            .map_err(|e| EmbeddingError::ModelLoadFailed {
                error: format!("Failed to load ONNX model: {}", e),
            })?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| EmbeddingError::ModelLoadFailed {
                error: format!("Failed to load tokenizer: {}", e),
            })?;

        // Keep the tokenizer's own pad token and id, only pad to the longest text
        let mut padding = tokenizer.get_padding().cloned().unwrap_or_default();
        padding.strategy = PaddingStrategy::BatchLongest;
        tokenizer.with_padding(Some(padding));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_seq_length,
                ..Default::default()
            }))
            .map_err(|e| EmbeddingError::ModelLoadFailed {
                error: format!("Failed to configure truncation: {}", e),
            })?;

        let uses_token_type_ids = session.inputs.iter().any(|i| i.name == "token_type_ids");
        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name == "last_hidden_state")
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .ok_or_else(|| EmbeddingError::ModelLoadFailed {
                error: "ONNX model declares no outputs".to_string(),
            })?;

        info!(
            "ONNX embedding engine initialized with {} threads (output: {}, token_type_ids: {})",
            onnx_config.thread_pool_size, output_name, uses_token_type_ids
        );
        Ok(Self {
            session,
            tokenizer,
            output_name,
            uses_token_type_ids,
            batch_size: batch_size.max(1),
            normalize,
        })
    }

    /// Generate embeddings for a batch of texts
    ///
    /// Returns one vector per input text, in input order. An empty input
    /// yields an empty output without running the model.
    #[instrument(skip(self, texts), fields(text_count = texts.len()))]
    pub async fn embed_texts(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size) {
            embeddings.extend(self.embed_chunk(chunk)?);
        }

        debug!("Successfully generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }

    fn embed_chunk(&mut self, chunk: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let inputs: Vec<&str> = chunk.iter().map(String::as_str).collect();
        let encodings = self.tokenizer.encode_batch(inputs, true)
            .map_err(|e| EmbeddingError::EmbeddingFailed {
                error: format!("Tokenization failed: {}", e),
            })?;

        let batch = encodings.len();
        let seq_len = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);

        let mut input_ids = Vec::with_capacity(batch * seq_len);
        let mut attention_mask: Vec<u32> = Vec::with_capacity(batch * seq_len);
        for encoding in &encodings {
            input_ids.extend(encoding.get_ids().iter().map(|&x| x as i64));
            attention_mask.extend_from_slice(encoding.get_attention_mask());
        }
        let attention_mask_i64: Vec<i64> = attention_mask.iter().map(|&x| x as i64).collect();

        // 2D tensors [batch, seq_len]
        let shape = [batch as i64, seq_len as i64];
        let input_ids_tensor = Tensor::from_array((shape, input_ids))
            .map_err(|e| EmbeddingError::EmbeddingFailed {
                error: format!("Failed to create input_ids tensor: {}", e),
            })?;
        let attention_mask_tensor = Tensor::from_array((shape, attention_mask_i64))
            .map_err(|e| EmbeddingError::EmbeddingFailed {
                error: format!("Failed to create attention_mask tensor: {}", e),
            })?;

        let mut session_inputs = vec![
            ("input_ids", input_ids_tensor),
            ("attention_mask", attention_mask_tensor),
        ];
        if self.uses_token_type_ids {
            let token_type_ids_tensor = Tensor::from_array((shape, vec![0i64; batch * seq_len]))
                .map_err(|e| EmbeddingError::EmbeddingFailed {
                    error: format!("Failed to create token_type_ids tensor: {}", e),
                })?;
            session_inputs.push(("token_type_ids", token_type_ids_tensor));
        }

        let outputs = self.session.run(session_inputs)
            .map_err(|e| EmbeddingError::EmbeddingFailed {
                error: format!("ONNX inference failed: {}", e),
            })?;

        let (out_shape, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbeddingError::EmbeddingFailed {
                error: format!("Failed to extract output tensor: {}", e),
            })?;

        let dims: Vec<usize> = out_shape.iter().map(|&x| x as usize).collect();
        let output_array = ndarray::ArrayView::from_shape(dims.as_slice(), data)
            .map_err(|e| EmbeddingError::EmbeddingFailed {
                error: format!("Failed to create output array view: {:?}", e),
            })?;

        let mut embeddings = Vec::with_capacity(batch);
        for batch_idx in 0..batch {
            let embedding = match dims.len() {
                2 => output_array.index_axis(ndarray::Axis(0), batch_idx).iter().copied().collect(),
                _ => {
                    let mask = &attention_mask[batch_idx * seq_len..(batch_idx + 1) * seq_len];
                    mean_pooling(&output_array, batch_idx, mask)?
                }
            };
            embeddings.push(if self.normalize { normalize_embedding(embedding) } else { embedding });
        }

        Ok(embeddings)
    }
}

/// Apply mean pooling to the token states of one sequence in the batch
///
/// # Arguments
/// * `output_tensor` - Model output [batch_size, seq_len, hidden_size]
/// * `batch_idx` - Sequence to pool
/// * `attention_mask` - Mask for that sequence: real tokens (1) vs padding (0)
pub fn mean_pooling(output_tensor: &ArrayViewD<f32>, batch_idx: usize, attention_mask: &[u32]) -> Result<Vec<f32>, EmbeddingError> {
    let shape = output_tensor.shape();
    if shape.len() != 3 {
        return Err(EmbeddingError::EmbeddingFailed {
            error: format!("Expected 3D output tensor, got {}D", shape.len()),
        });
    }

    let seq_len = shape[1];
    let hidden_size = shape[2];

    if attention_mask.len() != seq_len {
        return Err(EmbeddingError::EmbeddingFailed {
            error: format!("Attention mask length {} doesn't match sequence length {}", attention_mask.len(), seq_len),
        });
    }

    let mut pooled = vec![0.0f32; hidden_size];
    let mut valid_tokens = 0;

    for seq_idx in 0..seq_len {
        if attention_mask[seq_idx] == 1 {
            for hidden_idx in 0..hidden_size {
                pooled[hidden_idx] += output_tensor[[batch_idx, seq_idx, hidden_idx]];
            }
            valid_tokens += 1;
        }
    }

    if valid_tokens == 0 {
        return Err(EmbeddingError::EmbeddingFailed {
            error: "No valid tokens found in attention mask".to_string(),
        });
    }

    for val in &mut pooled {
        *val /= valid_tokens as f32;
    }

    Ok(pooled)
}

/// L2-normalize an embedding; a zero vector is returned unchanged
pub fn normalize_embedding(embedding: Vec<f32>) -> Vec<f32> {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm == 0.0 {
        return embedding;
    }

    embedding.into_iter().map(|x| x / norm).collect()
}
