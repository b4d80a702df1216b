//! ONNX Embedder Module
//!
//! ONNX Runtime inference behind the embedding model trait

pub mod onnx_engine;
pub use onnx_engine::OnnxConfig;
#[cfg(feature = "onnx")]
pub use onnx_engine::OnnxEmbeddingEngine;
