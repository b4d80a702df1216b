//! Embedding Service Library
//!
//! Local text embeddings over a line-delimited JSON protocol on stdin/stdout

pub mod models;
pub mod onnx;
pub mod protocol;
pub mod server;

// Re-exports
pub use models::{Embedding, EmbeddingError, EmbeddingProvider};
pub use protocol::{Request, Response};
pub use server::{EmbeddingService, ServiceConfig, ServiceError};
