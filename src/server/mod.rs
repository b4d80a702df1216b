//! Server module

pub mod config;
pub mod server;

pub use config::ServiceConfig;
pub use server::{EmbeddingService, ServiceError};
