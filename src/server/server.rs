//! Request Loop
//!
//! Reads one JSON request per line, dispatches it, writes one JSON response
//! per line and flushes before reading the next. Per-request failures become
//! error responses; only I/O failure on the streams ends the loop early.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use crate::models::config::ModelConfig;
use crate::models::{EmbeddingError, EmbeddingProvider, EmbeddingResult};
use crate::protocol::{decode_request, encode_response, ProtocolError, Request, Response};
use crate::server::config::ServiceConfig;

/// Anything that can fail while answering a single request
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

pub struct EmbeddingService {
    provider: EmbeddingProvider,
}

impl EmbeddingService {
    /// Startup: resolve and load the configured model. Any error here is fatal.
    pub fn new(config: &ServiceConfig) -> EmbeddingResult<Self> {
        let model_config = ModelConfig::from_settings(&config.embedding)?;
        let provider = EmbeddingProvider::load(&model_config)?;

        let info = provider.model_info();
        info!(
            "Model '{}': max_sequence_length={}, normalized={}",
            info.name, info.max_sequence_length, info.normalized
        );
        match info.dimension {
            Some(dimension) => info!("Embedding dimension: {}", dimension),
            None => debug!("Embedding dimension unknown until first request"),
        }

        Ok(Self::with_provider(provider))
    }

    pub fn with_provider(provider: EmbeddingProvider) -> Self {
        Self { provider }
    }

    /// Run one decoded request against the provider
    pub async fn dispatch(&self, request: Request) -> Result<Response, ServiceError> {
        match request {
            Request::EmbedTexts { texts } => {
                let embeddings = self.provider.embed_many(&texts).await?;
                Ok(Response::embeddings(embeddings))
            }
            Request::EmbedQuery { query } => {
                let embedding = self.provider.embed_one(&query).await?;
                Ok(Response::embedding(embedding))
            }
            Request::Ping {} => Ok(Response::pong()),
        }
    }

    /// Answer one input line. Never fails: errors are folded into the response.
    pub async fn handle_line(&self, line: &[u8]) -> Response {
        let result = match decode_request(line) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => Err(e.into()),
        };

        result.unwrap_or_else(|e| {
            warn!("Request failed: {}", e);
            Response::error(e.to_string())
        })
    }

    /// Serve requests until the reader reaches end-of-input.
    ///
    /// Returns the number of requests answered.
    pub async fn run<R, W>(&self, mut reader: R, mut writer: W) -> std::io::Result<u64>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = Vec::new();
        let mut served = 0u64;

        info!("[Embeddings] Service ready, waiting for requests...");

        loop {
            line.clear();

            // Bytes, not String: invalid UTF-8 is a bad request, not a dead stream
            let bytes_read = reader.read_until(b'\n', &mut line).await.map_err(|e| {
                error!("Failed to read request: {}", e);
                e
            })?;

            if bytes_read == 0 {
                info!("Input closed (EOF), shutting down after {} requests", served);
                break;
            }

            let response = self.handle_line(line.trim_ascii()).await;

            let response_json = encode_response(&response)
                .or_else(|e| encode_response(&Response::error(e.to_string())))
                .map_err(std::io::Error::other)?;
            debug!("Sending {} bytes (success: {})", response_json.len(), response.is_success());

            writer.write_all(response_json.as_bytes()).await.map_err(|e| {
                error!("Failed to write response: {}", e);
                e
            })?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;

            served += 1;
        }

        Ok(served)
    }
}
