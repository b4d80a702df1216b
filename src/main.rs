//! Embedding Service Main
//!
//! Entry point for the stdio embedding service. Protocol responses go to
//! stdout; every log line goes to stderr.

use embedding_service::server::config::DEFAULT_LOG_FILTER;
use embedding_service::{EmbeddingService, ServiceConfig};
use tokio::io::BufReader;
use tracing::{error, info};

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into())
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .without_time()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = match ServiceConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            // Log level unknown yet: fall back to RUST_LOG or the default filter
            init_tracing(DEFAULT_LOG_FILTER);
            error!("[Embeddings] Failed to load config {}: {}", config_path, e);
            return Err(e.into());
        }
    };

    init_tracing(config.monitoring.log_filter());

    // Startup: no response channel exists yet, so a load failure ends the process
    let service = EmbeddingService::new(&config).map_err(|e| {
        error!("[Embeddings] Failed to start: {}", e);
        e
    })?;

    let served = service
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;

    info!("[Embeddings] Served {} requests", served);
    Ok(())
}
