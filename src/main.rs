//! Restaurant Content Server
//!
//! Main entry point: loads configuration, sets up logging and serves the
//! content API until the process is stopped.

use anyhow::Context;
use restaurant_content::{ContentServer, ServerConfig};
use std::env;
use std::path::Path;
use tracing::{info, warn};

/// Main entry point for the content server
///
/// # Usage
/// ```bash
/// # Start with default config (content_server.yaml)
/// restaurant-content
///
/// # Start with custom config
/// restaurant-content /path/to/config.yaml
/// ```
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    info!("Starting Restaurant Content Server");

    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "content_server.yaml".to_string());

    let config = if Path::new(&config_path).exists() {
        info!("Loading configuration from: {}", config_path);
        ServerConfig::from_file(&config_path)
            .with_context(|| format!("Failed to load configuration from {}", config_path))?
    } else {
        warn!("{} not found, using default configuration", config_path);
        ServerConfig::default()
    };

    info!("Configuration loaded successfully");
    info!("  - Listen address: {}", config.listen_address);
    info!("  - Content directory: {}", config.content_dir.display());
    info!(
        "  - Module rate limit: {} requests / {}ms",
        config.rate_limit.max_requests, config.rate_limit.window_ms
    );
    info!(
        "  - Manifest rate limit: {} requests / {}ms",
        config.manifest_rate_limit.max_requests, config.manifest_rate_limit.window_ms
    );
    info!("  - Max response size: {} bytes", config.max_response_bytes);
    info!(
        "  - Cache enabled: {} ({} MB budget)",
        config.cache.enabled,
        config.cache.max_size_bytes / (1024 * 1024)
    );
    info!("  - Development mode: {}", config.development_mode);

    let server = ContentServer::new(config).context("Failed to initialize content server")?;
    server.start().await.context("Content server stopped")?;
    Ok(())
}
