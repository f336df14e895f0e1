//! Command implementations for the cuttlefish binary.
//!
//! Handles:
//! - serve: Load config, build providers and pipeline, run the HTTP server
//! - route: Print a routing decision locally

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use cuttlefish_providers::{
    OpenAiCompleter, OpenAiConfig, OpenAiEmbedder, QdrantConfig, QdrantIndex,
};
use cuttlefish_rag::{PipelineConfig, RagPipeline};
use cuttlefish_retrieval::RoutingDecisionEngine;
use cuttlefish_service::{run_server_with_shutdown, AppState};
use cuttlefish_types::Settings;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
pub fn init_tracing(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Build the pipeline with HTTP-backed collaborators.
pub fn build_pipeline(settings: &Settings) -> Result<RagPipeline> {
    let openai = OpenAiConfig::from_settings(settings);
    if openai.api_key.is_none() {
        warn!("No OpenAI API key configured; requests must supply openai_api_key");
    }

    let embedder =
        OpenAiEmbedder::new(openai.clone()).context("Failed to create embedding client")?;
    let completer = OpenAiCompleter::new(openai).context("Failed to create completion client")?;
    let index = QdrantIndex::new(QdrantConfig::from_settings(settings))
        .context("Failed to create Qdrant client")?;

    Ok(RagPipeline::new(
        PipelineConfig::from_settings(settings),
        Arc::new(embedder),
        Arc::new(index),
        Arc::new(completer),
    ))
}

/// Start the HTTP server.
///
/// 1. Load configuration (defaults -> file -> env -> CLI)
/// 2. Build provider clients and the pipeline
/// 3. Serve until Ctrl+C / SIGTERM, cancelling in-flight requests
pub async fn serve(
    config_path: Option<&str>,
    host_override: Option<&str>,
    port_override: Option<u16>,
    log_level_override: Option<&str>,
) -> Result<()> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;

    if let Some(host) = host_override {
        settings.http_host = host.to_string();
    }
    if let Some(port) = port_override {
        settings.http_port = port;
    }
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }

    init_tracing(&settings.log_level)?;

    info!("Cuttlefish starting...");
    info!("Configuration:");
    info!("  HTTP address: {}", settings.http_addr());
    info!("  Qdrant: {} (collection {})", settings.qdrant.url, settings.qdrant.collection);
    info!(
        "  Models: embed={} rag={}",
        settings.openai.embed_model, settings.openai.rag_model
    );
    info!("  Log level: {}", settings.log_level);

    let pipeline = build_pipeline(&settings)?;

    let addr: SocketAddr = settings
        .http_addr()
        .parse()
        .context("Invalid HTTP address")?;

    run_server_with_shutdown(addr, AppState::new(Arc::new(pipeline)), shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

/// Print the routing decision for a query.
pub fn route(query: &str, can_wait: bool, incident: bool) -> Result<()> {
    let routing = RoutingDecisionEngine::new()
        .decide(query, can_wait, incident)
        .context("Routing failed")?;

    println!("Decision:  {}", routing.decision);
    println!("Method:    {}", routing.decision.method());
    println!("Reasoning: {}", routing.reasoning);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_pipeline_without_key() {
        let settings = Settings::default();
        let pipeline = build_pipeline(&settings).unwrap();
        assert_eq!(pipeline.config().strategies.fast_top_k, 5);
    }

    #[test]
    fn test_route_prints_decision() {
        assert!(route("Production system down", false, true).is_ok());
    }

    #[test]
    fn test_route_rejects_blank_query() {
        assert!(route("   ", false, false).is_err());
    }
}
