//! # cuttlefish-service
//!
//! JSON HTTP surface of the Cuttlefish ticket RAG service.
//!
//! | route | purpose |
//! |---|---|
//! | `GET /health` | agent readiness |
//! | `POST /debug/routing` | routing decision only, no external calls |
//! | `POST /multiagent-rag` | routed retrieval, synthesis and metadata |
//! | `POST /similar` | fast retrieval, raw payloads |
//! | `POST /rag` | fast retrieval and synthesis |
//!
//! Handlers are dropped when the client disconnects, which cancels their
//! in-flight work. Server shutdown cancels every in-flight request.

pub mod error;
pub mod handlers;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use cuttlefish_rag::RagPipeline;

pub use error::{ApiError, ErrorBody, ErrorDetail};
pub use handlers::{
    HealthResponse, QueryRequest, RawHit, RoutingResponse, SimilarResponse, SimpleRagResponse,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,

    /// Cancelled when the server shuts down
    pub shutdown: CancellationToken,

    pub service: String,
    pub version: String,
}

impl AppState {
    pub fn new(pipeline: Arc<RagPipeline>) -> Self {
        Self {
            pipeline,
            shutdown: CancellationToken::new(),
            service: "cuttlefish".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Build the router with every route.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/debug/routing", post(handlers::debug_routing))
        .route("/multiagent-rag", post(handlers::multiagent_rag))
        .route("/similar", post(handlers::similar))
        .route("/rag", post(handlers::rag))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already-bound listener until `shutdown_signal` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    shutdown_signal: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let shutdown = state.shutdown.clone();
    let app = router(state);

    info!(addr = %listener.local_addr()?, "HTTP server ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal.await;
            info!("Shutdown signal received, cancelling in-flight requests");
            shutdown.cancel();
        })
        .await?;

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Bind `addr` and serve with graceful shutdown support.
pub async fn run_server_with_shutdown<F>(
    addr: SocketAddr,
    state: AppState,
    shutdown_signal: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Starting HTTP server on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    serve(listener, state, shutdown_signal).await
}
