//! End-to-end test infrastructure for cuttlefish.
//!
//! Provides a shared TestHarness that wires the HTTP router to in-memory
//! collaborators, plus request helpers for driving it.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use cuttlefish_rag::mock::MockCompleter;
use cuttlefish_rag::{PipelineConfig, RagPipeline};
use cuttlefish_retrieval::mock::{sample_index, MockEmbedder, MockIndex};
use cuttlefish_service::AppState;

pub const LEAK_QUERY: &str = "How to fix memory leaks in XML parser";
pub const INCIDENT_QUERY: &str = "Production system down with ClassCastException";

/// Shared test harness for E2E tests.
///
/// Keeps handles on the mock collaborators so tests can assert on call
/// counts after driving the router.
pub struct TestHarness {
    pub embedder: Arc<MockEmbedder>,
    pub index: Arc<MockIndex>,
    pub completer: Arc<MockCompleter>,
    pub pipeline: Arc<RagPipeline>,
}

impl TestHarness {
    /// Harness over the sample ticket corpus with well-behaved mocks.
    pub fn new() -> Self {
        Self::with_parts(MockEmbedder::new(), sample_index(), MockCompleter::new())
    }

    pub fn with_parts(embedder: MockEmbedder, index: MockIndex, completer: MockCompleter) -> Self {
        Self::with_config(PipelineConfig::default(), embedder, index, completer)
    }

    pub fn with_config(
        config: PipelineConfig,
        embedder: MockEmbedder,
        index: MockIndex,
        completer: MockCompleter,
    ) -> Self {
        let embedder = Arc::new(embedder);
        let index = Arc::new(index);
        let completer = Arc::new(completer);
        let pipeline = Arc::new(RagPipeline::new(
            config,
            embedder.clone(),
            index.clone(),
            completer.clone(),
        ));

        Self {
            embedder,
            index,
            completer,
            pipeline,
        }
    }

    /// Fresh router over the harness pipeline.
    pub fn router(&self) -> Router {
        cuttlefish_service::router(AppState::new(self.pipeline.clone()))
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        post_json(self.router(), uri, body).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        get_json(self.router(), uri).await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// GET a path and decode the JSON response.
pub async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
    send(
        router,
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request"),
    )
    .await
}

/// POST a JSON body and decode the JSON response.
pub async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_raw(router, uri, body.to_string()).await
}

/// POST raw text as JSON and decode the JSON response.
pub async fn post_raw(router: Router, uri: &str, body: String) -> (StatusCode, Value) {
    send(
        router,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .expect("Failed to build request"),
    )
    .await
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.expect("Router failed");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Request body for the query endpoints.
pub fn query_body(query: &str, user_can_wait: bool, production_incident: bool) -> Value {
    serde_json::json!({
        "query": query,
        "user_can_wait": user_can_wait,
        "production_incident": production_incident,
    })
}
