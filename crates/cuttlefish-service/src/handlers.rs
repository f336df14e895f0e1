//! HTTP request handlers.

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use cuttlefish_rag::{AgentStatus, HealthStatus, RagResponse};
use cuttlefish_types::{Decision, PointId, Query, Ticket};

use crate::error::ApiError;
use crate::AppState;

/// Body accepted by every query endpoint.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,

    #[serde(default)]
    pub user_can_wait: bool,

    #[serde(default)]
    pub production_incident: bool,

    /// Per-request provider key, overriding the configured one
    #[serde(default)]
    pub openai_api_key: Option<String>,
}

impl QueryRequest {
    fn into_query(self) -> Query {
        Query::new(self.query, self.user_can_wait, self.production_incident)
            .with_credential(self.openai_api_key)
    }
}

fn parse(body: Result<Json<QueryRequest>, JsonRejection>) -> Result<Query, ApiError> {
    let Json(request) = body?;
    Ok(request.into_query())
}

// -- /health --

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub agents: BTreeMap<String, AgentStatus>,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let health = state.pipeline.health().await;
    Json(HealthResponse {
        status: health.status,
        service: state.service.clone(),
        version: state.version.clone(),
        agents: health.agents,
    })
}

// -- /debug/routing --

#[derive(Debug, Serialize, Deserialize)]
pub struct RoutingResponse {
    pub routing_decision: Decision,
    pub routing_reasoning: String,
}

pub(crate) async fn debug_routing(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<RoutingResponse>, ApiError> {
    let query = parse(body)?;
    let routing = state.pipeline.route(&query)?;
    debug!(decision = routing.decision.as_str(), "Routing diagnostic");

    Ok(Json(RoutingResponse {
        routing_decision: routing.decision,
        routing_reasoning: routing.reasoning,
    }))
}

// -- /multiagent-rag --

pub(crate) async fn multiagent_rag(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<RagResponse>, ApiError> {
    let query = parse(body)?;
    let cancel = state.shutdown.child_token();
    let response = state.pipeline.process(&query, &cancel).await?;
    Ok(Json(response))
}

// -- /similar and /rag --

/// Raw search hit with the stored payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct RawHit {
    pub id: PointId,
    pub score: f32,
    pub payload: Map<String, Value>,
}

impl From<Ticket> for RawHit {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id,
            score: ticket.score,
            payload: ticket.payload,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SimilarResponse {
    pub results: Vec<RawHit>,
}

pub(crate) async fn similar(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<SimilarResponse>, ApiError> {
    let query = parse(body)?;
    let cancel = state.shutdown.child_token();
    let result = state.pipeline.similar(&query, &cancel).await?;

    Ok(Json(SimilarResponse {
        results: result.tickets.into_iter().map(RawHit::from).collect(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleRagResponse {
    pub answer: String,
    pub context: Vec<RawHit>,
}

pub(crate) async fn rag(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<SimpleRagResponse>, ApiError> {
    let query = parse(body)?;
    let cancel = state.shutdown.child_token();
    let answer = state.pipeline.simple_rag(&query, &cancel).await?;

    Ok(Json(SimpleRagResponse {
        answer: answer.text,
        context: answer.context.into_iter().map(RawHit::from).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_default_to_false() {
        let request: QueryRequest = serde_json::from_str(r#"{"query": "parser leak"}"#).unwrap();
        let query = request.into_query();
        assert!(!query.user_can_wait());
        assert!(!query.production_incident());
        assert!(query.credential().is_none());
    }

    #[test]
    fn test_request_key_attached() {
        let request: QueryRequest = serde_json::from_str(
            r#"{"query": "q", "production_incident": true, "openai_api_key": "sk-user"}"#,
        )
        .unwrap();
        let query = request.into_query();
        assert!(query.production_incident());
        assert!(query.credential().is_some());
    }
}
