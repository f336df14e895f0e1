//! Error types for the Cuttlefish RAG service.
//!
//! `ProviderError` describes a failed call to an external collaborator
//! (embedding provider, vector index, completion provider). `RagError` is the
//! request-level taxonomy: every variant knows which pipeline stage failed so
//! callers can tell a dead index from a rejected credential.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pipeline stage that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Request validation and overall request deadline
    Request,
    /// Routing decision
    Routing,
    /// Embedding provider call
    Embedding,
    /// Vector index search
    Index,
    /// Completion provider call
    Synthesis,
}

impl Stage {
    /// Returns the wire name for this stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Request => "request",
            Stage::Routing => "routing",
            Stage::Embedding => "embedding",
            Stage::Index => "index",
            Stage::Synthesis => "synthesis",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single call to an external collaborator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// No credential on the request and none configured
    #[error("No credential supplied and none configured")]
    MissingCredential,

    /// Provider rejected the credential (HTTP 401/403)
    #[error("Credential rejected: {0}")]
    Unauthorized(String),

    /// Provider throttled the call (HTTP 429)
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection, DNS or TLS failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be interpreted
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Call exceeded its deadline
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::RateLimited | ProviderError::Transport(_) => true,
            ProviderError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Build an HTTP error, truncating the body so provider pages never leak wholesale.
    pub fn http(status: u16, body: &str) -> Self {
        const MAX_BODY: usize = 200;
        let body = if body.chars().count() > MAX_BODY {
            let mut cut: String = body.chars().take(MAX_BODY).collect();
            cut.push_str("...");
            cut
        } else {
            body.to_string()
        };
        ProviderError::Http { status, body }
    }
}

/// Request-level error surfaced by the RAG pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    /// Malformed or empty query, rejected before any external call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Embedding provider failed
    #[error("Embedding provider unavailable: {0}")]
    EmbeddingUnavailable(#[source] ProviderError),

    /// Vector index failed
    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(#[source] ProviderError),

    /// Completion provider failed fatally
    #[error("Answer synthesis unavailable: {0}")]
    SynthesisUnavailable(#[source] ProviderError),

    /// A stage exceeded its deadline
    #[error("{stage} stage timed out after {elapsed_ms}ms")]
    Timeout { stage: Stage, elapsed_ms: u64 },

    /// Caller went away before a response was assembled
    #[error("Request cancelled")]
    Cancelled,
}

impl RagError {
    /// Map an embedding provider failure, keeping timeouts distinguishable.
    pub fn embedding(err: ProviderError) -> Self {
        Self::from_provider(Stage::Embedding, err)
    }

    /// Map a vector index failure, keeping timeouts distinguishable.
    pub fn index(err: ProviderError) -> Self {
        Self::from_provider(Stage::Index, err)
    }

    /// Map a completion provider failure, keeping timeouts distinguishable.
    pub fn synthesis(err: ProviderError) -> Self {
        Self::from_provider(Stage::Synthesis, err)
    }

    fn from_provider(stage: Stage, err: ProviderError) -> Self {
        match (stage, err) {
            (stage, ProviderError::Timeout(elapsed)) => RagError::Timeout {
                stage,
                elapsed_ms: elapsed.as_millis() as u64,
            },
            (Stage::Embedding, err) => RagError::EmbeddingUnavailable(err),
            (Stage::Index, err) => RagError::IndexUnavailable(err),
            (_, err) => RagError::SynthesisUnavailable(err),
        }
    }

    /// Stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            RagError::InvalidInput(_) => Stage::Request,
            RagError::EmbeddingUnavailable(_) => Stage::Embedding,
            RagError::IndexUnavailable(_) => Stage::Index,
            RagError::SynthesisUnavailable(_) => Stage::Synthesis,
            RagError::Timeout { stage, .. } => *stage,
            RagError::Cancelled => Stage::Request,
        }
    }

    /// Stable machine-readable kind, used in error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            RagError::InvalidInput(_) => "InvalidInput",
            RagError::EmbeddingUnavailable(_) => "EmbeddingUnavailable",
            RagError::IndexUnavailable(_) => "IndexUnavailable",
            RagError::SynthesisUnavailable(_) => "SynthesisUnavailable",
            RagError::Timeout { .. } => "Timeout",
            RagError::Cancelled => "Cancelled",
        }
    }
}

/// Configuration loading or validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Sources could not be read or deserialized
    #[error("Failed to load configuration: {0}")]
    Load(String),

    /// A value is out of range
    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_keeps_stage() {
        let err = RagError::embedding(ProviderError::Timeout(Duration::from_millis(250)));
        match err {
            RagError::Timeout { stage, elapsed_ms } => {
                assert_eq!(stage, Stage::Embedding);
                assert_eq!(elapsed_ms, 250);
            }
            other => panic!("Expected Timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_stage_mapping() {
        assert_eq!(
            RagError::index(ProviderError::RateLimited).stage(),
            Stage::Index
        );
        assert_eq!(
            RagError::synthesis(ProviderError::MissingCredential).kind(),
            "SynthesisUnavailable"
        );
        assert_eq!(RagError::InvalidInput("x".into()).stage(), Stage::Request);
    }

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::RateLimited.is_transient());
        assert!(ProviderError::http(503, "busy").is_transient());
        assert!(!ProviderError::http(400, "bad").is_transient());
        assert!(!ProviderError::Unauthorized("nope".into()).is_transient());
    }

    #[test]
    fn test_http_body_truncated() {
        let body = "x".repeat(1000);
        match ProviderError::http(500, &body) {
            ProviderError::Http { body, .. } => assert_eq!(body.chars().count(), 203),
            other => panic!("Expected Http, got {other:?}"),
        }
    }

    #[test]
    fn test_display_names_stage() {
        let err = RagError::Timeout {
            stage: Stage::Synthesis,
            elapsed_ms: 10,
        };
        assert_eq!(err.to_string(), "synthesis stage timed out after 10ms");
    }
}
