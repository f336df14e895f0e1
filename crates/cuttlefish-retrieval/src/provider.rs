//! Collaborator traits consumed by the retrieval strategies.
//!
//! Implementations must be thread-safe (Send + Sync) for concurrent use.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use cuttlefish_types::{ProviderError, ScoredPoint};

/// Turns text into a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text. `credential` overrides the configured key.
    async fn embed(
        &self,
        text: &str,
        credential: Option<&SecretString>,
    ) -> Result<Vec<f32>, ProviderError>;

    /// Whether calls can succeed without a per-request credential.
    fn has_default_credential(&self) -> bool {
        true
    }
}

/// Similarity search over the ticket corpus.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `top_k` hits ordered by descending score.
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredPoint>, ProviderError>;

    /// Cheap reachability check used by health reporting.
    async fn ping(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Exact-match payload filter, serialized in Qdrant's filter shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub must: Vec<FieldCondition>,
}

/// A single `key == value` payload condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCondition {
    pub key: String,
    #[serde(rename = "match")]
    pub matches: MatchValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchValue {
    pub value: String,
}

impl SearchFilter {
    /// Filter requiring `key == value`.
    pub fn field_equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            must: vec![FieldCondition {
                key: key.into(),
                matches: MatchValue {
                    value: value.into(),
                },
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_wire_shape() {
        let filter = SearchFilter::field_equals("project", "HBASE");
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({"must": [{"key": "project", "match": {"value": "HBASE"}}]})
        );
    }
}
