//! Mock collaborators for testing.
//!
//! `MockEmbedder` produces deterministic bag-of-words hash vectors and
//! `MockIndex` ranks stored tickets by cosine similarity against them, so
//! queries that share words with a ticket rank it higher without any network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{json, Map, Value};

use cuttlefish_types::{PointId, ProviderError, ScoredPoint};

use crate::provider::{Embedder, SearchFilter, VectorIndex};

/// Dimension of mock embeddings.
pub const MOCK_DIMENSION: usize = 64;

/// Deterministic hashing embedding (FNV-1a per lowercase word), unit length.
pub fn hash_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut values = vec![0.0f32; dimension.max(1)];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in word.to_lowercase().bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }
        let slot = (hash % values.len() as u64) as usize;
        values[slot] += 1.0;
    }

    let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        values.iter_mut().for_each(|x| *x /= norm);
    }
    values
}

/// Embedder returning hash embeddings, with configurable failures.
#[derive(Default)]
pub struct MockEmbedder {
    failure: Option<ProviderError>,
    fail_on: Vec<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call with `error`.
    pub fn failing(mut self, error: ProviderError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Fail calls whose text contains `needle`.
    pub fn fail_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_on.push(needle.into());
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of embed calls made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(
        &self,
        text: &str,
        _credential: Option<&SecretString>,
    ) -> Result<Vec<f32>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if self.fail_on.iter().any(|needle| text.contains(needle.as_str())) {
            return Err(ProviderError::http(500, "embedding backend error"));
        }

        Ok(hash_embedding(text, MOCK_DIMENSION))
    }
}

struct StoredPoint {
    id: PointId,
    vector: Vec<f32>,
    payload: Map<String, Value>,
}

/// In-memory index ranking stored payloads by cosine similarity.
#[derive(Default)]
pub struct MockIndex {
    points: Vec<StoredPoint>,
    failure: Option<ProviderError>,
    failing_vectors: Vec<Vec<f32>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a payload; its vector is the hash embedding of title + description.
    pub fn with_point(mut self, id: impl Into<PointId>, payload: Value) -> Self {
        let payload = payload.as_object().cloned().unwrap_or_default();
        let text = ["title", "description", "page_content"]
            .iter()
            .filter_map(|k| payload.get(*k).and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        self.points.push(StoredPoint {
            id: id.into(),
            vector: hash_embedding(&text, MOCK_DIMENSION),
            payload,
        });
        self
    }

    /// Fail every search with `error`.
    pub fn failing(mut self, error: ProviderError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Fail searches for the mock embedding of `text` with HTTP 503.
    pub fn fail_for_query(mut self, text: &str) -> Self {
        self.failing_vectors.push(hash_embedding(text, MOCK_DIMENSION));
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of search calls made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn matches(payload: &Map<String, Value>, filter: Option<&SearchFilter>) -> bool {
        let Some(filter) = filter else {
            return true;
        };
        filter.must.iter().all(|cond| {
            payload
                .get(&cond.key)
                .or_else(|| payload.get("metadata").and_then(|m| m.get(&cond.key)))
                .and_then(Value::as_str)
                .is_some_and(|v| v == cond.matches.value)
        })
    }
}

#[async_trait]
impl VectorIndex for MockIndex {
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredPoint>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if self.failing_vectors.iter().any(|v| v.as_slice() == vector) {
            return Err(ProviderError::http(503, "search shard unavailable"));
        }

        let mut hits: Vec<ScoredPoint> = self
            .points
            .iter()
            .filter(|p| Self::matches(&p.payload, filter))
            .map(|p| ScoredPoint {
                id: p.id.clone(),
                score: p
                    .vector
                    .iter()
                    .zip(vector)
                    .map(|(a, b)| a * b)
                    .sum::<f32>()
                    .max(0.0),
                payload: p.payload.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn ping(&self) -> Result<(), ProviderError> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Index preloaded with a small issue-tracker corpus.
pub fn sample_index() -> MockIndex {
    sample_tickets()
        .into_iter()
        .fold(MockIndex::new(), |index, (id, payload)| {
            index.with_point(id, payload)
        })
}

/// Sample ticket payloads, in both flat and LangChain-style shapes.
pub fn sample_tickets() -> Vec<(u64, Value)> {
    vec![
        (
            1,
            json!({
                "key": "HBASE-001", "project": "HBASE", "priority": "Critical", "type": "Bug",
                "title": "Memory leak in XML parser",
                "description": "Application crashes after processing multiple XML files due to memory not being freed properly in the parser library."
            }),
        ),
        (
            2,
            json!({
                "page_content": "Title: ClassCastException in SAXParserFactory\n\nDescription: Getting ClassCastException when trying to create SAX parser factory in multi-threaded environment.",
                "metadata": {"key": "FLEX-002", "project": "FLEX", "priority": "Major", "type": "Bug"}
            }),
        ),
        (
            3,
            json!({
                "key": "SPR-003", "project": "SPR", "priority": "Minor", "type": "Bug",
                "title": "Maven archetype generation fails",
                "description": "Maven archetype generate command fails with dependency resolution errors in offline mode."
            }),
        ),
        (
            4,
            json!({
                "key": "HBASE-004", "project": "HBASE", "priority": "Major", "type": "Bug",
                "title": "ZooKeeper quota exceeded",
                "description": "ZooKeeper client throws quota exceeded exception when creating more than 1000 znodes."
            }),
        ),
        (
            5,
            json!({
                "key": "JBIDE-005", "project": "JBIDE", "priority": "Critical", "type": "Bug",
                "title": "Hibernate lazy loading issue",
                "description": "LazyInitializationException occurs when accessing lazy loaded collections outside of session scope."
            }),
        ),
        (
            6,
            json!({
                "key": "HBASE-006", "project": "HBASE", "priority": "Blocker", "type": "Bug",
                "title": "Production region server down after ClassCastException",
                "description": "Region servers abort with ClassCastException during compaction, taking production down."
            }),
        ),
        (
            7,
            json!({
                "key": "FLEX-007", "project": "FLEX", "priority": "Minor", "type": "Improvement",
                "title": "Reduce XML parser memory footprint",
                "description": "Streaming parser mode to reduce memory use on large XML documents."
            }),
        ),
        (
            8,
            json!({
                "key": "SPR-008", "project": "SPR", "priority": "Major", "type": "Task",
                "title": "Document leak detection settings",
                "description": "Explain how to enable heap dump on memory leak detection in the admin guide."
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_embedding_is_unit_length() {
        let v = hash_embedding("memory leak in parser", MOCK_DIMENSION);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
        assert_eq!(v, hash_embedding("Memory LEAK in parser", MOCK_DIMENSION));
    }

    #[test]
    fn test_hash_embedding_empty_text() {
        let v = hash_embedding("", MOCK_DIMENSION);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_index_ranks_by_similarity() {
        let index = sample_index();
        let query = hash_embedding("ZooKeeper quota exceeded", MOCK_DIMENSION);
        let hits = index.search(&query, 3, None).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, PointId::Num(4));
    }

    #[tokio::test]
    async fn test_index_fails_for_query() {
        let index = sample_index().fail_for_query("memory leak");
        let failing = hash_embedding("memory leak", MOCK_DIMENSION);
        let other = hash_embedding("quota exceeded", MOCK_DIMENSION);

        assert!(matches!(
            index.search(&failing, 5, None).await,
            Err(ProviderError::Http { status: 503, .. })
        ));
        assert_eq!(index.search(&other, 5, None).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_index_filter() {
        let index = sample_index();
        let query = hash_embedding("memory", MOCK_DIMENSION);
        let filter = SearchFilter::field_equals("project", "FLEX");
        let hits = index.search(&query, 10, Some(&filter)).await.unwrap();
        assert_eq!(hits.len(), 2);
    }
}
