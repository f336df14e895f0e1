//! Qdrant REST client: similarity search plus the read-only collection
//! summary and point scroll used by `cuttlefish inspect`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use cuttlefish_retrieval::{SearchFilter, VectorIndex};
use cuttlefish_types::{PointId, ProviderError, ScoredPoint, Settings};

use crate::http::{build_client, check_status, decode, transport_error};
use crate::retry::RetryPolicy;

/// Connection settings for a Qdrant collection.
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    /// Base URL (e.g., "http://localhost:6333")
    pub url: String,

    /// Sent as the `api-key` header when present
    pub api_key: Option<SecretString>,

    pub collection: String,

    pub timeout: Duration,

    pub retry: RetryPolicy,
}

impl QdrantConfig {
    pub fn new(url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            collection: collection.into(),
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let qdrant = &settings.qdrant;
        Self {
            url: qdrant.url.trim_end_matches('/').to_string(),
            api_key: qdrant
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::from),
            collection: qdrant.collection.clone(),
            timeout: settings.timeouts.search(),
            retry: RetryPolicy::new(settings.openai.max_retries),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Vector index backed by a Qdrant collection.
pub struct QdrantIndex {
    client: Client,
    config: QdrantConfig,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a SearchFilter>,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Serialize)]
struct ScrollRequest {
    limit: usize,
    with_payload: bool,
    with_vector: bool,
}

#[derive(Deserialize)]
struct ScrollResponse {
    result: ScrollPage,
}

#[derive(Deserialize)]
struct ScrollPage {
    points: Vec<StoredPoint>,
}

#[derive(Deserialize)]
struct CollectionResponse {
    result: RawCollection,
}

#[derive(Deserialize)]
struct RawCollection {
    status: String,
    #[serde(default)]
    points_count: Option<u64>,
    #[serde(default)]
    config: Value,
}

/// Collection summary from `GET /collections/{name}`.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionInfo {
    pub name: String,

    /// Optimizer status ("green", "yellow", "red")
    pub status: String,

    pub points_count: Option<u64>,

    /// Size of the unnamed vector; `None` for named-vector collections
    pub vector_size: Option<u64>,

    /// Distance metric of the unnamed vector
    pub distance: Option<String>,
}

/// A point read back without its vector.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredPoint {
    pub id: PointId,
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
}

impl QdrantIndex {
    pub fn new(config: QdrantConfig) -> Result<Self, ProviderError> {
        let client = build_client(config.timeout)?;
        Ok(Self { client, config })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.config.url, self.config.collection)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.header("api-key", key.expose_secret()),
            None => request,
        }
    }

    async fn make_search(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredPoint>, ProviderError> {
        let url = format!("{}/points/search", self.collection_url());
        let response = self
            .authorize(self.client.post(&url))
            .json(&SearchRequest {
                vector,
                limit: top_k,
                with_payload: true,
                filter,
            })
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout))?;

        let body: SearchResponse = decode(check_status(response).await?).await?;
        Ok(body.result)
    }

    async fn make_collection_info(&self) -> Result<CollectionResponse, ProviderError> {
        let response = self
            .authorize(self.client.get(self.collection_url()))
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout))?;
        decode(check_status(response).await?).await
    }

    async fn make_scroll(&self, limit: usize) -> Result<ScrollResponse, ProviderError> {
        let url = format!("{}/points/scroll", self.collection_url());
        let response = self
            .authorize(self.client.post(&url))
            .json(&ScrollRequest {
                limit,
                with_payload: true,
                with_vector: false,
            })
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout))?;
        decode(check_status(response).await?).await
    }

    /// Read the collection summary.
    pub async fn collection_info(&self) -> Result<CollectionInfo, ProviderError> {
        let body = self
            .config
            .retry
            .run("collection_info", || self.make_collection_info())
            .await?;

        let vectors = body.result.config.pointer("/params/vectors");
        Ok(CollectionInfo {
            name: self.config.collection.clone(),
            status: body.result.status,
            points_count: body.result.points_count,
            vector_size: vectors.and_then(|v| v.get("size")).and_then(Value::as_u64),
            distance: vectors
                .and_then(|v| v.get("distance"))
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    /// Read up to `limit` points from the start of the collection, payloads only.
    pub async fn sample_points(&self, limit: usize) -> Result<Vec<StoredPoint>, ProviderError> {
        let body = self
            .config
            .retry
            .run("scroll", || self.make_scroll(limit))
            .await?;

        debug!(
            collection = %self.config.collection,
            points = body.result.points.len(),
            "Scrolled collection"
        );
        Ok(body.result.points)
    }

    pub fn collection(&self) -> &str {
        &self.config.collection
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredPoint>, ProviderError> {
        let points = self
            .config
            .retry
            .run("search", || self.make_search(vector, top_k, filter))
            .await?;
        debug!(
            collection = %self.config.collection,
            hits = points.len(),
            "Searched collection"
        );
        Ok(points)
    }

    async fn ping(&self) -> Result<(), ProviderError> {
        let response = self
            .authorize(self.client.get(self.collection_url()))
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout))?;
        check_status(response).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn index(server: &MockServer) -> QdrantIndex {
        let config = QdrantConfig::new(server.uri(), "jira_issues")
            .with_retry(RetryPolicy::new(2).with_initial_interval(Duration::from_millis(1)));
        QdrantIndex::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_search_request_and_parse() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/jira_issues/points/search"))
            .and(body_json(json!({
                "vector": [0.5, 0.25],
                "limit": 5,
                "with_payload": true,
                "filter": {"must": [{"key": "project", "match": {"value": "HBASE"}}]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [
                    {"id": 42, "version": 1, "score": 0.91, "payload": {"key": "HBASE-001", "title": "Leak"}},
                    {"id": "5c56c793-69f3-4fbf-87e6-c4bf54c28c26", "version": 1, "score": 0.5, "payload": null}
                ],
                "status": "ok",
                "time": 0.001
            })))
            .expect(1)
            .mount(&server)
            .await;

        let filter = SearchFilter::field_equals("project", "HBASE");
        let hits = index(&server)
            .search(&[0.5, 0.25], 5, Some(&filter))
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, PointId::Num(42));
        assert_eq!(hits[0].payload["key"], "HBASE-001");
        assert_eq!(
            hits[1].id,
            PointId::Uuid("5c56c793-69f3-4fbf-87e6-c4bf54c28c26".to_string())
        );
        assert!(hits[1].payload.is_empty());
    }

    #[tokio::test]
    async fn test_collection_info() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/jira_issues"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "status": "green",
                    "optimizer_status": "ok",
                    "points_count": 1250,
                    "config": {"params": {"vectors": {"size": 1536, "distance": "Cosine"}}}
                },
                "status": "ok",
                "time": 0.0004
            })))
            .expect(1)
            .mount(&server)
            .await;

        let info = index(&server).collection_info().await.unwrap();
        assert_eq!(
            info,
            CollectionInfo {
                name: "jira_issues".to_string(),
                status: "green".to_string(),
                points_count: Some(1250),
                vector_size: Some(1536),
                distance: Some("Cosine".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_collection_info_named_vectors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/jira_issues"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "status": "yellow",
                    "config": {"params": {"vectors": {"dense": {"size": 384, "distance": "Dot"}}}}
                }
            })))
            .mount(&server)
            .await;

        let info = index(&server).collection_info().await.unwrap();
        assert_eq!(info.status, "yellow");
        assert_eq!(info.points_count, None);
        assert_eq!(info.vector_size, None);
    }

    #[tokio::test]
    async fn test_sample_points() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/jira_issues/points/scroll"))
            .and(body_json(json!({"limit": 2, "with_payload": true, "with_vector": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "points": [
                        {"id": 1, "payload": {"key": "HBASE-001", "title": "Leak"}},
                        {"id": 2, "payload": null}
                    ],
                    "next_page_offset": 3
                },
                "status": "ok"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let points = index(&server).sample_points(2).await.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].id, PointId::Num(1));
        assert_eq!(points[0].payload.as_ref().unwrap()["key"], "HBASE-001");
        assert!(points[1].payload.is_none());
    }

    #[tokio::test]
    async fn test_api_key_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/jira_issues"))
            .and(header("api-key", "qdrant-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = QdrantConfig::new(server.uri(), "jira_issues");
        config.api_key = Some(SecretString::from("qdrant-secret".to_string()));
        let index = QdrantIndex::new(config).unwrap();
        assert!(index.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_collection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/jira_issues/points/search"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_string("Collection `jira_issues` doesn't exist!"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = index(&server).search(&[0.1], 5, None).await.unwrap_err();
        assert!(matches!(err, ProviderError::Http { status: 404, .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_unreachable_index() {
        // Nothing listens on the discard port.
        let config = QdrantConfig::new("http://127.0.0.1:9", "jira_issues")
            .with_retry(RetryPolicy::new(1));
        let index = QdrantIndex::new(config).unwrap();

        assert!(matches!(
            index.ping().await,
            Err(ProviderError::Transport(_))
        ));
    }
}
