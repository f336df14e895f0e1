//! OpenAI-compatible embedding and chat completion clients.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use cuttlefish_rag::{Completer, Completion};
use cuttlefish_retrieval::Embedder;
use cuttlefish_types::{ProviderError, Settings};

use crate::http::{build_client, check_status, decode, resolve_credential, transport_error};
use crate::retry::RetryPolicy;

/// Configuration for OpenAI-compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,

    /// Key used when a request carries none
    pub api_key: Option<SecretString>,

    /// Embedding model (e.g., "text-embedding-3-small")
    pub embed_model: String,

    /// Chat model used for answers
    pub rag_model: String,

    pub max_tokens: u32,

    pub temperature: f32,

    /// HTTP timeout for embedding calls
    pub embed_timeout: Duration,

    /// HTTP timeout for completion calls
    pub completion_timeout: Duration,

    pub retry: RetryPolicy,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            embed_model: "text-embedding-3-small".to_string(),
            rag_model: "gpt-3.5-turbo".to_string(),
            max_tokens: 512,
            temperature: 0.2,
            embed_timeout: Duration::from_secs(10),
            completion_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

impl OpenAiConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let openai = &settings.openai;
        Self {
            base_url: openai.base_url.trim_end_matches('/').to_string(),
            api_key: openai
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::from),
            embed_model: openai.embed_model.clone(),
            rag_model: openai.rag_model.clone(),
            max_tokens: openai.max_tokens,
            temperature: openai.temperature,
            embed_timeout: settings.timeouts.embed(),
            completion_timeout: settings.timeouts.completion(),
            retry: RetryPolicy::new(openai.max_retries),
        }
    }

    /// Config pointed at a custom base URL (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Embedding client for `POST {base_url}/embeddings`.
pub struct OpenAiEmbedder {
    client: Client,
    config: OpenAiConfig,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(config: OpenAiConfig) -> Result<Self, ProviderError> {
        let client = build_client(config.embed_timeout)?;
        Ok(Self { client, config })
    }

    async fn make_request(&self, text: &str, key: &SecretString) -> Result<Vec<f32>, ProviderError> {
        let url = format!("{}/embeddings", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(key.expose_secret())
            .json(&EmbeddingRequest {
                input: text,
                model: &self.config.embed_model,
            })
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.embed_timeout))?;

        let body: EmbeddingResponse = decode(check_status(response).await?).await?;
        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ProviderError::Malformed("No embedding in response".to_string()))
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(
        &self,
        text: &str,
        credential: Option<&SecretString>,
    ) -> Result<Vec<f32>, ProviderError> {
        let key = resolve_credential(credential, self.config.api_key.as_ref())?;
        let vector = self
            .config
            .retry
            .run("embed", || self.make_request(text, key))
            .await?;
        debug!(dimension = vector.len(), "Embedded text");
        Ok(vector)
    }

    fn has_default_credential(&self) -> bool {
        self.config.api_key.is_some()
    }
}

/// Chat completion client for `POST {base_url}/chat/completions`.
pub struct OpenAiCompleter {
    client: Client,
    config: OpenAiConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageResponse>,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

impl OpenAiCompleter {
    pub fn new(config: OpenAiConfig) -> Result<Self, ProviderError> {
        let client = build_client(config.completion_timeout)?;
        Ok(Self { client, config })
    }

    async fn make_request(&self, prompt: &str, key: &SecretString) -> Result<Completion, ProviderError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(key.expose_secret())
            .json(&ChatRequest {
                model: &self.config.rag_model,
                messages: vec![ChatMessage {
                    role: "user",
                    content: prompt,
                }],
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            })
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.completion_timeout))?;

        let body: ChatResponse = decode(check_status(response).await?).await?;
        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .map(Completion::Text)
            .unwrap_or(Completion::Empty))
    }
}

#[async_trait]
impl Completer for OpenAiCompleter {
    async fn complete(
        &self,
        prompt: &str,
        credential: Option<&SecretString>,
    ) -> Result<Completion, ProviderError> {
        let key = resolve_credential(credential, self.config.api_key.as_ref())?;
        self.config
            .retry
            .run("complete", || self.make_request(prompt, key))
            .await
    }

    fn has_default_credential(&self) -> bool {
        self.config.api_key.is_some()
    }
}
