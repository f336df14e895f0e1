//! # cuttlefish-providers
//!
//! HTTP clients for the external collaborators:
//!
//! - [`OpenAiEmbedder`]: `POST {base_url}/embeddings`
//! - [`OpenAiCompleter`]: `POST {base_url}/chat/completions`
//! - [`QdrantIndex`]: `POST {url}/collections/{collection}/points/search`,
//!   plus the collection summary and point scroll behind `cuttlefish inspect`
//!
//! Transient failures (HTTP 429, 5xx, transport errors) are retried with
//! exponential backoff; everything else fails on the first attempt.

mod http;
pub mod openai;
pub mod qdrant;
pub mod retry;

pub use openai::{OpenAiCompleter, OpenAiConfig, OpenAiEmbedder};
pub use qdrant::{CollectionInfo, QdrantConfig, QdrantIndex, StoredPoint};
pub use retry::RetryPolicy;
