//! Configuration loading for Cuttlefish.
//!
//! Layered config: defaults -> config file -> CLI config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/cuttlefish/config.toml.
//! Environment variables use the `CUTTLEFISH_` prefix and `__` between
//! nested keys, e.g. `CUTTLEFISH_QDRANT__URL`.

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Vector index connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct QdrantSettings {
    /// Base URL of the Qdrant REST API
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    /// API key (optional for local instances)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Collection holding the ticket corpus
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_qdrant_url() -> String {
    "http://localhost:6333".to_string()
}

fn default_collection() -> String {
    "jira_issues".to_string()
}

impl Default for QdrantSettings {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            api_key: None,
            collection: default_collection(),
        }
    }
}

/// Embedding and completion provider settings (OpenAI-compatible API).
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiSettings {
    /// API base URL (for custom endpoints)
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Fallback API key when a request carries none
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_embed_model")]
    pub embed_model: String,

    #[serde(default = "default_rag_model")]
    pub rag_model: String,

    /// Completion token limit
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Attempts per provider call, including the first
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embed_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_rag_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_retries() -> u32 {
    3
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            api_key: None,
            embed_model: default_embed_model(),
            rag_model: default_rag_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_retries: default_max_retries(),
        }
    }
}

/// Retrieval strategy sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    /// Hits requested by the fast and incident paths
    #[serde(default = "default_fast_top_k")]
    pub fast_top_k: usize,

    /// Hits requested per comprehensive pass
    #[serde(default = "default_comprehensive_top_k")]
    pub comprehensive_top_k: usize,

    /// Tickets kept after merging comprehensive passes
    #[serde(default = "default_comprehensive_limit")]
    pub comprehensive_limit: usize,

    /// Upper bound on generated sub-queries
    #[serde(default = "default_max_sub_queries")]
    pub max_sub_queries: usize,

    /// Restrict every search to one project
    #[serde(default)]
    pub project: Option<String>,
}

fn default_fast_top_k() -> usize {
    5
}

fn default_comprehensive_top_k() -> usize {
    20
}

fn default_comprehensive_limit() -> usize {
    20
}

fn default_max_sub_queries() -> usize {
    4
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            fast_top_k: default_fast_top_k(),
            comprehensive_top_k: default_comprehensive_top_k(),
            comprehensive_limit: default_comprehensive_limit(),
            max_sub_queries: default_max_sub_queries(),
            project: None,
        }
    }
}

/// Prompt context sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSettings {
    /// Character budget for the assembled context block
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_max_chars() -> usize {
    12_000
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
        }
    }
}

/// Per-call and per-request deadlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutSettings {
    #[serde(default = "default_embed_ms")]
    pub embed_ms: u64,

    #[serde(default = "default_search_ms")]
    pub search_ms: u64,

    #[serde(default = "default_completion_ms")]
    pub completion_ms: u64,

    /// End-to-end bound for one request
    #[serde(default = "default_request_secs")]
    pub request_secs: u64,
}

fn default_embed_ms() -> u64 {
    10_000
}

fn default_search_ms() -> u64 {
    10_000
}

fn default_completion_ms() -> u64 {
    60_000
}

fn default_request_secs() -> u64 {
    120
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            embed_ms: default_embed_ms(),
            search_ms: default_search_ms(),
            completion_ms: default_completion_ms(),
            request_secs: default_request_secs(),
        }
    }
}

impl TimeoutSettings {
    pub fn embed(&self) -> Duration {
        Duration::from_millis(self.embed_ms)
    }

    pub fn search(&self) -> Duration {
        Duration::from_millis(self.search_ms)
    }

    pub fn completion(&self) -> Duration {
        Duration::from_millis(self.completion_ms)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }
}

/// Main application settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// HTTP listen host
    #[serde(default = "default_http_host")]
    pub http_host: String,

    /// HTTP listen port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub qdrant: QdrantSettings,

    #[serde(default)]
    pub openai: OpenAiSettings,

    #[serde(default)]
    pub retrieval: RetrievalSettings,

    #[serde(default)]
    pub context: ContextSettings,

    #[serde(default)]
    pub timeouts: TimeoutSettings,
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    5020
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            http_host: default_http_host(),
            http_port: default_http_port(),
            log_level: default_log_level(),
            qdrant: QdrantSettings::default(),
            openai: OpenAiSettings::default(),
            retrieval: RetrievalSettings::default(),
            context: ContextSettings::default(),
            timeouts: TimeoutSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/cuttlefish/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (CUTTLEFISH_*)
    ///
    /// Provider keys fall back to the conventional `OPENAI_API_KEY` and
    /// `QDRANT_API_KEY` variables. CLI flags should be applied by the caller
    /// after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir = ProjectDirs::from("", "", "cuttlefish")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("CUTTLEFISH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        let mut settings: Settings = config
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        if settings.openai.api_key.is_none() {
            settings.openai.api_key = non_empty_env("OPENAI_API_KEY");
        }
        if settings.qdrant.api_key.is_none() {
            settings.qdrant.api_key = non_empty_env("QDRANT_API_KEY");
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("retrieval.fast_top_k", self.retrieval.fast_top_k),
            ("retrieval.comprehensive_top_k", self.retrieval.comprehensive_top_k),
            ("retrieval.comprehensive_limit", self.retrieval.comprehensive_limit),
            ("context.max_chars", self.context.max_chars),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be > 0".to_string(),
                });
            }
        }

        let wider = [
            ("retrieval.comprehensive_top_k", self.retrieval.comprehensive_top_k),
            ("retrieval.comprehensive_limit", self.retrieval.comprehensive_limit),
        ];
        for (field, value) in wider {
            if value < self.retrieval.fast_top_k {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!(
                        "must be >= retrieval.fast_top_k ({}), got {}",
                        self.retrieval.fast_top_k, value
                    ),
                });
            }
        }

        let timeouts = [
            ("timeouts.embed_ms", self.timeouts.embed_ms),
            ("timeouts.search_ms", self.timeouts.search_ms),
            ("timeouts.completion_ms", self.timeouts.completion_ms),
            ("timeouts.request_secs", self.timeouts.request_secs),
        ];
        for (field, value) in timeouts {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be > 0".to_string(),
                });
            }
        }

        if !(0.0..=2.0).contains(&self.openai.temperature) {
            return Err(ConfigError::Invalid {
                field: "openai.temperature",
                reason: format!("must be 0.0-2.0, got {}", self.openai.temperature),
            });
        }
        if self.openai.max_retries == 0 {
            return Err(ConfigError::Invalid {
                field: "openai.max_retries",
                reason: "must be >= 1".to_string(),
            });
        }

        Ok(())
    }

    /// Get the socket address for the HTTP server
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
