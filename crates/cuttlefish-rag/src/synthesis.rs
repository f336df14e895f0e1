//! Answer synthesis.
//!
//! Builds the grounding prompt from the context block and the user query,
//! invokes the completion collaborator and normalizes its output. Empty or
//! unparseable completions are masked by [`FALLBACK_ANSWER`]; only fatal
//! provider failures escalate.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::{debug, warn};

use cuttlefish_types::{ProviderError, RagError, Stage};

use crate::context::ContextBlock;

/// Answer returned when the model produced nothing usable.
pub const FALLBACK_ANSWER: &str = "No answer generated.";

/// Result of a completion call that reached the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Generated text, untrimmed
    Text(String),
    /// Provider answered without content (no choices, null message)
    Empty,
}

/// Text generation collaborator.
#[async_trait]
pub trait Completer: Send + Sync {
    /// Complete `prompt`. `credential` overrides the configured key.
    async fn complete(
        &self,
        prompt: &str,
        credential: Option<&SecretString>,
    ) -> Result<Completion, ProviderError>;

    /// Whether calls can succeed without a per-request credential.
    fn has_default_credential(&self) -> bool {
        true
    }
}

/// Turns a context block and a question into an answer.
#[derive(Debug, Clone)]
pub struct AnswerSynthesizer {
    timeout: Duration,
}

impl Default for AnswerSynthesizer {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl AnswerSynthesizer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Build the grounding prompt.
    pub fn build_prompt(query: &str, context: &ContextBlock) -> String {
        format!(
            "You are a helpful assistant. Use the following context to answer the user's question.\n\
             Context:\n{}\n\nQuestion: {}\nAnswer:",
            context.text, query
        )
    }

    /// Generate an answer for `query` grounded on `context`.
    pub async fn synthesize(
        &self,
        query: &str,
        context: &ContextBlock,
        completer: &dyn Completer,
        credential: Option<&SecretString>,
    ) -> Result<String, RagError> {
        let prompt = Self::build_prompt(query, context);
        debug!(
            prompt_chars = prompt.len(),
            context_tickets = context.included.len(),
            "Requesting completion"
        );

        let outcome = match tokio::time::timeout(self.timeout, completer.complete(&prompt, credential))
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Completion timed out");
                return Err(RagError::Timeout {
                    stage: Stage::Synthesis,
                    elapsed_ms: self.timeout.as_millis() as u64,
                });
            }
        };

        match outcome {
            Ok(Completion::Text(text)) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            Ok(_) => {
                debug!("Empty completion, using fallback answer");
                Ok(FALLBACK_ANSWER.to_string())
            }
            Err(ProviderError::Malformed(reason)) => {
                warn!(reason = %reason, "Malformed completion, using fallback answer");
                Ok(FALLBACK_ANSWER.to_string())
            }
            Err(e) => {
                warn!(error = %e, "Completion failed");
                Err(RagError::synthesis(e))
            }
        }
    }
}
