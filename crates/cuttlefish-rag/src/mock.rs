//! Mock completer for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use cuttlefish_types::ProviderError;

use crate::synthesis::{Completer, Completion};

/// Completer returning canned output.
///
/// By default the answer states how many context tickets the prompt carried,
/// which keeps assertions deterministic without a model.
#[derive(Default)]
pub struct MockCompleter {
    answer: Option<String>,
    empty: bool,
    failure: Option<ProviderError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockCompleter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `answer`.
    pub fn with_answer(answer: impl Into<String>) -> Self {
        Self {
            answer: Some(answer.into()),
            ..Self::default()
        }
    }

    /// Answer with no content.
    pub fn empty() -> Self {
        Self {
            empty: true,
            ..Self::default()
        }
    }

    /// Fail every call with `error`.
    pub fn failing(mut self, error: ProviderError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of completion calls made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompt of the most recent call.
    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }
}

#[async_trait]
impl Completer for MockCompleter {
    async fn complete(
        &self,
        prompt: &str,
        _credential: Option<&SecretString>,
    ) -> Result<Completion, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if self.empty {
            return Ok(Completion::Empty);
        }

        let text = match &self.answer {
            Some(answer) => answer.clone(),
            None => format!(
                "Mock answer grounded on {} tickets.",
                prompt.matches("Title: ").count()
            ),
        };
        Ok(Completion::Text(text))
    }
}
