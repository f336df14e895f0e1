//! Incoming support query.

use secrecy::SecretString;

/// A support question plus the caller's urgency and patience signals.
///
/// Immutable once constructed. The credential is kept as a secret so it never
/// shows up in `Debug` output or logs.
#[derive(Debug, Clone)]
pub struct Query {
    text: String,
    user_can_wait: bool,
    production_incident: bool,
    credential: Option<SecretString>,
}

impl Query {
    /// Create a query without a per-request credential.
    pub fn new(text: impl Into<String>, user_can_wait: bool, production_incident: bool) -> Self {
        Self {
            text: text.into(),
            user_can_wait,
            production_incident,
            credential: None,
        }
    }

    /// Attach a per-request provider credential. Blank keys are ignored.
    pub fn with_credential(mut self, credential: Option<String>) -> Self {
        self.credential = credential
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn user_can_wait(&self) -> bool {
        self.user_can_wait
    }

    pub fn production_incident(&self) -> bool {
        self.production_incident
    }

    pub fn credential(&self) -> Option<&SecretString> {
        self.credential.as_ref()
    }
}
