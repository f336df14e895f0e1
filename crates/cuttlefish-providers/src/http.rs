//! Shared HTTP plumbing: client construction, credential resolution and
//! status-to-error mapping.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use secrecy::SecretString;
use serde::de::DeserializeOwned;

use cuttlefish_types::ProviderError;

pub(crate) fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Transport(e.to_string()))
}

/// Per-request credential first, then the configured one.
pub(crate) fn resolve_credential<'a>(
    request: Option<&'a SecretString>,
    configured: Option<&'a SecretString>,
) -> Result<&'a SecretString, ProviderError> {
    request.or(configured).ok_or(ProviderError::MissingCredential)
}

pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout)
    } else {
        ProviderError::Transport(err.to_string())
    }
}

/// Map non-success responses onto provider errors; pass successes through.
pub(crate) async fn check_status(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::Unauthorized(summarize(status, &body))
        }
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited,
        _ => ProviderError::http(status.as_u16(), &body),
    })
}

/// Decode a JSON body, reporting shape mismatches as malformed responses.
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ProviderError::Transport(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| ProviderError::Malformed(e.to_string()))
}

fn summarize(status: StatusCode, body: &str) -> String {
    match ProviderError::http(status.as_u16(), body) {
        ProviderError::Http { status, body } if body.is_empty() => format!("HTTP {status}"),
        ProviderError::Http { status, body } => format!("HTTP {status}: {body}"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_credential_wins() {
        let request = SecretString::from("sk-request".to_string());
        let configured = SecretString::from("sk-config".to_string());

        let chosen = resolve_credential(Some(&request), Some(&configured)).unwrap();
        assert!(std::ptr::eq(chosen, &request));

        let chosen = resolve_credential(None, Some(&configured)).unwrap();
        assert!(std::ptr::eq(chosen, &configured));

        assert_eq!(
            resolve_credential(None, None).unwrap_err(),
            ProviderError::MissingCredential
        );
    }
}
