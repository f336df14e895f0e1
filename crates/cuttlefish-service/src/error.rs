//! HTTP mapping of pipeline errors.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use cuttlefish_types::RagError;

/// Error body: `{"error": {"kind", "stage", "message"}}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub kind: &'static str,
    pub stage: &'static str,
    pub message: String,
}

/// A pipeline error on its way to the client.
#[derive(Debug)]
pub struct ApiError(pub RagError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            RagError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RagError::EmbeddingUnavailable(_)
            | RagError::IndexUnavailable(_)
            | RagError::SynthesisUnavailable(_) => StatusCode::BAD_GATEWAY,
            RagError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            // Client closed request; nobody reads this.
            RagError::Cancelled => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::REQUEST_TIMEOUT)
            }
        }
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(RagError::InvalidInput(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.0.kind(), stage = %self.0.stage(), error = %self.0, "Request failed");
        } else {
            warn!(kind = self.0.kind(), stage = %self.0.stage(), error = %self.0, "Request rejected");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                kind: self.0.kind(),
                stage: self.0.stage().as_str(),
                message: self.0.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuttlefish_types::{ProviderError, Stage};

    #[test]
    fn test_status_mapping() {
        let cases = [
            (RagError::InvalidInput("empty".into()), 400),
            (
                RagError::EmbeddingUnavailable(ProviderError::MissingCredential),
                502,
            ),
            (RagError::IndexUnavailable(ProviderError::RateLimited), 502),
            (
                RagError::SynthesisUnavailable(ProviderError::Transport("reset".into())),
                502,
            ),
            (
                RagError::Timeout {
                    stage: Stage::Index,
                    elapsed_ms: 10,
                },
                504,
            ),
            (RagError::Cancelled, 499),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError(err).status().as_u16(), expected);
        }
    }
}
