//! Relay error types and their mapping to HTTP responses.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use super::codec::CodecError;
use super::normalize::NormalizeError;

/// Errors surfaced to the inbound caller.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Unsupported or corrupt content encoding.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The upstream call failed (connect, timeout, body read).
    #[error("upstream request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// An access token could not be obtained for the upstream call.
    #[error("unable to obtain access token: {0}")]
    Credentials(#[source] gcp_auth::Error),

    /// A page could not be normalized.
    #[error("data processing error: {0}")]
    Normalize(#[from] NormalizeError),

    /// The inbound path has no service segment to forward.
    #[error("the request should contain the service on its path: {0}")]
    MissingServiceSegment(String),

    /// The aggregated items could not be serialized.
    #[error("response marshaling error: {0}")]
    InternalProcessing(#[source] serde_json::Error),

    /// The upstream kept returning continuation tokens past the page cap.
    #[error("upstream still returned a page token after {0} pages")]
    PageLimitExceeded(usize),

    /// No datasource is configured under the requested uid.
    #[error("datasource not found: {0}")]
    UnknownDatasource(String),

    /// No default project could be determined.
    #[error("default project not found: {0}")]
    DefaultProject(String),
}

impl RelayError {
    /// HTTP status class reported to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Codec(err) => err.status(),
            RelayError::Normalize(_) | RelayError::InternalProcessing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            RelayError::Transport(_)
            | RelayError::Credentials(_)
            | RelayError::MissingServiceSegment(_)
            | RelayError::PageLimitExceeded(_)
            | RelayError::UnknownDatasource(_)
            | RelayError::DefaultProject(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Plain-text error response
#[derive(Debug)]
pub struct ErrorResponse {
    status: StatusCode,
    message: String,
}

impl ErrorResponse {
    /// Failure while resolving, fetching or normalizing pages
    pub fn unexpected(err: &RelayError) -> Self {
        Self {
            status: err.status(),
            message: format!("unexpected error {err}"),
        }
    }

    /// Failure while building the aggregated response
    pub fn formatting(err: &RelayError) -> Self {
        Self {
            status: err.status(),
            message: format!("error formatting response {err}"),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.message,
        )
            .into_response()
    }
}
