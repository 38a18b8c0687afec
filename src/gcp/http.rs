//! HTTP client for upstream GCP REST calls

use anyhow::{Context, Result};
use reqwest::header::{HeaderValue, ACCEPT_ENCODING};
use reqwest::{Client, Response};
use std::time::Duration;
use url::Url;

use super::auth::GcpCredentials;
use crate::relay::RelayError;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for upstream calls
///
/// Bodies are never decompressed here: the relay decodes them itself so the
/// aggregated response can mirror the upstream encoding.
#[derive(Clone)]
pub struct GcpHttpClient {
    client: Client,
    credentials: Option<GcpCredentials>,
}

impl GcpHttpClient {
    /// Create a new HTTP client
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        credentials: Option<GcpCredentials>,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            credentials,
        })
    }

    /// Credentials attached to outgoing calls, if any
    pub fn credentials(&self) -> Option<&GcpCredentials> {
        self.credentials.as_ref()
    }

    /// Issue an authenticated GET and return the raw response.
    ///
    /// Non-success statuses are returned as-is; only transport failures and
    /// token acquisition errors fail the call.
    pub async fn get(
        &self,
        url: &Url,
        accept_encoding: Option<&HeaderValue>,
    ) -> Result<Response, RelayError> {
        tracing::debug!("GET {}", url);

        let mut request = self.client.get(url.clone());

        if let Some(credentials) = &self.credentials {
            let token = credentials
                .get_token()
                .await
                .map_err(RelayError::Credentials)?;
            request = request.bearer_auth(token);
        }

        if let Some(value) = accept_encoding {
            request = request.header(ACCEPT_ENCODING, value.clone());
        }

        request.send().await.map_err(RelayError::Transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(sanitized.ends_with("[truncated, 500 bytes total]"));
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_for_log("a\nb\tc d"), "abc d");
    }

    #[test]
    fn test_sanitize_respects_char_boundaries() {
        let body = "é".repeat(150);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.contains("[truncated, 300 bytes total]"));
    }
}
