//! Pagination driver
//!
//! Drains every page of an upstream listing: fetch, decode, normalize, and
//! re-issue the request with `pageToken` set until the upstream stops
//! returning a continuation token.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_ENCODING};
use reqwest::StatusCode;
use url::Url;

use super::codec;
use super::normalize::{NormalizedItem, ResourceKind};
use super::RelayError;
use crate::gcp::http::{sanitize_for_log, GcpHttpClient};

/// Query parameter carrying the continuation token
pub const PAGE_TOKEN_PARAM: &str = "pageToken";

/// Outbound request state, mutated in place once per page
#[derive(Debug, Clone)]
pub struct RelayRequest {
    url: Url,
    accept_encoding: Option<HeaderValue>,
}

impl RelayRequest {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            accept_encoding: None,
        }
    }

    /// Forward the caller's `Accept-Encoding` so the upstream picks the
    /// encoding that ends up on the aggregated response.
    pub fn with_accept_encoding(mut self, value: Option<HeaderValue>) -> Self {
        self.accept_encoding = value;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Replace any existing `pageToken` and keep the other parameters
    pub fn set_page_token(&mut self, token: &str) {
        let retained: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(key, _)| key != PAGE_TOKEN_PARAM)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        self.url
            .query_pairs_mut()
            .clear()
            .extend_pairs(retained)
            .append_pair(PAGE_TOKEN_PARAM, token);
    }
}

/// Everything left after the last page was drained
#[derive(Debug)]
pub struct RelayOutcome {
    /// Normalized items of every page, in page order
    pub items: Vec<NormalizedItem>,
    /// Headers of the final page
    pub headers: HeaderMap,
    /// `Content-Encoding` of the final page ("" for identity)
    pub content_encoding: String,
    /// Status of the final page
    pub status: StatusCode,
}

/// Drain all pages of a listing.
///
/// Pages are fetched strictly one after another since the next token is only
/// known once the current page is decoded. Any failure discards everything
/// accumulated so far. Response bodies are owned by the iteration that
/// fetched them and dropped before the next one starts.
pub async fn drain_pages(
    client: &GcpHttpClient,
    mut request: RelayRequest,
    kind: ResourceKind,
    max_pages: Option<usize>,
) -> Result<RelayOutcome, RelayError> {
    let mut items = Vec::new();
    let mut pages = 0usize;

    loop {
        let response = client
            .get(&request.url, request.accept_encoding.as_ref())
            .await?;
        pages += 1;

        let status = response.status();
        let headers = response.headers().clone();
        let content_encoding = headers
            .get(CONTENT_ENCODING)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .unwrap_or_default();

        let body = response.bytes().await.map_err(RelayError::Transport)?;
        let decoded = codec::decode(&content_encoding, &body)?;

        tracing::debug!(
            page = pages,
            status = %status,
            encoding = %content_encoding,
            bytes = body.len(),
            "Fetched page"
        );
        if !status.is_success() {
            tracing::warn!(
                "Upstream returned {} - {}",
                status,
                sanitize_for_log(&String::from_utf8_lossy(&decoded))
            );
        }

        let page = kind.normalize(&decoded, items)?;
        items = page.items;

        if page.continuation_token.is_empty() {
            tracing::debug!(pages, items = items.len(), "Pagination complete");
            return Ok(RelayOutcome {
                items,
                headers,
                content_encoding,
                status,
            });
        }

        if let Some(max) = max_pages {
            if pages >= max {
                return Err(RelayError::PageLimitExceeded(max));
            }
        }

        request.set_page_token(&page.continuation_token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str) -> RelayRequest {
        RelayRequest::new(Url::parse(url).unwrap())
    }

    #[test]
    fn test_set_page_token_appends() {
        let mut req = request("https://monitoring.googleapis.com/v3/projects/p/services");
        req.set_page_token("T");
        assert_eq!(req.url().query(), Some("pageToken=T"));
    }

    #[test]
    fn test_set_page_token_replaces_previous_token() {
        let mut req = request("https://example.test/v3/x?pageSize=10&pageToken=old");
        req.set_page_token("new");
        let pairs: Vec<(String, String)> = req
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("pageSize".to_string(), "10".to_string()),
                ("pageToken".to_string(), "new".to_string()),
            ]
        );
    }

    #[test]
    fn test_set_page_token_escapes_token() {
        let mut req = request("https://example.test/v3/x?filter=metric.type%3D%22a%22");
        req.set_page_token("a+b/c=");
        let token = req
            .url()
            .query_pairs()
            .find(|(k, _)| k == PAGE_TOKEN_PARAM)
            .map(|(_, v)| v.into_owned());
        assert_eq!(token.as_deref(), Some("a+b/c="));
        let filter = req
            .url()
            .query_pairs()
            .find(|(k, _)| k == "filter")
            .map(|(_, v)| v.into_owned());
        assert_eq!(filter.as_deref(), Some("metric.type=\"a\""));
    }
}
