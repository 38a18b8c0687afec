//! Response builder
//!
//! Serializes the accumulated items into one JSON array, re-encodes it like
//! the final upstream page and carries that page's headers over.

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::response::Response;

use super::codec;
use super::normalize::NormalizedItem;
use super::paginate::RelayOutcome;
use super::RelayError;

/// Headers that are never copied from the upstream page.
/// Hop-by-hop headers belong to the upstream connection, and the body is
/// re-serialized so its length no longer matches.
const SKIPPED_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
];

/// Serialize items as one JSON array and encode it.
pub fn build(items: &[NormalizedItem], encoding: &str) -> Result<Vec<u8>, RelayError> {
    let body = serde_json::to_vec(items).map_err(RelayError::InternalProcessing)?;
    Ok(codec::encode(encoding, &body)?)
}

/// Copy upstream headers: the first value of each header replaces whatever
/// is set, the remaining values are appended in order.
pub fn merge_headers(target: &mut HeaderMap, upstream: &HeaderMap) {
    for name in upstream.keys() {
        if SKIPPED_HEADERS.contains(&name.as_str()) {
            continue;
        }
        let mut values = upstream.get_all(name).iter();
        if let Some(first) = values.next() {
            target.insert(name.clone(), first.clone());
        }
        for value in values {
            target.append(name.clone(), value.clone());
        }
    }
}

/// Assemble the final response from the drained outcome and encoded body.
pub fn assemble(outcome: &RelayOutcome, body: Vec<u8>) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = outcome.status;

    let headers = response.headers_mut();
    merge_headers(headers, &outcome.headers);
    set_if_absent(
        headers,
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    if !outcome.content_encoding.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&outcome.content_encoding) {
            headers.insert(header::CONTENT_ENCODING, value);
        }
    }

    response
}

fn set_if_absent(headers: &mut HeaderMap, name: HeaderName, value: HeaderValue) {
    if !headers.contains_key(&name) {
        headers.insert(name, value);
    }
}
