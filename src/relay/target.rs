//! Target resolution
//!
//! Maps an inbound path onto the upstream sub-service path and rewrites the
//! outbound URL. Only the scheme, host and port of a sub-service base URL are
//! used; the path always comes from the inbound request.

use std::fmt;
use url::Url;

use super::RelayError;

/// Resource Manager listing that backs `/projects`
pub const RESOURCE_MANAGER_PATH: &str = "/v1/projects";

/// Upstream backends a datasource can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubService {
    CloudMonitor,
    ResourceManager,
}

impl fmt::Display for SubService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubService::CloudMonitor => f.write_str("cloudMonitor"),
            SubService::ResourceManager => f.write_str("resourceManager"),
        }
    }
}

/// Compute the upstream path for an inbound path.
///
/// `/projects` maps to [`RESOURCE_MANAGER_PATH`]; every other path drops its
/// first segment, e.g. `/services/v3/projects/p/services` becomes
/// `/v3/projects/p/services`.
pub fn forwarded_path(path: &str) -> Result<String, RelayError> {
    if path == "/projects" {
        return Ok(RESOURCE_MANAGER_PATH.to_string());
    }

    let mut parts = path.splitn(3, '/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(_), Some(rest)) => Ok(format!("/{rest}")),
        _ => Err(RelayError::MissingServiceSegment(path.to_string())),
    }
}

/// Point `path` and `query` at the given sub-service base URL.
pub fn rewrite(base: &Url, path: &str, query: Option<&str>) -> Url {
    let mut url = base.clone();
    url.set_path(path);
    url.set_query(query);
    url.set_fragment(None);
    url
}
