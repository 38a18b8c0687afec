//! GCP Authentication
//!
//! Handles authentication using Application Default Credentials (ADC) or a
//! service account key file, and resolves the ambient default project.

use gcp_auth::{CustomServiceAccount, Token, TokenProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Scopes requested for Cloud Monitoring and Resource Manager access
pub const DEFAULT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/monitoring.read",
    "https://www.googleapis.com/auth/cloudplatformprojects.readonly",
];

/// GCP credentials holder with token caching
#[derive(Clone)]
pub struct GcpCredentials {
    provider: Arc<dyn TokenProvider>,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

/// Token as issued by the provider, valid until its own expiry
#[derive(Clone)]
struct CachedToken {
    token: Arc<Token>,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        // has_expired already keeps a safety margin before the real expiry
        !self.token.has_expired()
    }
}

impl GcpCredentials {
    /// Wrap an existing token provider
    pub fn from_provider(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Credentials from Application Default Credentials
    pub async fn application_default() -> Result<Self, gcp_auth::Error> {
        let provider = gcp_auth::provider().await?;
        Ok(Self::from_provider(provider))
    }

    /// Credentials from a service account key file
    pub fn service_account(key_file: &Path) -> Result<Self, gcp_auth::Error> {
        let account = CustomServiceAccount::from_file(key_file)?;
        Ok(Self::from_provider(Arc::new(account)))
    }

    /// Get an access token for API calls
    /// Security: Checks token expiry before returning cached token
    pub async fn get_token(&self) -> Result<String, gcp_auth::Error> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.as_str().to_string());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let token = self.provider.token(DEFAULT_SCOPES).await?;
        let token_str = token.as_str().to_string();

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: Arc::clone(&token),
            });
        }

        tracing::debug!("New token cached until {}", token.expires_at());

        Ok(token_str)
    }

    /// Project the credentials belong to (metadata server, key file, or gcloud)
    pub async fn project_id(&self) -> Result<String, gcp_auth::Error> {
        let project = self.provider.project_id().await?;
        Ok(project.to_string())
    }
}

/// Get the gcloud configuration directory
fn get_gcloud_config_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CLOUDSDK_CONFIG") {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir().map(|p| p.join("gcloud"))
}

/// Validate a GCP project ID format
/// Project IDs must be 6-30 characters, lowercase letters, digits, and hyphens
/// Must start with a letter and cannot end with a hyphen
pub fn validate_project_id(project: &str) -> bool {
    if project.len() < 6 || project.len() > 30 {
        return false;
    }

    match project.chars().next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }

    if project.ends_with('-') {
        return false;
    }

    project
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Find `project = <id>` inside the `[core]` section of a gcloud properties file
fn project_from_properties(content: &str) -> Option<String> {
    let mut in_core_section = false;
    for line in content.lines() {
        let line = line.trim();
        // Security: Skip comments and empty lines
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line == "[core]" {
            in_core_section = true;
        } else if line.starts_with('[') {
            in_core_section = false;
        } else if in_core_section && line.starts_with("project") {
            if let Some((_, value)) = line.split_once('=') {
                let project = value.trim();
                if validate_project_id(project) {
                    return Some(project.to_string());
                }
            }
        }
    }
    None
}

/// Read the default project from the environment or gcloud configuration
/// Security: Validates project ID format before returning
pub fn get_default_project() -> Option<String> {
    for var in ["CLOUDSDK_CORE_PROJECT", "GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"] {
        if let Ok(project) = std::env::var(var) {
            if validate_project_id(&project) {
                return Some(project);
            }
            tracing::warn!("Invalid project ID format in {}", var);
        }
    }

    let config_dir = get_gcloud_config_dir()?;
    let active_config = std::fs::read_to_string(config_dir.join("active_config")).ok()?;
    let config_name = active_config.trim();

    // Security: Validate config name to prevent path traversal
    if !config_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        tracing::warn!("Invalid characters in active_config name");
        return None;
    }

    let config_path = config_dir
        .join("configurations")
        .join(format!("config_{}", config_name));

    std::fs::read_to_string(config_path)
        .ok()
        .and_then(|content| project_from_properties(&content))
}
