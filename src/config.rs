//! Configuration Management
//!
//! Relay settings and per-datasource upstream configuration, loaded from a
//! YAML file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Cloud Monitoring API endpoint
pub const CLOUD_MONITORING_URL: &str = "https://monitoring.googleapis.com";

/// Resource Manager API endpoint
pub const RESOURCE_MANAGER_URL: &str = "https://cloudresourcemanager.googleapis.com";

/// Relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Address the HTTP listener binds to
    pub bind_address: String,
    /// User agent sent upstream
    pub user_agent: String,
    /// Per-call upstream timeout
    pub request_timeout_secs: u64,
    /// Maximum number of pages drained per request (unbounded when unset)
    pub max_pages: Option<usize>,
    /// Datasource used when a request does not name one
    pub default_datasource: String,
    /// Datasources by uid
    pub datasources: BTreeMap<String, DatasourceConfig>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3100".to_string(),
            user_agent: concat!("gcm-relay/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: 30,
            max_pages: None,
            default_datasource: "default".to_string(),
            datasources: BTreeMap::from([("default".to_string(), DatasourceConfig::default())]),
        }
    }
}

/// One tenant: credentials plus upstream base URLs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasourceConfig {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub services: ServiceUrls,
}

/// How upstream calls are authenticated
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// Application Default Credentials
    #[default]
    Adc,
    /// Service account JSON key
    ServiceAccount { key_file: PathBuf },
    /// No Authorization header (emulators, local testing)
    None,
}

/// Base URLs of the upstream sub-services
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceUrls {
    pub cloud_monitor: String,
    pub resource_manager: String,
}

impl Default for ServiceUrls {
    fn default() -> Self {
        Self {
            cloud_monitor: CLOUD_MONITORING_URL.to_string(),
            resource_manager: RESOURCE_MANAGER_URL.to_string(),
        }
    }
}

impl RelayConfig {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gcm-relay").join("config.yaml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default location is
    /// tried and built-in defaults are used when it is absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    tracing::info!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.datasources.contains_key(&self.default_datasource) {
            anyhow::bail!(
                "default datasource {:?} is not configured",
                self.default_datasource
            );
        }
        if self.max_pages == Some(0) {
            anyhow::bail!("max_pages must be at least 1");
        }
        Ok(())
    }
}
