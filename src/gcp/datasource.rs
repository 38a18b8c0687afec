//! Datasources
//!
//! A datasource is one tenant's view of the upstream: an authenticated
//! client plus a base URL per sub-service. The registry is built once at
//! startup and only read afterwards.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::auth::GcpCredentials;
use super::http::GcpHttpClient;
use crate::config::{AuthConfig, DatasourceConfig, RelayConfig};
use crate::relay::{RelayError, SubService};

/// One configured datasource
pub struct Datasource {
    uid: String,
    client: GcpHttpClient,
    cloud_monitor: Url,
    resource_manager: Url,
}

impl Datasource {
    pub fn new(
        uid: impl Into<String>,
        client: GcpHttpClient,
        cloud_monitor: Url,
        resource_manager: Url,
    ) -> Self {
        Self {
            uid: uid.into(),
            client,
            cloud_monitor,
            resource_manager,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Authenticated client shared by every sub-service
    pub fn client(&self) -> &GcpHttpClient {
        &self.client
    }

    /// Base URL of a sub-service
    pub fn base_url(&self, service: SubService) -> &Url {
        match service {
            SubService::CloudMonitor => &self.cloud_monitor,
            SubService::ResourceManager => &self.resource_manager,
        }
    }
}

/// Read-only lookup of datasources by uid
pub struct DatasourceRegistry {
    default_uid: String,
    datasources: HashMap<String, Arc<Datasource>>,
}

impl DatasourceRegistry {
    /// Build a registry from already constructed datasources
    pub fn new(
        default_uid: impl Into<String>,
        datasources: impl IntoIterator<Item = Datasource>,
    ) -> Self {
        Self {
            default_uid: default_uid.into(),
            datasources: datasources
                .into_iter()
                .map(|ds| (ds.uid.clone(), Arc::new(ds)))
                .collect(),
        }
    }

    /// Build every configured datasource, acquiring credentials as needed
    pub async fn from_config(config: &RelayConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let mut datasources = Vec::with_capacity(config.datasources.len());

        for (uid, ds_config) in &config.datasources {
            let datasource = build_datasource(uid, ds_config, &config.user_agent, timeout)
                .await
                .with_context(|| format!("Failed to initialize datasource {uid:?}"))?;
            tracing::info!(
                datasource = %uid,
                cloud_monitor = %datasource.cloud_monitor,
                resource_manager = %datasource.resource_manager,
                "Datasource ready"
            );
            datasources.push(datasource);
        }

        Ok(Self::new(config.default_datasource.clone(), datasources))
    }

    /// Resolve a datasource by uid, or the default one when none is given
    pub fn resolve(&self, uid: Option<&str>) -> Result<Arc<Datasource>, RelayError> {
        let uid = uid.unwrap_or(&self.default_uid);
        self.datasources
            .get(uid)
            .cloned()
            .ok_or_else(|| RelayError::UnknownDatasource(uid.to_string()))
    }

    /// The datasource used when requests do not name one
    pub fn default_datasource(&self) -> Option<Arc<Datasource>> {
        self.datasources.get(&self.default_uid).cloned()
    }
}

async fn build_datasource(
    uid: &str,
    config: &DatasourceConfig,
    user_agent: &str,
    timeout: Duration,
) -> Result<Datasource> {
    let credentials = match &config.auth {
        AuthConfig::Adc => Some(GcpCredentials::application_default().await.context(
            "Failed to initialize GCP authentication. Run 'gcloud auth application-default login'",
        )?),
        AuthConfig::ServiceAccount { key_file } => Some(
            GcpCredentials::service_account(key_file)
                .with_context(|| format!("Failed to load key file {}", key_file.display()))?,
        ),
        AuthConfig::None => None,
    };

    let client = GcpHttpClient::new(user_agent, timeout, credentials)?;

    Ok(Datasource::new(
        uid,
        client,
        parse_base_url(&config.services.cloud_monitor)?,
        parse_base_url(&config.services.resource_manager)?,
    ))
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("Invalid service URL {raw:?}"))?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        anyhow::bail!("Service URL {raw:?} must be an absolute http(s) URL");
    }
    Ok(url)
}
