//! GCP Projects
//!
//! Resolution of the default project for the ambient credentials.

use super::auth::{self, GcpCredentials};
use crate::relay::RelayError;

/// Default project of the ambient credentials
///
/// Asks the credentials first (metadata server or key file), then falls back
/// to the environment and gcloud configuration.
pub async fn default_project(credentials: Option<&GcpCredentials>) -> Result<String, RelayError> {
    if let Some(credentials) = credentials {
        match credentials.project_id().await {
            Ok(project) => return Ok(project),
            Err(err) => {
                tracing::debug!(error = %err, "Credentials do not carry a project ID");
            }
        }
    }

    auth::get_default_project().ok_or_else(|| {
        RelayError::DefaultProject("no project configured for the ambient credentials".to_string())
    })
}
