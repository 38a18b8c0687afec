//! GCP API interaction module
//!
//! # Module Structure
//!
//! - [`auth`] - Application Default Credentials, key files, default project lookup
//! - [`http`] - HTTP client for upstream REST calls
//! - [`datasource`] - Per-tenant clients and sub-service base URLs
//! - [`projects`] - Default project resolution

pub mod auth;
pub mod datasource;
pub mod http;
pub mod projects;

pub use datasource::{Datasource, DatasourceRegistry};
pub use http::GcpHttpClient;
