//! gcm-relay
//!
//! Relays resource listings (metric descriptors, services, SLOs, projects)
//! from Google Cloud Monitoring and Resource Manager, draining every page of
//! the upstream response into a single JSON array.
//!
//! # Module Structure
//!
//! - [`config`] - YAML configuration (listener, timeouts, datasources)
//! - [`gcp`] - Upstream clients, credentials and datasource lookup
//! - [`relay`] - Codec, normalizers, pagination driver and response builder
//! - [`server`] - Axum routes binding inbound paths to the relay

pub mod config;
pub mod gcp;
pub mod relay;
pub mod server;

pub use config::RelayConfig;
pub use relay::{RelayError, ResourceKind};
pub use server::{router, AppState};
