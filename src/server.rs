//! HTTP server
//!
//! # Routes
//! - `GET /metricDescriptors/*` - Cloud Monitoring metric descriptors
//! - `GET /services/*` - Cloud Monitoring services
//! - `GET /slo-services/*` - Cloud Monitoring service level objectives
//! - `GET /projects` - Resource Manager projects
//! - `GET /gceDefaultProject` - default project of the ambient credentials
//!
//! The datasource is picked with the `X-Datasource-Uid` header, falling back
//! to the configured default.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::gcp::{projects, DatasourceRegistry};
use crate::relay::{
    drain_pages, response, target, ErrorResponse, RelayError, RelayOutcome, RelayRequest,
    ResourceKind,
};

/// Header selecting the datasource for a request
pub const DATASOURCE_HEADER: &str = "x-datasource-uid";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub datasources: Arc<DatasourceRegistry>,
    pub max_pages: Option<usize>,
}

impl AppState {
    pub fn new(datasources: DatasourceRegistry, max_pages: Option<usize>) -> Self {
        Self {
            datasources: Arc::new(datasources),
            max_pages,
        }
    }
}

/// Build the router with every relay route.
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/gceDefaultProject", get(default_project_handler))
        .route(
            "/projects",
            get(|State(state): State<AppState>, uri: Uri, headers: HeaderMap| {
                relay_handler(state, ResourceKind::Projects, uri, headers)
            }),
        );

    for kind in ResourceKind::ALL {
        if kind == ResourceKind::Projects {
            continue;
        }
        let prefix = kind.route_prefix();
        let handler = move |State(state): State<AppState>, uri: Uri, headers: HeaderMap| {
            relay_handler(state, kind, uri, headers)
        };
        // The bare prefix is routed too so it fails with a proper message
        router = router
            .route(&format!("/{prefix}"), get(handler))
            .route(&format!("/{prefix}/"), get(handler))
            .route(&format!("/{prefix}/{{*rest}}"), get(handler));
    }

    router.with_state(state)
}

/// Relay one listing request.
async fn relay_handler(
    state: AppState,
    kind: ResourceKind,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("relay", %request_id, %kind);

    async move {
        tracing::debug!(uri = %uri, "Received resource call");

        let outcome = match fetch(&state, kind, &uri, &headers).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(error = %err, "Relay failed");
                return ErrorResponse::unexpected(&err).into_response();
            }
        };

        let body = match response::build(&outcome.items, &outcome.content_encoding) {
            Ok(body) => body,
            Err(err) => {
                tracing::error!(error = %err, "Failed to build response");
                return ErrorResponse::formatting(&err).into_response();
            }
        };

        tracing::info!(
            items = outcome.items.len(),
            status = %outcome.status,
            "Relayed listing"
        );
        response::assemble(&outcome, body)
    }
    .instrument(span)
    .await
}

/// Resolve the target and drain every upstream page.
async fn fetch(
    state: &AppState,
    kind: ResourceKind,
    uri: &Uri,
    headers: &HeaderMap,
) -> Result<RelayOutcome, RelayError> {
    let path = target::forwarded_path(uri.path())?;

    let uid = headers
        .get(DATASOURCE_HEADER)
        .and_then(|value| value.to_str().ok());
    let datasource = state.datasources.resolve(uid)?;

    let sub_service = kind.sub_service();
    let url = target::rewrite(datasource.base_url(sub_service), &path, uri.query());
    tracing::debug!(
        datasource = datasource.uid(),
        %sub_service,
        upstream = %url,
        "Resolved target"
    );

    let outbound = RelayRequest::new(url)
        .with_accept_encoding(headers.get(header::ACCEPT_ENCODING).cloned());

    drain_pages(datasource.client(), outbound, kind, state.max_pages).await
}

/// Return the default project of the ambient credentials as plain text.
async fn default_project_handler(State(state): State<AppState>) -> Response {
    let datasource = state.datasources.default_datasource();
    let credentials = datasource.as_ref().and_then(|ds| ds.client().credentials());

    match projects::default_project(credentials).await {
        Ok(project) => (StatusCode::OK, project).into_response(),
        Err(err) => ErrorResponse::unexpected(&err).into_response(),
    }
}
