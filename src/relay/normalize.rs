//! Item normalizers
//!
//! One pure function per resource type. Each parses a decoded upstream
//! page, appends its items to the accumulator in page order and hands back
//! the page's `nextPageToken`.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use super::target::SubService;

/// Errors raised while normalizing one page.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The page body is not the expected JSON envelope.
    #[error("malformed upstream response: {0}")]
    MalformedUpstreamResponse(#[source] serde_json::Error),

    /// A resource name has no trailing segment.
    #[error("unexpected resource name: {0:?}")]
    InvalidResourceName(String),

    /// A normalized item could not be serialized.
    #[error("unable to serialize item: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// One pre-serialized output row
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct NormalizedItem(Box<RawValue>);

impl NormalizedItem {
    fn new<T: Serialize>(value: &T) -> Result<Self, NormalizeError> {
        serde_json::value::to_raw_value(value)
            .map(Self)
            .map_err(NormalizeError::Serialize)
    }

    /// Serialized JSON text of this item
    pub fn as_json(&self) -> &str {
        self.0.get()
    }
}

/// Result of normalizing one page
#[derive(Debug)]
pub struct PageResult {
    /// The accumulator, extended with this page's items
    pub items: Vec<NormalizedItem>,
    /// `nextPageToken` of the page; empty when there are no further pages
    pub continuation_token: String,
}

/// Resource types served by the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    MetricDescriptors,
    Services,
    Slos,
    Projects,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::MetricDescriptors,
        ResourceKind::Services,
        ResourceKind::Slos,
        ResourceKind::Projects,
    ];

    /// First path segment of the inbound route
    pub fn route_prefix(self) -> &'static str {
        match self {
            ResourceKind::MetricDescriptors => "metricDescriptors",
            ResourceKind::Services => "services",
            ResourceKind::Slos => "slo-services",
            ResourceKind::Projects => "projects",
        }
    }

    /// Upstream backend that serves this resource type
    pub fn sub_service(self) -> SubService {
        match self {
            ResourceKind::Projects => SubService::ResourceManager,
            _ => SubService::CloudMonitor,
        }
    }

    /// Normalize one decoded page onto the accumulator.
    pub fn normalize(
        self,
        body: &[u8],
        items: Vec<NormalizedItem>,
    ) -> Result<PageResult, NormalizeError> {
        match self {
            ResourceKind::MetricDescriptors => normalize_metric_descriptors(body, items),
            ResourceKind::Services => normalize_services(body, items),
            ResourceKind::Slos => normalize_slos(body, items),
            ResourceKind::Projects => normalize_projects(body, items),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route_prefix())
    }
}

// =============================================================================
// Upstream envelopes
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricDescriptorPage {
    #[serde(default)]
    metric_descriptors: Vec<MetricDescriptor>,
    #[serde(default)]
    next_page_token: String,
}

/// Metric descriptor as returned upstream, plus the two derived service
/// fields. Fields the relay does not touch are carried through untouched.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricDescriptor {
    #[serde(rename = "type", default)]
    metric_type: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    service: String,
    #[serde(default)]
    service_short_name: String,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServicePage {
    #[serde(default)]
    services: Vec<NamedResource>,
    #[serde(default)]
    next_page_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SloPage {
    #[serde(default)]
    service_level_objectives: Vec<Slo>,
    #[serde(default)]
    next_page_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectPage {
    #[serde(default)]
    projects: Vec<Project>,
    #[serde(default)]
    next_page_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamedResource {
    #[serde(default)]
    name: String,
    #[serde(default)]
    display_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Slo {
    #[serde(default)]
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    goal: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Project {
    #[serde(default)]
    project_id: String,
    #[serde(default)]
    name: String,
}

/// `{value, label[, goal]}` row consumed by selection widgets
#[derive(Serialize)]
struct SelectableValue<'a> {
    value: &'a str,
    label: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    goal: Option<f64>,
}

fn parse<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, NormalizeError> {
    serde_json::from_slice(body).map_err(NormalizeError::MalformedUpstreamResponse)
}

/// Extract the segment after the last '/' of a resource name
/// e.g., "projects/p/services/custom.svc-1" -> "custom.svc-1"
pub fn trailing_segment(name: &str) -> Result<&str, NormalizeError> {
    let segment = name.rsplit('/').next().unwrap_or(name);
    if segment.is_empty() {
        return Err(NormalizeError::InvalidResourceName(name.to_string()));
    }
    Ok(segment)
}

fn normalize_metric_descriptors(
    body: &[u8],
    mut items: Vec<NormalizedItem>,
) -> Result<PageResult, NormalizeError> {
    let page: MetricDescriptorPage = parse(body)?;

    for mut descriptor in page.metric_descriptors {
        descriptor.service = descriptor
            .metric_type
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string();
        descriptor.service_short_name = descriptor
            .service
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string();
        if descriptor.display_name.is_empty() {
            descriptor.display_name = descriptor.metric_type.clone();
        }
        items.push(NormalizedItem::new(&descriptor)?);
    }

    Ok(PageResult {
        items,
        continuation_token: page.next_page_token,
    })
}

fn normalize_services(
    body: &[u8],
    mut items: Vec<NormalizedItem>,
) -> Result<PageResult, NormalizeError> {
    let page: ServicePage = parse(body)?;

    for service in &page.services {
        let name = trailing_segment(&service.name)?;
        let label = if service.display_name.is_empty() {
            name
        } else {
            &service.display_name
        };
        items.push(NormalizedItem::new(&SelectableValue {
            value: name,
            label,
            goal: None,
        })?);
    }

    Ok(PageResult {
        items,
        continuation_token: page.next_page_token,
    })
}

fn normalize_slos(
    body: &[u8],
    mut items: Vec<NormalizedItem>,
) -> Result<PageResult, NormalizeError> {
    let page: SloPage = parse(body)?;

    for slo in &page.service_level_objectives {
        let name = trailing_segment(&slo.name)?;
        // Label stays as sent, even when empty
        items.push(NormalizedItem::new(&SelectableValue {
            value: name,
            label: &slo.display_name,
            goal: Some(slo.goal),
        })?);
    }

    Ok(PageResult {
        items,
        continuation_token: page.next_page_token,
    })
}

fn normalize_projects(
    body: &[u8],
    mut items: Vec<NormalizedItem>,
) -> Result<PageResult, NormalizeError> {
    let page: ProjectPage = parse(body)?;

    for project in &page.projects {
        items.push(NormalizedItem::new(&SelectableValue {
            value: &project.project_id,
            label: &project.name,
            goal: None,
        })?);
    }

    Ok(PageResult {
        items,
        continuation_token: page.next_page_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(items: &[NormalizedItem]) -> Vec<Value> {
        items
            .iter()
            .map(|item| serde_json::from_str(item.as_json()).unwrap())
            .collect()
    }

    #[test]
    fn test_metric_descriptor_derives_service_fields() {
        let body = json!({
            "metricDescriptors": [{
                "type": "compute.googleapis.com/instance/cpu/usage",
                "displayName": "",
                "metricKind": "GAUGE",
                "valueType": "DOUBLE",
                "labels": [{"key": "instance_name"}]
            }],
            "nextPageToken": "abc"
        });

        let page = ResourceKind::MetricDescriptors
            .normalize(body.to_string().as_bytes(), Vec::new())
            .unwrap();

        assert_eq!(page.continuation_token, "abc");
        let out = values(&page.items);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["service"], "compute.googleapis.com");
        assert_eq!(out[0]["serviceShortName"], "compute");
        assert_eq!(
            out[0]["displayName"],
            "compute.googleapis.com/instance/cpu/usage"
        );
        assert_eq!(out[0]["metricKind"], "GAUGE");
        assert_eq!(out[0]["labels"][0]["key"], "instance_name");
    }

    #[test]
    fn test_metric_descriptor_keeps_display_name() {
        let body = json!({
            "metricDescriptors": [{"type": "custom/metric", "displayName": "My metric"}]
        });

        let page = ResourceKind::MetricDescriptors
            .normalize(body.to_string().as_bytes(), Vec::new())
            .unwrap();

        let out = values(&page.items);
        assert_eq!(out[0]["displayName"], "My metric");
        assert_eq!(out[0]["service"], "custom");
        assert_eq!(out[0]["serviceShortName"], "custom");
        assert!(page.continuation_token.is_empty());
    }

    #[test]
    fn test_service_label_defaults_to_name() {
        let body = json!({
            "services": [
                {"name": "projects/p/services/custom.svc-1", "displayName": ""},
                {"name": "projects/p/services/frontend", "displayName": "Frontend"}
            ]
        });

        let page = ResourceKind::Services
            .normalize(body.to_string().as_bytes(), Vec::new())
            .unwrap();

        assert_eq!(
            values(&page.items),
            vec![
                json!({"value": "custom.svc-1", "label": "custom.svc-1"}),
                json!({"value": "frontend", "label": "Frontend"}),
            ]
        );
    }

    #[test]
    fn test_service_with_trailing_slash_is_rejected() {
        let body = json!({"services": [{"name": "projects/p/services/"}]});

        let err = ResourceKind::Services
            .normalize(body.to_string().as_bytes(), Vec::new())
            .unwrap_err();

        assert!(matches!(
            err,
            NormalizeError::InvalidResourceName(name) if name == "projects/p/services/"
        ));
    }

    #[test]
    fn test_slo_label_is_not_defaulted() {
        let body = json!({
            "serviceLevelObjectives": [
                {
                    "name": "projects/p/services/s/serviceLevelObjectives/availability",
                    "goal": 0.99
                }
            ],
            "nextPageToken": ""
        });

        let page = ResourceKind::Slos
            .normalize(body.to_string().as_bytes(), Vec::new())
            .unwrap();

        assert_eq!(
            values(&page.items),
            vec![json!({"value": "availability", "label": "", "goal": 0.99})]
        );
    }

    #[test]
    fn test_slo_goal_defaults_to_zero() {
        let body = json!({
            "serviceLevelObjectives": [{
                "name": "projects/p/services/s/serviceLevelObjectives/latency",
                "displayName": "Latency"
            }]
        });

        let page = ResourceKind::Slos
            .normalize(body.to_string().as_bytes(), Vec::new())
            .unwrap();

        assert_eq!(
            values(&page.items),
            vec![json!({"value": "latency", "label": "Latency", "goal": 0.0})]
        );
        assert!(page.items[0].as_json().contains(r#""goal":0.0"#));
    }

    #[test]
    fn test_projects_map_id_and_name() {
        let body = json!({
            "projects": [{
                "projectId": "my-project",
                "name": "My Project",
                "lifecycleState": "ACTIVE"
            }],
            "nextPageToken": "next"
        });

        let page = ResourceKind::Projects
            .normalize(body.to_string().as_bytes(), Vec::new())
            .unwrap();

        assert_eq!(page.continuation_token, "next");
        assert_eq!(
            values(&page.items),
            vec![json!({"value": "my-project", "label": "My Project"})]
        );
    }

    #[test]
    fn test_items_are_appended_after_accumulator() {
        let first = json!({"projects": [{"projectId": "a", "name": "A"}]});
        let second = json!({"projects": [{"projectId": "b", "name": "B"}]});

        let page = ResourceKind::Projects
            .normalize(first.to_string().as_bytes(), Vec::new())
            .unwrap();
        let page = ResourceKind::Projects
            .normalize(second.to_string().as_bytes(), page.items)
            .unwrap();

        let out = values(&page.items);
        assert_eq!(out[0]["value"], "a");
        assert_eq!(out[1]["value"], "b");
    }

    #[test]
    fn test_malformed_page_is_rejected() {
        for kind in ResourceKind::ALL {
            let err = kind.normalize(b"<html>oops</html>", Vec::new()).unwrap_err();
            assert!(matches!(err, NormalizeError::MalformedUpstreamResponse(_)));
        }
    }

    #[test]
    fn test_empty_envelope_yields_nothing() {
        for kind in ResourceKind::ALL {
            let page = kind.normalize(b"{}", Vec::new()).unwrap();
            assert!(page.items.is_empty());
            assert!(page.continuation_token.is_empty());
        }
    }

    #[test]
    fn test_trailing_segment() {
        assert_eq!(trailing_segment("a/b/c").unwrap(), "c");
        assert_eq!(trailing_segment("plain").unwrap(), "plain");
        assert!(trailing_segment("").is_err());
        assert!(trailing_segment("a/b/").is_err());
    }

    #[test]
    fn test_sub_service_routing() {
        assert_eq!(ResourceKind::Projects.sub_service(), SubService::ResourceManager);
        assert_eq!(ResourceKind::Slos.sub_service(), SubService::CloudMonitor);
        assert_eq!(ResourceKind::Slos.to_string(), "slo-services");
    }
}
