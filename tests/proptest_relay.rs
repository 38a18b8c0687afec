//! Property-based tests using proptest
//!
//! These tests verify codec round trips, encoding validation and the
//! normalizers' naming rules using randomized inputs.

use gcm_relay::relay::codec::{self, ContentEncoding};
use gcm_relay::relay::normalize::trailing_segment;
use gcm_relay::relay::ResourceKind;
use proptest::prelude::*;
use serde_json::{json, Value};

/// Generate one of the supported encodings
fn arb_encoding() -> impl Strategy<Value = ContentEncoding> {
    prop::sample::select(ContentEncoding::ALL.to_vec())
}

/// Generate an encoding name outside the supported set
fn arb_unsupported_encoding() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9-]{1,12}".prop_filter("must not be a supported encoding", |name| {
        !matches!(name.as_str(), "gzip" | "deflate" | "br")
    })
}

/// Generate a resource path segment
fn arb_segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9.-]{0,20}"
}

fn parse_items(kind: ResourceKind, body: &Value) -> Vec<Value> {
    kind.normalize(body.to_string().as_bytes(), Vec::new())
        .expect("page should normalize")
        .items
        .iter()
        .map(|item| serde_json::from_str(item.as_json()).unwrap())
        .collect()
}

proptest! {
    /// Decoding what was encoded returns the original payload
    #[test]
    fn codec_round_trips(
        encoding in arb_encoding(),
        payload in prop::collection::vec(any::<u8>(), 0..4096)
    ) {
        let encoded = codec::encode(encoding.as_str(), &payload).unwrap();
        let decoded = codec::decode(encoding.as_str(), &encoded).unwrap();
        prop_assert_eq!(decoded, payload);
    }

    /// Unsupported encodings fail in both directions, every time
    #[test]
    fn unsupported_encodings_fail(
        encoding in arb_unsupported_encoding(),
        payload in prop::collection::vec(any::<u8>(), 0..64)
    ) {
        prop_assert!(codec::decode(&encoding, &payload).is_err());
        prop_assert!(codec::encode(&encoding, &payload).is_err());
    }

    /// The trailing segment is always the last path component
    #[test]
    fn trailing_segment_is_last_component(
        parents in prop::collection::vec(arb_segment(), 0..5),
        last in arb_segment()
    ) {
        let mut parts = parents.clone();
        parts.push(last.clone());
        let name = parts.join("/");
        prop_assert_eq!(trailing_segment(&name).unwrap(), last.as_str());
    }

    /// Names ending in '/' are always rejected
    #[test]
    fn trailing_slash_is_rejected(parents in prop::collection::vec(arb_segment(), 0..5)) {
        let name = format!("{}/", parents.join("/"));
        prop_assert!(trailing_segment(&name).is_err());
    }

    /// Metric descriptors always derive service and short name from the type
    #[test]
    fn metric_descriptor_service_fields(
        short in "[a-z]{1,12}",
        path in "[a-z_]{1,10}(/[a-z_]{1,10}){0,3}"
    ) {
        let metric_type = format!("{short}.googleapis.com/{path}");
        let body = json!({"metricDescriptors": [{"type": &metric_type}]});

        let items = parse_items(ResourceKind::MetricDescriptors, &body);

        prop_assert_eq!(items.len(), 1);
        prop_assert_eq!(&items[0]["service"], &json!(format!("{short}.googleapis.com")));
        prop_assert_eq!(&items[0]["serviceShortName"], &json!(short));
        prop_assert_eq!(&items[0]["displayName"], &json!(metric_type));
    }

    /// Service pages keep item count and order
    #[test]
    fn services_keep_order(names in prop::collection::vec(arb_segment(), 0..50)) {
        let services: Vec<Value> = names
            .iter()
            .map(|name| json!({"name": format!("projects/p/services/{name}")}))
            .collect();
        let body = json!({"services": services});

        let items = parse_items(ResourceKind::Services, &body);

        prop_assert_eq!(items.len(), names.len());
        for (item, name) in items.iter().zip(&names) {
            prop_assert_eq!(&item["value"], &json!(name));
            prop_assert_eq!(&item["label"], &json!(name));
        }
    }

    /// SLO labels are exactly the upstream display name
    #[test]
    fn slo_labels_are_not_defaulted(
        name in arb_segment(),
        display_name in "[A-Za-z ]{0,16}"
    ) {
        let body = json!({"serviceLevelObjectives": [{
            "name": format!("projects/p/services/s/serviceLevelObjectives/{name}"),
            "displayName": &display_name,
            "goal": 0.995
        }]});

        let items = parse_items(ResourceKind::Slos, &body);

        prop_assert_eq!(&items[0]["value"], &json!(name));
        prop_assert_eq!(&items[0]["label"], &json!(display_name));
    }
}
