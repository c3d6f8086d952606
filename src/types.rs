//! Convenience types for provider implementations.
//!
//! These types provide a more ergonomic API over the raw protobuf types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The dotted path to the attribute that changed.
    pub path: String,
    /// The value before the change (None if creating).
    pub before: Option<Value>,
    /// The value after the change (None if deleting).
    pub after: Option<Value>,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(path: impl Into<String>, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// Create a change for a new attribute.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// Create a change for a removed attribute.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// Create a change for a modified attribute.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self::new(path, Some(before), Some(after))
    }

    /// Leaf-level differences between two JSON documents.
    ///
    /// Objects are compared key by key and reported with dotted paths; any
    /// other value (lists included) is compared as a whole. Null, a missing
    /// key and an object missing on one side are treated alike, so a new
    /// nested block shows up as its individual leaves.
    ///
    /// ```
    /// use k8s_crd_provider::AttributeChange;
    /// use serde_json::json;
    ///
    /// let changes = AttributeChange::diff(
    ///     "metadata",
    ///     &json!({"name": "grafana-1", "labels": {"tier": "a"}}),
    ///     &json!({"name": "grafana-1", "labels": {"tier": "b"}}),
    /// );
    /// assert_eq!(changes.len(), 1);
    /// assert_eq!(changes[0].path, "metadata.labels.tier");
    /// ```
    pub fn diff(path: &str, before: &Value, after: &Value) -> Vec<AttributeChange> {
        let mut changes = Vec::new();
        diff_into(path, before, after, &mut changes);
        changes
    }
}

fn diff_into(path: &str, before: &Value, after: &Value, changes: &mut Vec<AttributeChange>) {
    match (before, after) {
        (Value::Object(_), Value::Object(_) | Value::Null) | (Value::Null, Value::Object(_)) => {
            let empty = Map::new();
            let b = before.as_object().unwrap_or(&empty);
            let a = after.as_object().unwrap_or(&empty);
            let mut keys: Vec<&String> = b.keys().chain(a.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                diff_into(
                    &child,
                    b.get(key).unwrap_or(&Value::Null),
                    a.get(key).unwrap_or(&Value::Null),
                    changes,
                );
            }
        },
        (b, a) if b == a => {},
        (Value::Null, a) => changes.push(AttributeChange::added(path, a.clone())),
        (b, Value::Null) => changes.push(AttributeChange::removed(path, b.clone())),
        (b, a) => changes.push(AttributeChange::modified(path, b.clone(), a.clone())),
    }
}

impl From<crate::generated::AttributeChange> for AttributeChange {
    fn from(proto: crate::generated::AttributeChange) -> Self {
        Self {
            path: proto.path,
            before: if proto.before.is_empty() {
                None
            } else {
                serde_json::from_slice(&proto.before).ok()
            },
            after: if proto.after.is_empty() {
                None
            } else {
                serde_json::from_slice(&proto.after).ok()
            },
        }
    }
}

impl From<AttributeChange> for crate::generated::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        Self {
            path: change.path,
            before: change
                .before
                .map(|v| serde_json::to_vec(&v).unwrap_or_default())
                .unwrap_or_default(),
            after: change
                .after
                .map(|v| serde_json::to_vec(&v).unwrap_or_default())
                .unwrap_or_default(),
        }
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state after the operation.
    pub planned_state: Value,
    /// The list of attribute changes.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource requires replacement.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Create a plan result with no changes.
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// Create a plan result with changes.
    pub fn with_changes(
        planned_state: Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }
}

/// Provider metadata returned by GetMetadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// List of resource type names.
    pub resources: Vec<String>,
    /// Server capabilities.
    pub capabilities: ServerCapabilities,
}

/// Server capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// Whether the provider supports planning destroy operations.
    pub plan_destroy: bool,
}

/// The protocol version for the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// The handshake prefix output by the provider.
pub const HANDSHAKE_PREFIX: &str = "K8S_CRD_PROVIDER";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_change_constructors() {
        let added = AttributeChange::added("spec.base_image", json!("grafana/grafana"));
        assert!(added.before.is_none());
        assert_eq!(added.after, Some(json!("grafana/grafana")));

        let removed = AttributeChange::removed("spec.base_image", json!("grafana/grafana"));
        assert_eq!(removed.before, Some(json!("grafana/grafana")));
        assert!(removed.after.is_none());

        let modified = AttributeChange::modified("spec.deployment.replicas", json!(1), json!(2));
        assert_eq!(modified.before, Some(json!(1)));
        assert_eq!(modified.after, Some(json!(2)));
    }

    #[test]
    fn test_attribute_change_conversion() {
        let change = AttributeChange::modified("metadata.name", json!("old"), json!("new"));

        let proto: crate::generated::AttributeChange = change.clone().into();
        assert_eq!(proto.path, "metadata.name");

        let back: AttributeChange = proto.into();
        assert_eq!(back, change);
    }

    #[test]
    fn test_diff_identical_documents() {
        let doc = json!({"metadata": {"name": "grafana-1"}, "spec": null});
        assert!(AttributeChange::diff("", &doc, &doc).is_empty());
    }

    #[test]
    fn test_diff_reports_leaves() {
        let before = json!({
            "metadata": {"name": "grafana-1", "labels": {"a": "1"}},
            "spec": null
        });
        let after = json!({
            "metadata": {"name": "grafana-2", "labels": {"a": "1", "b": "2"}},
            "spec": {"base_image": "grafana/grafana"}
        });

        let changes = AttributeChange::diff("", &before, &after);
        let paths: Vec<_> = changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["metadata.labels.b", "metadata.name", "spec.base_image"]
        );
        assert_eq!(changes[0], AttributeChange::added("metadata.labels.b", json!("2")));
        assert_eq!(
            changes[1],
            AttributeChange::modified("metadata.name", json!("grafana-1"), json!("grafana-2"))
        );
    }

    #[test]
    fn test_diff_lists_compared_whole() {
        let changes = AttributeChange::diff(
            "spec.secrets",
            &json!(["a", "b"]),
            &json!(["a", "c"]),
        );
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "spec.secrets");
    }

    #[test]
    fn test_diff_removed_value() {
        let changes = AttributeChange::diff("", &json!({"yaml": "kind: Grafana\n"}), &json!({}));
        assert_eq!(
            changes,
            vec![AttributeChange::removed("yaml", json!("kind: Grafana\n"))]
        );
    }

    #[test]
    fn test_plan_result() {
        let no_change = PlanResult::no_change(json!({"id": 1}));
        assert!(no_change.changes.is_empty());
        assert!(!no_change.requires_replace);

        let with_changes = PlanResult::with_changes(
            json!({"id": 1, "metadata": {"name": "new"}}),
            vec![AttributeChange::modified(
                "metadata.name",
                json!("old"),
                json!("new"),
            )],
            true,
        );
        assert_eq!(with_changes.changes.len(), 1);
        assert!(with_changes.requires_replace);
    }

    #[test]
    fn test_protocol_constants() {
        assert_eq!(PROTOCOL_VERSION, 1);
        assert_eq!(HANDSHAKE_PREFIX, "K8S_CRD_PROVIDER");
    }
}
