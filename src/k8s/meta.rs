//! Object metadata shared by every custom resource.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::{Attribute, Block, NestedBlock, ValueValidator};

/// The `metadata` section of a managed Kubernetes object.
///
/// Deserialised from the resource configuration and serialised into the
/// manifest; empty label and annotation maps are left out of the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectMeta {
    /// Object name, unique within its namespace.
    pub name: String,
    /// Namespace of the object; `None` for cluster-scoped kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Labels attached to the object.
    #[serde(default, skip_serializing_if = "is_none_or_empty")]
    pub labels: Option<BTreeMap<String, String>>,
    /// Annotations attached to the object.
    #[serde(default, skip_serializing_if = "is_none_or_empty")]
    pub annotations: Option<BTreeMap<String, String>>,
}

fn is_none_or_empty(map: &Option<BTreeMap<String, String>>) -> bool {
    map.as_ref().map_or(true, BTreeMap::is_empty)
}

/// Schema block for `metadata`.
///
/// Name and namespace force replacement: they identify the object in the
/// cluster. Cluster-scoped kinds have no `namespace` attribute.
pub fn metadata_block(namespaced: bool) -> NestedBlock {
    let mut block = Block::new()
        .with_description("Data that helps uniquely identify this object.")
        .with_attribute(
            "name",
            Attribute::required_string()
                .with_description(
                    "Unique identifier for this object. See \
                     https://kubernetes.io/docs/concepts/overview/working-with-objects/names#names \
                     for more information.",
                )
                .with_force_new()
                .with_validator(ValueValidator::KubernetesName),
        )
        .with_attribute(
            "labels",
            Attribute::optional_string_map()
                .with_description(
                    "Keys and values that can be used to organize and categorize objects. See \
                     https://kubernetes.io/docs/concepts/overview/working-with-objects/labels/",
                )
                .with_validator(ValueValidator::LabelMap),
        )
        .with_attribute(
            "annotations",
            Attribute::optional_string_map()
                .with_description(
                    "Unstructured key value map stored with a resource that may be set by \
                     external tools to store and retrieve arbitrary metadata. See \
                     https://kubernetes.io/docs/concepts/overview/working-with-objects/annotations/",
                )
                .with_validator(ValueValidator::AnnotationMap),
        );

    if namespaced {
        block = block.with_attribute(
            "namespace",
            Attribute::required_string()
                .with_description(
                    "Namespace that contains this object. See \
                     https://kubernetes.io/docs/concepts/overview/working-with-objects/namespaces/",
                )
                .with_force_new()
                .with_validator(ValueValidator::KubernetesNamespace),
        );
    }

    NestedBlock::required_single(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_with_null_optionals() {
        let meta: ObjectMeta = serde_json::from_value(json!({
            "name": "grafana-1",
            "namespace": "monitoring",
            "labels": null,
            "annotations": null
        }))
        .unwrap();

        assert_eq!(meta.name, "grafana-1");
        assert_eq!(meta.namespace.as_deref(), Some("monitoring"));
        assert!(meta.labels.is_none());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = serde_json::from_value::<ObjectMeta>(json!({
            "name": "grafana-1",
            "generate_name": "grafana-"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_maps_omitted() {
        let meta = ObjectMeta {
            name: "grafana-1".to_string(),
            namespace: Some("monitoring".to_string()),
            labels: Some(BTreeMap::new()),
            annotations: None,
        };

        let yaml = serde_yaml::to_string(&meta).unwrap();
        assert_eq!(yaml, "name: grafana-1\nnamespace: monitoring\n");
    }

    #[test]
    fn test_metadata_block() {
        let namespaced = metadata_block(true);
        assert_eq!(namespaced.min_items, 1);
        assert!(namespaced.block.attributes["namespace"].flags.required);
        assert!(namespaced.block.attributes["name"].force_new);

        let cluster_scoped = metadata_block(false);
        assert!(!cluster_scoped.block.attributes.contains_key("namespace"));
    }
}
