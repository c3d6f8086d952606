//! Schema validation helpers.
//!
//! This module validates a resource configuration (`serde_json::Value`) against
//! a [`Schema`], including the [`ValueValidator`]s attached to attributes.
//!
//! # Example
//!
//! ```
//! use k8s_crd_provider::schema::{Attribute, Schema, ValueValidator};
//! use k8s_crd_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute(
//!         "name",
//!         Attribute::required_string().with_validator(ValueValidator::KubernetesName),
//!     )
//!     .with_attribute("replicas", Attribute::optional_int64());
//!
//! // Valid input
//! let diagnostics = validate(&schema, &json!({"name": "grafana-1", "replicas": 2}));
//! assert!(diagnostics.is_empty());
//!
//! // Invalid input - upper case object name
//! let diagnostics = validate(&schema, &json!({"name": "Grafana"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("name".to_string()));
//! ```

use std::collections::BTreeMap;

use crate::k8s::validators;
use crate::schema::{
    Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, DiagnosticSeverity, NestedBlock,
    Schema, ValueValidator,
};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed attributes are skipped (provider sets these)
/// - Attribute types must match the schema
/// - Value validators run on attributes whose type is correct
/// - Nested blocks are validated recursively with min/max item constraints
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
///
/// This is a convenience wrapper around [`validate`] that returns a Result.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
///
/// Returns `true` if valid, `false` otherwise.
/// Use [`validate`] to get detailed error information.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => {
            // Null is valid for optional blocks, but we can't validate further
            return;
        },
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value)))
                    .with_attribute_if_not_empty(path),
            );
            return;
        },
    };

    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, obj.get(name), &attr_path, diagnostics);
    }

    for (name, nested_block) in &block.blocks {
        let block_path = join_path(path, name);
        validate_nested_block(nested_block, obj.get(name), &block_path, diagnostics);
    }

    for key in obj.keys() {
        if !block.attributes.contains_key(key) && !block.blocks.contains_key(key) {
            let key_path = join_path(path, key);
            diagnostics.push(
                Diagnostic::error(format!("Unsupported attribute '{}'", key_path))
                    .with_detail("An attribute with this name is not expected here")
                    .with_attribute(key_path),
            );
        }
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Skip computed-only attributes (provider sets these)
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => {
            let before = diagnostics.len();
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
            if diagnostics.len() == before {
                apply_validators(&attr.validators, v, path, diagnostics);
            }
        },
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        },
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Float64 => {
            if !value.is_number() {
                diagnostics.push(type_error(path, "float64", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::List(element_type) => {
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "list", value));
            }
        },
        AttributeType::Map(value_type) => {
            if let Some(obj) = value.as_object() {
                for (key, val) in obj {
                    let key_path = format!("{}.{}", path, key);
                    validate_attribute_type(value_type, val, &key_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "map", value));
            }
        },
    }
}

fn apply_validators(
    validators: &[ValueValidator],
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for validator in validators {
        match validator {
            ValueValidator::KubernetesName => {
                if let Some(s) = value.as_str() {
                    for problem in validators::dns1123_subdomain(s) {
                        diagnostics.push(invalid_value(path, problem));
                    }
                }
            },
            ValueValidator::KubernetesNamespace => {
                if let Some(s) = value.as_str() {
                    for problem in validators::dns1123_label(s) {
                        diagnostics.push(invalid_value(path, problem));
                    }
                }
            },
            ValueValidator::LabelMap => {
                for (key, problem) in validators::labels(&string_map(value)) {
                    diagnostics.push(invalid_value(&join_path(path, &key), problem));
                }
            },
            ValueValidator::AnnotationMap => {
                for (key, problem) in validators::annotations(&string_map(value)) {
                    diagnostics.push(invalid_value(&join_path(path, &key), problem));
                }
            },
            ValueValidator::OneOf(allowed) => {
                if let Some(s) = value.as_str() {
                    if !allowed.iter().any(|a| a == s) {
                        diagnostics.push(invalid_value(
                            path,
                            format!("value must be one of: {}", allowed.join(", ")),
                        ));
                    }
                }
            },
        }
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match nested.nesting_mode {
        BlockNestingMode::Single => {
            validate_single_block(nested, value, path, diagnostics);
        },
        BlockNestingMode::List => {
            validate_list_block(nested, value, path, diagnostics);
        },
    }
}

fn validate_single_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required block '{}'", path))
                        .with_detail("At least one block is required")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => {
            validate_block(&nested.block, v, path, diagnostics);
        },
    }
}

fn validate_list_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s)",
                        path, nested.min_items
                    ))
                    .with_attribute(path),
                );
            }
        },
        Some(Value::Array(arr)) => {
            let len = arr.len() as u32;

            if len < nested.min_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s), got {}",
                        path, nested.min_items, len
                    ))
                    .with_attribute(path),
                );
            }

            // Check max_items (0 means unlimited)
            if nested.max_items > 0 && len > nested.max_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' allows at most {} item(s), got {}",
                        path, nested.max_items, len
                    ))
                    .with_attribute(path),
                );
            }

            for (i, item) in arr.iter().enumerate() {
                let item_path = format!("{}.{}", path, i);
                validate_block(&nested.block, item, &item_path, diagnostics);
            }
        },
        Some(v) => {
            diagnostics.push(
                Diagnostic::error(format!("Expected list for block '{}'", path))
                    .with_detail(format!("Got {}", value_type_name(v)))
                    .with_attribute(path),
            );
        },
    }
}

// Helper functions

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else if name.is_empty() {
        base.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// Strict: the native structs decode int64 attributes into `i64`, which
// rejects floats even when they have no fractional part.
fn is_int64(value: &Value) -> bool {
    value.as_i64().is_some()
}

fn string_map(value: &Value) -> BTreeMap<String, String> {
    value
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic {
        severity: DiagnosticSeverity::Error,
        summary: format!("Invalid type for attribute '{}'", path),
        detail: Some(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(got)
        )),
        attribute: Some(path.to_string()),
    }
}

fn invalid_value(path: &str, problem: String) -> Diagnostic {
    Diagnostic::error(format!("Invalid value for attribute '{}'", path))
        .with_detail(problem)
        .with_attribute(path)
}

trait DiagnosticExt {
    fn with_attribute_if_not_empty(self, path: &str) -> Self;
}

impl DiagnosticExt for Diagnostic {
    fn with_attribute_if_not_empty(self, path: &str) -> Self {
        if path.is_empty() {
            self
        } else {
            self.with_attribute(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::metadata_block;
    use crate::schema::{Attribute, AttributeFlags, Block, NestedBlock, Schema};
    use serde_json::json;

    fn metadata_schema() -> Schema {
        Schema::v0().with_block("metadata", metadata_block(true))
    }

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("base_image", Attribute::required_string());

        let diagnostics = validate(&schema, &json!({"base_image": "grafana/grafana:9.0.0"}));
        assert!(diagnostics.is_empty());

        // Missing required
        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("base_image".to_string()));

        // Null value
        let diagnostics = validate(&schema, &json!({"base_image": null}));
        assert_eq!(diagnostics.len(), 1);

        // Wrong type
        let diagnostics = validate(&schema, &json!({"base_image": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_optional_attribute() {
        let schema = Schema::v0().with_attribute("replicas", Attribute::optional_int64());

        assert!(validate(&schema, &json!({"replicas": 2})).is_empty());
        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"replicas": null})).is_empty());
        assert_eq!(
            validate(&schema, &json!({"replicas": "two"})).len(),
            1
        );
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = Schema::v0().with_attribute("yaml", Attribute::computed_string());

        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"yaml": 123})).is_empty());
    }

    #[test]
    fn test_validate_int64() {
        let schema = Schema::v0().with_attribute("timeout", Attribute::required_int64());

        assert!(validate(&schema, &json!({"timeout": 42})).is_empty());
        assert_eq!(validate(&schema, &json!({"timeout": 42.0})).len(), 1);
        assert_eq!(validate(&schema, &json!({"timeout": 42.5})).len(), 1);
        assert_eq!(validate(&schema, &json!({"timeout": "42"})).len(), 1);
    }

    #[test]
    fn test_validate_list_and_map() {
        let schema = Schema::v0()
            .with_attribute("secrets", Attribute::optional_string_list())
            .with_attribute("annotations", Attribute::optional_string_map());

        assert!(validate(
            &schema,
            &json!({"secrets": ["a", "b"], "annotations": {"x": "y"}})
        )
        .is_empty());

        let diagnostics = validate(&schema, &json!({"secrets": ["a", 1]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("secrets.1".to_string()));

        let diagnostics = validate(&schema, &json!({"annotations": {"x": 1}}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("annotations.x".to_string()));
    }

    #[test]
    fn test_validate_unsupported_attribute() {
        let schema = Schema::v0().with_attribute("base_image", Attribute::optional_string());

        let diagnostics = validate(&schema, &json!({"baseImage": "grafana"}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Unsupported attribute"));
        assert_eq!(diagnostics[0].attribute, Some("baseImage".to_string()));
    }

    #[test]
    fn test_validate_metadata_valid() {
        let diagnostics = validate(
            &metadata_schema(),
            &json!({"metadata": {
                "name": "grafana-1",
                "namespace": "monitoring",
                "labels": {"app.kubernetes.io/name": "grafana"},
                "annotations": {"example.com/owner": "team a"}
            }}),
        );
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    }

    #[test]
    fn test_validate_metadata_missing() {
        let diagnostics = validate(&metadata_schema(), &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Missing required block"));
    }

    #[test]
    fn test_validate_metadata_bad_name_and_namespace() {
        let diagnostics = validate(
            &metadata_schema(),
            &json!({"metadata": {"name": "Grafana_1", "namespace": "team.a"}}),
        );
        let attributes: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.clone())
            .collect();
        assert!(attributes.contains(&"metadata.name".to_string()));
        assert!(attributes.contains(&"metadata.namespace".to_string()));
    }

    #[test]
    fn test_validate_metadata_bad_labels_and_annotations() {
        let diagnostics = validate(
            &metadata_schema(),
            &json!({"metadata": {
                "name": "grafana-1",
                "namespace": "monitoring",
                "labels": {"app": "has spaces"},
                "annotations": {"a/b/c": "x"}
            }}),
        );
        assert_eq!(diagnostics.len(), 2);
        let attributes: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.clone())
            .collect();
        assert!(attributes.contains(&"metadata.labels.app".to_string()));
        assert!(attributes.contains(&"metadata.annotations.a/b/c".to_string()));
    }

    #[test]
    fn test_validate_one_of() {
        let schema = Schema::v0().with_attribute(
            "image_pull_policy",
            Attribute::optional_string().one_of(["Always", "Never", "IfNotPresent"]),
        );

        assert!(validate(&schema, &json!({"image_pull_policy": "Always"})).is_empty());
        let diagnostics = validate(&schema, &json!({"image_pull_policy": "Sometimes"}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]
            .detail
            .as_deref()
            .is_some_and(|d| d.contains("Always, Never, IfNotPresent")));
    }

    #[test]
    fn test_validators_skipped_on_type_error() {
        let schema = Schema::v0().with_attribute(
            "name",
            Attribute::required_string().with_validator(ValueValidator::KubernetesName),
        );

        let diagnostics = validate(&schema, &json!({"name": 42}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_nested_block_list() {
        let schema = Schema::v0().with_block(
            "ports",
            NestedBlock::list(Block::new().with_attribute("port", Attribute::required_int64()))
                .with_min_items(1)
                .with_max_items(3),
        );

        assert!(validate(&schema, &json!({"ports": [{"port": 80}, {"port": 443}]})).is_empty());

        let diagnostics = validate(&schema, &json!({"ports": []}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at least 1"));

        let diagnostics = validate(
            &schema,
            &json!({"ports": [{"port": 1}, {"port": 2}, {"port": 3}, {"port": 4}]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at most 3"));

        let diagnostics = validate(&schema, &json!({"ports": [{"port": "eighty"}]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("ports.0.port".to_string()));

        let diagnostics = validate(&schema, &json!({"ports": {"port": 80}}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected list"));
    }

    #[test]
    fn test_validate_deeply_nested() {
        let schema = Schema::v0().with_block(
            "spec",
            NestedBlock::single(Block::new().with_block(
                "containers",
                NestedBlock::list(
                    Block::new()
                        .with_attribute("name", Attribute::required_string())
                        .with_block(
                            "ports",
                            NestedBlock::list(
                                Block::new()
                                    .with_attribute("container_port", Attribute::required_int64()),
                            ),
                        ),
                ),
            )),
        );

        let diagnostics = validate(
            &schema,
            &json!({"spec": {"containers": [{"name": "sidecar", "ports": [{"container_port": 8080}]}]}}),
        );
        assert!(diagnostics.is_empty());

        let diagnostics = validate(
            &schema,
            &json!({"spec": {"containers": [{"name": "sidecar", "ports": [{"container_port": "http"}]}]}}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute,
            Some("spec.containers.0.ports.0.container_port".to_string())
        );
    }

    #[test]
    fn test_is_valid_helper() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(is_valid(&schema, &json!({"name": "test"})));
        assert!(!is_valid(&schema, &json!({})));
    }

    #[test]
    fn test_validate_result_helper() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(validate_result(&schema, &json!({"name": "test"})).is_ok());

        let result = validate_result(&schema, &json!({}));
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().len(), 1);
    }

    #[test]
    fn test_validate_float() {
        let schema = Schema::v0().with_attribute(
            "ratio",
            Attribute::new(AttributeType::Float64, AttributeFlags::optional()),
        );
        assert!(validate(&schema, &json!({"ratio": 0.5})).is_empty());
        assert!(validate(&schema, &json!({"ratio": 1})).is_empty());
        assert_eq!(validate(&schema, &json!({"ratio": "half"})).len(), 1);
    }

    #[test]
    fn test_validate_root_not_object() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
    }
}
