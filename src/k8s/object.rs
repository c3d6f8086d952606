//! Declaring Kubernetes object types once for both serde and the schema.
//!
//! [`k8s_object!`](crate::k8s_object) expands a field list into a native struct
//! (snake_case in configuration, upstream casing in YAML, every field optional
//! and omitted when unset) and an [`ObjectSchema`] implementation whose block
//! mirrors the struct field by field. Doc comments become schema descriptions.

use crate::schema::{Attribute, Block, NestedBlock};

/// A native struct that also describes itself as a schema block.
pub trait ObjectSchema {
    /// The schema block mirroring this struct's fields.
    fn block() -> Block;
}

/// Schema of a single struct field: a plain attribute or a nested block.
#[derive(Debug, Clone)]
pub enum FieldSchema {
    /// Scalar, list-of-scalar or map attribute.
    Attribute(Attribute),
    /// Nested object or list of objects.
    Block(NestedBlock),
}

impl From<Attribute> for FieldSchema {
    fn from(attr: Attribute) -> Self {
        Self::Attribute(attr)
    }
}

impl From<NestedBlock> for FieldSchema {
    fn from(block: NestedBlock) -> Self {
        Self::Block(block)
    }
}

/// A single nested block holding `T`.
pub fn single<T: ObjectSchema>() -> NestedBlock {
    NestedBlock::single(T::block())
}

/// A list of nested blocks holding `T`.
pub fn list<T: ObjectSchema>() -> NestedBlock {
    NestedBlock::list(T::block())
}

/// Join doc comment lines into one description.
pub fn doc_text(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Add a field to `block`, using the field's doc comment as its description.
pub fn with_field(block: Block, name: &str, field: impl Into<FieldSchema>, doc: &[&str]) -> Block {
    let description = doc_text(doc);
    match field.into() {
        FieldSchema::Attribute(mut attr) => {
            if attr.description.is_none() && !description.is_empty() {
                attr.description = Some(description);
            }
            block.with_attribute(name, attr)
        },
        FieldSchema::Block(mut nested) => {
            if !description.is_empty() {
                nested.block.description = Some(description);
            }
            block.with_block(name, nested)
        },
    }
}

/// Declare a Kubernetes object type and its schema block in one place.
///
/// ```
/// use k8s_crd_provider::k8s::object::ObjectSchema;
/// use k8s_crd_provider::k8s_object;
/// use k8s_crd_provider::schema::Attribute;
///
/// k8s_object! {
///     /// A container port.
///     pub struct Port as "camelCase" {
///         /// Port number.
///         container_port: i32 => Attribute::required_int64(),
///         #[yaml = "hostIP"]
///         host_ip: String => Attribute::optional_string(),
///     }
/// }
///
/// let port = Port { container_port: Some(3000), host_ip: None };
/// assert_eq!(serde_yaml::to_string(&port).unwrap(), "containerPort: 3000\n");
/// assert!(Port::block().attributes["container_port"].flags.required);
/// ```
#[macro_export]
macro_rules! k8s_object {
    (
        $(#[doc = $doc:literal])*
        $vis:vis struct $name:ident as $case:literal {
            $(
                $(#[doc = $field_doc:literal])*
                $(#[yaml = $yaml:literal])?
                $field:ident : $ty:ty => $schema:expr
            ),* $(,)?
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(deny_unknown_fields, rename_all(serialize = $case, deserialize = "snake_case"))]
        $vis struct $name {
            $(
                $(#[doc = $field_doc])*
                #[serde(skip_serializing_if = "Option::is_none")]
                $(#[serde(rename(serialize = $yaml))])?
                pub $field: Option<$ty>,
            )*
        }

        impl $crate::k8s::object::ObjectSchema for $name {
            fn block() -> $crate::schema::Block {
                let block = $crate::schema::Block::new();
                let description = $crate::k8s::object::doc_text(&[$($doc),*]);
                let block = if description.is_empty() {
                    block
                } else {
                    block.with_description(description)
                };
                $(
                    let block = $crate::k8s::object::with_field(
                        block,
                        stringify!($field),
                        $schema,
                        &[$($field_doc),*],
                    );
                )*
                block
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::BlockNestingMode;
    use serde_json::json;

    crate::k8s_object! {
        /// Inner object.
        struct Inner as "camelCase" {
            /// Whether it is on.
            is_enabled: bool => Attribute::optional_bool(),
        }
    }

    crate::k8s_object! {
        struct Outer as "camelCase" {
            /// The outer name.
            display_name: String => Attribute::required_string(),
            #[yaml = "podIP"]
            pod_ip: String => Attribute::optional_string(),
            /// Explicitly described.
            inner: Inner => single::<Inner>(),
            items: Vec<Inner> => list::<Inner>(),
        }
    }

    crate::k8s_object! {
        struct Section as "snake_case" {
            root_url: String => Attribute::optional_string(),
        }
    }

    #[test]
    fn test_config_names_are_snake_case() {
        let outer: Outer = serde_json::from_value(json!({
            "display_name": "grafana",
            "pod_ip": "10.0.0.1",
            "inner": {"is_enabled": true},
            "items": null
        }))
        .unwrap();

        assert_eq!(outer.display_name.as_deref(), Some("grafana"));
        assert_eq!(outer.inner, Some(Inner { is_enabled: Some(true) }));
        assert!(outer.items.is_none());
    }

    #[test]
    fn test_yaml_uses_upstream_casing() {
        let outer = Outer {
            display_name: Some("grafana".to_string()),
            pod_ip: Some("10.0.0.1".to_string()),
            inner: Some(Inner { is_enabled: Some(false) }),
            items: Some(vec![]),
        };

        let yaml = serde_yaml::to_string(&outer).unwrap();
        assert_eq!(
            yaml,
            "displayName: grafana\npodIP: 10.0.0.1\ninner:\n  isEnabled: false\nitems: []\n"
        );

        let section = Section {
            root_url: Some("grafana.example.com".to_string()),
        };
        assert_eq!(
            serde_yaml::to_string(&section).unwrap(),
            "root_url: grafana.example.com\n"
        );
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(serde_json::from_value::<Outer>(json!({"displayName": "camel"})).is_err());
        assert!(serde_json::from_value::<Outer>(json!({"colour": "red"})).is_err());
    }

    #[test]
    fn test_block_mirrors_struct() {
        let block = Outer::block();

        assert!(block.description.is_none());
        assert_eq!(
            block.attributes["display_name"].description.as_deref(),
            Some("The outer name.")
        );
        assert!(block.attributes["display_name"].flags.required);
        assert!(block.attributes.contains_key("pod_ip"));

        let inner = &block.blocks["inner"];
        assert_eq!(inner.nesting_mode, BlockNestingMode::Single);
        assert_eq!(inner.block.description.as_deref(), Some("Explicitly described."));
        assert!(inner.block.attributes.contains_key("is_enabled"));

        let items = &block.blocks["items"];
        assert_eq!(items.nesting_mode, BlockNestingMode::List);
        assert_eq!(items.block.description.as_deref(), Some("Inner object."));
    }

    #[test]
    fn test_doc_text() {
        assert_eq!(doc_text(&[" First line.", " Second line.", ""]), "First line. Second line.");
        assert_eq!(doc_text(&[]), "");
    }
}
