//! Custom resources as provider-managed objects.
//!
//! A [`CustomResource`] names a Kubernetes kind and its spec type. Wrapped in a
//! [`CrdResource`] it becomes a [`ResourceHandler`]: the provider's view of the
//! kind, with its schema and lifecycle operations. No cluster is contacted; the
//! lifecycle renders the configured object as a YAML manifest and keeps it in
//! state next to the configuration it came from.
//!
//! State document of every custom resource:
//!
//! ```text
//! {
//!   "id": 1700000000000000000,           // nanosecond timestamp of the last apply
//!   "yaml": "apiVersion: ...",           // the rendered manifest
//!   "api_version": "integreatly.org/v1alpha1",
//!   "kind": "Grafana",
//!   "metadata": { "name": ..., ... },    // as configured
//!   "spec": { ... }                      // as configured, or null
//! }
//! ```

use std::marker::PhantomData;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::ProviderError;
use crate::k8s::{metadata_block, ObjectMeta};
use crate::schema::{Attribute, Block, Diagnostic, NestedBlock, Schema};
use crate::types::{AttributeChange, PlanResult};
use crate::validation;

/// A Kubernetes custom resource kind.
pub trait CustomResource: Send + Sync + 'static {
    /// API group, such as `integreatly.org`. Empty for the core group.
    const GROUP: &'static str;
    /// API version within the group, such as `v1alpha1`.
    const VERSION: &'static str;
    /// Kind name, such as `Grafana`.
    const KIND: &'static str;
    /// Whether objects of this kind live in a namespace.
    const NAMESPACED: bool;

    /// Native representation of `spec`.
    type Spec: Serialize + DeserializeOwned + Send + Sync;

    /// Schema of the `spec` block.
    fn spec_block() -> Block;

    /// Description of the resource type.
    fn description() -> &'static str {
        ""
    }

    /// The manifest's `apiVersion`.
    fn api_version() -> String {
        if Self::GROUP.is_empty() {
            Self::VERSION.to_string()
        } else {
            format!("{}/{}", Self::GROUP, Self::VERSION)
        }
    }

    /// Provider resource type name, e.g. `k8s_integreatly_org_grafana_v1alpha1`.
    fn resource_type() -> String {
        let mut name = String::from("k8s_");
        if !Self::GROUP.is_empty() {
            name.push_str(&Self::GROUP.replace(['.', '-'], "_"));
            name.push('_');
        }
        name.push_str(&Self::KIND.to_lowercase());
        name.push('_');
        name.push_str(Self::VERSION);
        name
    }
}

/// The Kubernetes manifest rendered into `yaml`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest<S> {
    /// `group/version` of the kind.
    pub api_version: String,
    /// Kind name.
    pub kind: String,
    /// Object metadata.
    pub metadata: ObjectMeta,
    /// Desired state; left out of the manifest when not configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<S>,
}

/// The configurable part of a resource document.
///
/// Computed attributes in the document (`id`, `yaml`, ...) are ignored.
#[derive(Debug, Deserialize)]
struct ResourceConfig<S> {
    metadata: ObjectMeta,
    spec: Option<S>,
}

/// State stored for a custom resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Nanosecond timestamp of the last create or update; null until applied.
    pub id: Option<i64>,
    /// The rendered manifest.
    pub yaml: String,
    /// The manifest's `apiVersion`.
    pub api_version: String,
    /// The manifest's `kind`.
    pub kind: String,
    /// `metadata` as configured.
    pub metadata: Value,
    /// `spec` as configured.
    pub spec: Value,
}

impl ResourceState {
    /// Read the state document the host stored for a resource.
    pub fn from_value(value: &Value) -> Result<Self, ProviderError> {
        Ok(serde_json::from_value(value.clone())?)
    }

    /// The state document returned to the host.
    pub fn to_value(&self) -> Result<Value, ProviderError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Lifecycle of one resource type, independent of the kind it manages.
pub trait ResourceHandler: Send + Sync {
    /// Provider resource type name.
    fn resource_type(&self) -> String;

    /// Schema of the resource.
    fn schema(&self) -> Schema;

    /// Validate a configuration against the schema and the native types.
    fn validate(&self, config: &Value) -> Vec<Diagnostic>;

    /// Plan a create (no prior state), an update, or a destroy (null proposed state).
    fn plan(&self, prior: Option<&Value>, proposed: &Value) -> Result<PlanResult, ProviderError>;

    /// Create the resource from its planned state.
    fn create(&self, planned: &Value) -> Result<Value, ProviderError>;

    /// Refresh the resource's state.
    fn read(&self, current: Value) -> Result<Value, ProviderError>;

    /// Update the resource to its planned state.
    fn update(&self, prior: &Value, planned: &Value) -> Result<Value, ProviderError>;

    /// Delete the resource.
    fn delete(&self, current: &Value) -> Result<(), ProviderError>;
}

/// The [`ResourceHandler`] of a custom resource kind.
pub struct CrdResource<R> {
    kind: PhantomData<fn() -> R>,
}

impl<R: CustomResource> CrdResource<R> {
    /// Create the handler.
    pub fn new() -> Self {
        Self { kind: PhantomData }
    }

    /// Render the manifest described by a configuration as YAML.
    pub fn render(&self, config: &Value) -> Result<String, ProviderError> {
        let decoded: ResourceConfig<R::Spec> =
            serde_json::from_value(config.clone()).map_err(|e| {
                ProviderError::Validation(format!("{} configuration: {}", R::KIND, e))
            })?;

        let manifest = Manifest {
            api_version: R::api_version(),
            kind: R::KIND.to_string(),
            metadata: decoded.metadata,
            spec: decoded.spec,
        };
        Ok(serde_yaml::to_string(&manifest)?)
    }

    fn state(&self, id: Option<i64>, config: &Value) -> Result<ResourceState, ProviderError> {
        Ok(ResourceState {
            id,
            yaml: self.render(config)?,
            api_version: R::api_version(),
            kind: R::KIND.to_string(),
            metadata: config.get("metadata").cloned().unwrap_or(Value::Null),
            spec: config.get("spec").cloned().unwrap_or(Value::Null),
        })
    }
}

impl<R: CustomResource> Default for CrdResource<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Current time in nanoseconds since the Unix epoch.
fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

fn prior_id(state: &Value) -> Option<i64> {
    state.get("id").and_then(Value::as_i64)
}

fn lookup<'a>(value: &'a Value, dotted: &str) -> &'a Value {
    value
        .pointer(&format!("/{}", dotted.replace('.', "/")))
        .unwrap_or(&Value::Null)
}

impl<R: CustomResource> ResourceHandler for CrdResource<R> {
    fn resource_type(&self) -> String {
        R::resource_type()
    }

    fn schema(&self) -> Schema {
        let mut schema = Schema::v0()
            .with_attribute(
                "id",
                Attribute::computed_int64()
                    .with_description("Nanosecond timestamp of the last create or update."),
            )
            .with_attribute(
                "yaml",
                Attribute::computed_string().with_description("The manifest as YAML."),
            )
            .with_attribute(
                "api_version",
                Attribute::computed_string()
                    .with_description("APIVersion defines the versioned schema of this representation of an object."),
            )
            .with_attribute(
                "kind",
                Attribute::computed_string()
                    .with_description("Kind is a string value representing the REST resource this object represents."),
            )
            .with_block("metadata", metadata_block(R::NAMESPACED))
            .with_block("spec", NestedBlock::single(R::spec_block()));

        if !R::description().is_empty() {
            schema = schema.with_description(R::description());
        }
        schema
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = validation::validate(&self.schema(), config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            return diagnostics;
        }

        // The schema allows values the native types reject, such as integers
        // outside the int32 range.
        if let Err(e) = serde_json::from_value::<ResourceConfig<R::Spec>>(config.clone()) {
            diagnostics.push(
                Diagnostic::error("Invalid resource configuration").with_detail(e.to_string()),
            );
        }
        diagnostics
    }

    fn plan(&self, prior: Option<&Value>, proposed: &Value) -> Result<PlanResult, ProviderError> {
        let before = prior.cloned().unwrap_or(Value::Null);

        if proposed.is_null() {
            debug!(resource_type = %R::resource_type(), "Planning destroy");
            let changes = AttributeChange::diff("", &before, &Value::Null);
            return Ok(PlanResult::with_changes(Value::Null, changes, false));
        }

        let mut planned = self.state(prior.and_then(prior_id), proposed)?;
        let mut changes: Vec<AttributeChange> = AttributeChange::diff(
            "",
            &before,
            &planned.to_value()?,
        )
        .into_iter()
        .filter(|change| change.path != "id")
        .collect();

        let requires_replace = prior.is_some()
            && self
                .schema()
                .block
                .force_new_paths()
                .iter()
                .any(|path| lookup(&before, path) != lookup(proposed, path));

        if !changes.is_empty() {
            // Known after apply.
            planned.id = None;
            if let Some(id) = prior.and_then(prior_id) {
                changes.push(AttributeChange::modified("id", Value::from(id), Value::Null));
            }
        }

        debug!(
            resource_type = %R::resource_type(),
            changes = changes.len(),
            requires_replace,
            "Planned resource"
        );
        Ok(PlanResult::with_changes(planned.to_value()?, changes, requires_replace))
    }

    fn create(&self, planned: &Value) -> Result<Value, ProviderError> {
        let state = self.state(Some(now_nanos()), planned)?;
        info!(resource_type = %R::resource_type(), id = ?state.id, "Rendered manifest");
        state.to_value()
    }

    fn read(&self, current: Value) -> Result<Value, ProviderError> {
        Ok(current)
    }

    fn update(&self, prior: &Value, planned: &Value) -> Result<Value, ProviderError> {
        let now = now_nanos();
        let id = match prior_id(prior) {
            Some(previous) => now.max(
                previous
                    .checked_add(1)
                    .ok_or(ProviderError::IdExhausted(previous))?,
            ),
            None => now,
        };

        let state = self.state(Some(id), planned)?;
        info!(resource_type = %R::resource_type(), id, "Re-rendered manifest");
        state.to_value()
    }

    fn delete(&self, current: &Value) -> Result<(), ProviderError> {
        debug!(
            resource_type = %R::resource_type(),
            id = ?prior_id(current),
            "Deleting resource state"
        );
        Ok(())
    }
}
