//! Testing utilities for the provider.
//!
//! [`ProviderTester`] drives a `ProviderService` implementation the way a host
//! would, without a gRPC server. [`sample_config`] builds a configuration that
//! sets every attribute of a schema; [`assert_sample_rendered`] checks that all
//! of those values reach the rendered manifest, which catches a schema and a
//! native struct that have drifted apart.
//!
//! # Example
//!
//! ```ignore
//! use k8s_crd_provider::testing::ProviderTester;
//! use k8s_crd_provider::CrdProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_grafana() {
//!     let tester = ProviderTester::new(CrdProvider::with_all_resources());
//!     tester.configure(json!({})).await.unwrap();
//!
//!     let state = tester
//!         .apply("k8s_integreatly_org_grafana_v1alpha1", None, json!({
//!             "metadata": {"name": "grafana-1", "namespace": "monitoring"}
//!         }))
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(state["kind"], "Grafana");
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{json, Map, Value};

use crate::error::ProviderError;
use crate::schema::{
    Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, ProviderSchema, Schema,
    ValueValidator,
};
use crate::server::ProviderService;
use crate::types::PlanResult;

/// A test harness for provider implementations.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Configure the provider, failing on error diagnostics.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Validate a resource configuration, failing on error diagnostics.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, config.clone(), config)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), config.clone(), config)
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Plan and apply a configuration, then read the result back.
    ///
    /// Without prior state this creates the resource, otherwise it updates it.
    pub async fn apply(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let state = match prior_state {
            None => {
                let plan = self.plan_create(resource_type, config).await?;
                self.create(resource_type, plan.planned_state).await?
            },
            Some(prior) => {
                let plan = self
                    .plan_update(resource_type, prior.clone(), config)
                    .await?;
                self.update(resource_type, prior, plan.planned_state).await?
            },
        };
        self.read(resource_type, state).await
    }

    /// Plan and apply a deletion.
    pub async fn destroy(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let plan = self
            .plan_delete(resource_type, current_state.clone())
            .await?;
        debug_assert!(plan.planned_state.is_null());
        self.delete(resource_type, current_state).await
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  {}", diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Sample configurations
// =========================================================================

/// A configuration that sets every configurable attribute of a schema.
#[derive(Debug, Clone)]
pub struct SampleConfig {
    /// The configuration document.
    pub config: Value,
    /// Every string and number placed in the configuration, map keys included.
    pub scalars: Vec<String>,
    /// Number of boolean attributes set (all of them to `true`).
    pub flags: usize,
}

struct SampleBuilder {
    counter: u32,
    scalars: Vec<String>,
    flags: usize,
}

impl SampleBuilder {
    fn next(&mut self) -> u32 {
        self.counter += 1;
        self.counter
    }

    fn block(&mut self, block: &Block) -> Value {
        let mut object = Map::new();

        let mut names: Vec<_> = block.attributes.keys().collect();
        names.sort();
        for name in names {
            let attr = &block.attributes[name];
            if attr.flags.required || attr.flags.optional {
                object.insert(name.clone(), self.attribute(attr));
            }
        }

        let mut names: Vec<_> = block.blocks.keys().collect();
        names.sort();
        for name in names {
            let nested = &block.blocks[name];
            let value = self.block(&nested.block);
            let value = match nested.nesting_mode {
                BlockNestingMode::Single => value,
                BlockNestingMode::List => Value::Array(vec![value]),
            };
            object.insert(name.clone(), value);
        }

        Value::Object(object)
    }

    fn attribute(&mut self, attr: &Attribute) -> Value {
        let allowed = attr.validators.iter().find_map(|v| match v {
            ValueValidator::OneOf(values) => values.first().cloned(),
            _ => None,
        });
        if let Some(value) = allowed {
            self.scalars.push(value.clone());
            return Value::String(value);
        }
        self.value(&attr.attr_type)
    }

    fn value(&mut self, attr_type: &AttributeType) -> Value {
        match attr_type {
            AttributeType::String => {
                let value = format!("sample-{}", self.next());
                self.scalars.push(value.clone());
                Value::String(value)
            },
            AttributeType::Int64 => {
                let value = self.next();
                self.scalars.push(value.to_string());
                json!(value)
            },
            AttributeType::Float64 => {
                let value = f64::from(self.next()) + 0.5;
                self.scalars.push(value.to_string());
                json!(value)
            },
            AttributeType::Bool => {
                self.flags += 1;
                Value::Bool(true)
            },
            AttributeType::List(element) => Value::Array(vec![self.value(element)]),
            AttributeType::Map(element) => {
                let key = format!("sample-key-{}", self.next());
                self.scalars.push(key.clone());
                let mut map = Map::new();
                map.insert(key, self.value(element));
                Value::Object(map)
            },
        }
    }
}

/// Build a configuration that sets every configurable attribute of `schema`.
///
/// Strings and numbers are unique so each can be found again in the
/// rendered manifest. Attributes restricted to a set of values use the first
/// allowed value; list blocks get one element.
pub fn sample_config(schema: &Schema) -> SampleConfig {
    let mut builder = SampleBuilder {
        counter: 0,
        scalars: Vec::new(),
        flags: 0,
    };
    let config = builder.block(&schema.block);
    SampleConfig {
        config,
        scalars: builder.scalars,
        flags: builder.flags,
    }
}

fn collect_yaml(value: &serde_yaml::Value, scalars: &mut BTreeMap<String, usize>, flags: &mut usize) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                collect_yaml(key, scalars, flags);
                collect_yaml(value, scalars, flags);
            }
        },
        serde_yaml::Value::Sequence(items) => {
            for item in items {
                collect_yaml(item, scalars, flags);
            }
        },
        serde_yaml::Value::String(s) => *scalars.entry(s.clone()).or_default() += 1,
        serde_yaml::Value::Number(n) => *scalars.entry(n.to_string()).or_default() += 1,
        serde_yaml::Value::Bool(true) => *flags += 1,
        serde_yaml::Value::Tagged(tagged) => collect_yaml(&tagged.value, scalars, flags),
        serde_yaml::Value::Bool(false) | serde_yaml::Value::Null => {},
    }
}

/// Assert that every value of a sample configuration appears in `yaml`.
///
/// # Panics
///
/// Panics if the manifest is not valid YAML, a sample value is missing from
/// it, or the number of `true` flags differs.
pub fn assert_sample_rendered(sample: &SampleConfig, yaml: &str) {
    let document: serde_yaml::Value = match serde_yaml::from_str(yaml) {
        Ok(document) => document,
        Err(e) => panic!("Rendered manifest is not valid YAML: {}", e),
    };

    let mut scalars = BTreeMap::new();
    let mut flags = 0;
    collect_yaml(&document, &mut scalars, &mut flags);

    let missing: Vec<_> = sample
        .scalars
        .iter()
        .filter(|value| !scalars.contains_key(*value))
        .collect();
    assert!(
        missing.is_empty(),
        "Expected every configured value in the manifest, missing: {:?}",
        missing
    );
    assert_eq!(
        flags, sample.flags,
        "Expected {} boolean(s) set in the manifest, found {}",
        sample.flags, flags
    );
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan result indicates the resource will be created.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(!plan.requires_replace, "Expected plan to create, not replace");
}

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan requires resource replacement.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// Assert that a plan does not require resource replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes.iter().any(|c| c.path == path),
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();
    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors
            .iter()
            .map(|d| (&d.summary, &d.attribute))
            .collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain an error for the given attribute path.
///
/// # Panics
///
/// Panics if no error diagnostic points at `path`.
pub fn assert_error_at(diagnostics: &[Diagnostic], path: &str) {
    assert!(
        diagnostics
            .iter()
            .any(|d| d.is_error() && d.attribute.as_deref() == Some(path)),
        "Expected an error at '{}', got errors at: {:?}",
        path,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.attribute)
            .collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::CrdProvider;

    const GRAFANA: &str = "k8s_integreatly_org_grafana_v1alpha1";

    fn tester() -> ProviderTester<CrdProvider> {
        ProviderTester::new(CrdProvider::with_all_resources())
    }

    fn config() -> Value {
        json!({
            "metadata": {"name": "grafana-1", "namespace": "monitoring"},
            "spec": {"base_image": "grafana/grafana"}
        })
    }

    #[tokio::test]
    async fn test_every_attribute_reaches_the_manifest() {
        let tester = tester();
        let schema = tester.schema();
        assert!(!schema.resources.is_empty());

        for (resource_type, resource_schema) in &schema.resources {
            let sample = sample_config(resource_schema);
            tester
                .validate_resource_config(resource_type, sample.config.clone())
                .await
                .unwrap_or_else(|e| panic!("{}: {}", resource_type, e));

            let state = tester
                .apply(resource_type, None, sample.config.clone())
                .await
                .unwrap();
            assert_sample_rendered(&sample, state["yaml"].as_str().unwrap());
        }
    }

    #[test]
    fn test_sample_config() {
        let schema = Schema::v0()
            .with_attribute("id", Attribute::computed_int64())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("policy", Attribute::optional_string().one_of(["Always", "Never"]))
            .with_attribute("enabled", Attribute::optional_bool())
            .with_attribute("labels", Attribute::optional_string_map())
            .with_block(
                "ports",
                crate::schema::NestedBlock::list(
                    Block::new().with_attribute("port", Attribute::required_int64()),
                ),
            );

        let sample = sample_config(&schema);
        assert!(sample.config.get("id").is_none());
        assert_eq!(sample.config["policy"], "Always");
        assert_eq!(sample.config["enabled"], true);
        assert_eq!(sample.config["ports"].as_array().unwrap().len(), 1);
        assert_eq!(sample.flags, 1);
        assert_eq!(
            sample.scalars,
            vec!["sample-key-1", "sample-2", "sample-3", "Always", "4"]
        );
    }

    #[test]
    #[should_panic(expected = "missing")]
    fn test_assert_sample_rendered_detects_dropped_values() {
        let sample = SampleConfig {
            config: json!({"a": "sample-1", "b": "sample-2"}),
            scalars: vec!["sample-1".to_string(), "sample-2".to_string()],
            flags: 0,
        };
        assert_sample_rendered(&sample, "a: sample-1\n");
    }

    #[tokio::test]
    async fn test_apply_create_and_update() {
        let tester = tester();
        tester.configure(json!({})).await.unwrap();

        let created = tester.apply(GRAFANA, None, config()).await.unwrap();
        assert_eq!(created["kind"], "Grafana");

        let mut changed = config();
        changed["spec"]["base_image"] = json!("grafana/grafana:10.0.0");
        let updated = tester
            .apply(GRAFANA, Some(created.clone()), changed)
            .await
            .unwrap();
        assert!(updated["id"].as_i64() > created["id"].as_i64());
        assert!(updated["yaml"]
            .as_str()
            .unwrap()
            .contains("baseImage: grafana/grafana:10.0.0"));

        tester.destroy(GRAFANA, updated).await.unwrap();
    }

    #[tokio::test]
    async fn test_plan_assertions() {
        let tester = tester();
        let plan = tester.plan_create(GRAFANA, config()).await.unwrap();
        assert_plan_creates(&plan);
        assert_plan_changes_attribute(&plan, "spec.base_image");

        let state = tester.create(GRAFANA, plan.planned_state).await.unwrap();
        assert_plan_no_changes(&tester.plan_update(GRAFANA, state.clone(), state.clone()).await.unwrap());

        let mut renamed = state.clone();
        renamed["metadata"]["name"] = json!("grafana-2");
        assert_plan_replaces(&tester.plan_update(GRAFANA, state.clone(), renamed).await.unwrap());

        let mut relabelled = state.clone();
        relabelled["metadata"]["labels"] = json!({"team": "sre"});
        let plan = tester.plan_update(GRAFANA, state, relabelled).await.unwrap();
        assert_plan_updates_in_place(&plan);
        assert_plan_changes_attribute(&plan, "metadata.labels.team");
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let tester = tester();
        let err = tester
            .validate_resource_config(
                GRAFANA,
                json!({
                    "metadata": {
                        "name": "grafana-1",
                        "namespace": "monitoring",
                        "labels": {"-bad": "x"}
                    },
                    "spec": {"service": {"service_type": "Internal"}}
                }),
            )
            .await
            .unwrap_err();

        let TestError::Diagnostics(diagnostics) = err else {
            panic!("expected diagnostics, got {}", err);
        };
        assert_error_at(&diagnostics, "metadata.labels.-bad");
        assert_error_at(&diagnostics, "spec.service.service_type");
    }

    #[test]
    fn test_assert_no_errors() {
        assert_no_errors(&[Diagnostic::warning("Just a warning")]);
    }

    #[test]
    #[should_panic(expected = "Expected no errors")]
    fn test_assert_no_errors_fails() {
        assert_no_errors(&[Diagnostic::error("An error")]);
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("First error").with_attribute("metadata.name"),
            Diagnostic::error("Second error").with_detail("More info"),
        ]);

        let display = err.to_string();
        assert!(display.contains("First error"));
        assert!(display.contains("Second error"));
        assert!(display.contains("metadata.name"));
        assert!(display.contains("More info"));
    }
}
