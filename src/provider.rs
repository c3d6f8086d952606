//! The provider: a registry of custom resource kinds served over the protocol.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ProviderError;
use crate::resource::{CrdResource, CustomResource, ResourceHandler};
use crate::schema::{Diagnostic, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::PlanResult;
use crate::validation;

/// Provider serving every registered custom resource kind.
///
/// ```
/// use k8s_crd_provider::crds::grafana::Grafana;
/// use k8s_crd_provider::CrdProvider;
///
/// let provider = CrdProvider::new().with_resource::<Grafana>();
/// assert_eq!(provider.resource_types(), vec!["k8s_integreatly_org_grafana_v1alpha1"]);
/// ```
#[derive(Default)]
pub struct CrdProvider {
    resources: BTreeMap<String, Box<dyn ResourceHandler>>,
}

impl CrdProvider {
    /// A provider with no resource kinds.
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider with every kind in [`crate::crds`].
    pub fn with_all_resources() -> Self {
        let mut provider = Self::new();
        crate::crds::register_all(&mut provider);
        provider
    }

    /// Register a custom resource kind.
    pub fn register<R: CustomResource>(&mut self) {
        self.register_handler(Box::new(CrdResource::<R>::new()));
    }

    /// Register a custom resource kind, builder style.
    pub fn with_resource<R: CustomResource>(mut self) -> Self {
        self.register::<R>();
        self
    }

    /// Register a resource handler under its resource type name.
    pub fn register_handler(&mut self, handler: Box<dyn ResourceHandler>) {
        let resource_type = handler.resource_type();
        if self.resources.insert(resource_type.clone(), handler).is_some() {
            warn!(resource_type = %resource_type, "Resource type registered twice, keeping the last");
        }
    }

    /// Names of the registered resource types, sorted.
    pub fn resource_types(&self) -> Vec<String> {
        self.resources.keys().cloned().collect()
    }

    fn handler(&self, resource_type: &str) -> Result<&dyn ResourceHandler, ProviderError> {
        self.resources
            .get(resource_type)
            .map(|handler| &**handler)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }
}

#[async_trait::async_trait]
impl ProviderService for CrdProvider {
    fn schema(&self) -> ProviderSchema {
        self.resources
            .iter()
            .fold(ProviderSchema::new(), |schema, (name, handler)| {
                schema.with_resource(name.clone(), handler.schema())
            })
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validation::validate(&Schema::v0(), &config))
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        validation::validate_result(&Schema::v0(), &config).map_err(|diagnostics| {
            ProviderError::Configuration(
                diagnostics
                    .into_iter()
                    .map(|d| d.summary)
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;
        info!(resources = self.resources.len(), "Provider configured");
        Ok(vec![])
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(self.handler(resource_type)?.validate(&config))
    }

    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let current = self.handler(resource_type)?.schema().version;
        if version < 0 || version as u64 > current {
            return Err(ProviderError::Validation(format!(
                "cannot upgrade {} state from schema version {} (current version is {})",
                resource_type, version, current
            )));
        }
        Ok(state)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let handler = self.handler(resource_type)?;
        if !proposed_state.is_null() {
            let errors: Vec<_> = handler
                .validate(&config)
                .into_iter()
                .filter(Diagnostic::is_error)
                .collect();
            if let Some(first) = errors.first() {
                let detail = first.detail.clone().unwrap_or_default();
                return Err(ProviderError::Validation(
                    format!("{} {}", first.summary, detail).trim().to_string(),
                ));
            }
        }
        handler.plan(prior_state.as_ref(), &proposed_state)
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        self.handler(resource_type)?.create(&planned_state)
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        debug!(resource_type, "Reading resource state");
        self.handler(resource_type)?.read(current_state)
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.handler(resource_type)?
            .update(&prior_state, &planned_state)
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        self.handler(resource_type)?.delete(&current_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crds::grafana::Grafana;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    const GRAFANA: &str = "k8s_integreatly_org_grafana_v1alpha1";

    fn config() -> Value {
        json!({
            "metadata": {"name": "grafana-1", "namespace": "monitoring"},
            "spec": {"base_image": "grafana/grafana"}
        })
    }

    #[test]
    fn test_registry() {
        let provider = CrdProvider::with_all_resources();
        assert_eq!(provider.resource_types(), vec![GRAFANA.to_string()]);
        assert!(provider.handler(GRAFANA).is_ok());
        assert!(matches!(
            provider.handler("k8s_nope"),
            Err(ProviderError::UnknownResource(_))
        ));

        let schema = provider.schema();
        assert!(schema.resources.contains_key(GRAFANA));
        assert!(schema.provider.block.attributes.is_empty());
        assert_eq!(provider.metadata().resources, vec![GRAFANA.to_string()]);
    }

    #[test]
    fn test_register_twice() {
        let mut provider = CrdProvider::new();
        provider.register::<Grafana>();
        provider.register::<Grafana>();
        assert_eq!(provider.resource_types().len(), 1);
    }

    #[tokio::test]
    async fn test_configure() {
        let provider = CrdProvider::with_all_resources();
        assert!(assert_ok!(provider.configure(Value::Null).await).is_empty());
        assert!(assert_ok!(provider.configure(json!({})).await).is_empty());

        let err = assert_err!(provider.configure(json!({"kubeconfig": "~/.kube/config"})).await);
        assert!(matches!(err, ProviderError::Configuration(_)));

        let diagnostics = assert_ok!(
            provider
                .validate_provider_config(json!({"kubeconfig": "~/.kube/config"}))
                .await
        );
        assert_eq!(diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let provider = CrdProvider::with_all_resources();
        let err = assert_err!(provider.create("k8s_nope", config()).await);
        assert_eq!(err.to_string(), "Unknown resource type: k8s_nope");
        assert_err!(provider.read("k8s_nope", Value::Null).await);
        assert_err!(provider.delete("k8s_nope", Value::Null).await);
    }

    #[tokio::test]
    async fn test_plan_validates_config() {
        let provider = CrdProvider::with_all_resources();
        let bad = json!({"metadata": {"name": "grafana-1", "namespace": "Monitoring"}});

        let err = assert_err!(provider.plan(GRAFANA, None, bad.clone(), bad).await);
        assert!(matches!(err, ProviderError::Validation(_)));

        let plan = assert_ok!(provider.plan(GRAFANA, None, config(), config()).await);
        assert!(!plan.changes.is_empty());
    }

    #[tokio::test]
    async fn test_upgrade_resource_state() {
        let provider = CrdProvider::with_all_resources();
        let state = json!({"id": 1});
        assert_eq!(
            assert_ok!(provider.upgrade_resource_state(GRAFANA, 0, state.clone()).await),
            state
        );
        assert_err!(provider.upgrade_resource_state(GRAFANA, 3, state).await);
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let provider = CrdProvider::with_all_resources();

        let created = assert_ok!(provider.create(GRAFANA, config()).await);
        let read = assert_ok!(provider.read(GRAFANA, created.clone()).await);
        assert_eq!(read, created);

        let updated = assert_ok!(provider.update(GRAFANA, created.clone(), config()).await);
        assert!(updated["id"].as_i64() > created["id"].as_i64());

        assert_ok!(provider.delete(GRAFANA, updated).await);
        assert_eq!(assert_ok!(provider.read(GRAFANA, Value::Null).await), Value::Null);
    }
}
