//! Catalogue of the custom resource kinds this provider manages.

pub mod grafana;
pub mod grafana_config;

use crate::provider::CrdProvider;

/// Register every kind in the catalogue.
pub fn register_all(provider: &mut CrdProvider) {
    provider.register::<grafana::Grafana>();
}
