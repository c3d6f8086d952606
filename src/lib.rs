//! Kubernetes CRD provider
//!
//! A provider plugin that manages Kubernetes custom resources as rendered
//! YAML manifests. Each custom resource kind becomes a resource type whose
//! configuration schema mirrors the kind's Go API types; applying a resource
//! renders the manifest and stores it in state under `yaml`.
//!
//! Nothing here talks to a cluster. The host spawns the binary, reads the
//! handshake line and drives the resources over gRPC.
//!
//! # Quick Start
//!
//! ```ignore
//! use k8s_crd_provider::{init_logging, serve, CrdProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!     serve(CrdProvider::with_all_resources()).await
//! }
//! ```
//!
//! # Resource types
//!
//! Resource type names are derived from the kind's API group, kind and
//! version: `integreatly.org/v1alpha1` `Grafana` is served as
//! `k8s_integreatly_org_grafana_v1alpha1`. See [`crds`] for the built-in kinds
//! and [`resource::CustomResource`] for adding more.
//!
//! # Handshake Protocol
//!
//! After binding, [`serve`] prints one line to stdout:
//!
//! ```text
//! K8S_CRD_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `K8S_CRD_PROVIDER|<protocol_version>|<address>`
//!
//! # Provider Protocol
//!
//! - **GetMetadata**: Resource type names and server capabilities
//! - **GetSchema**: Full schema for provider config and every resource type
//! - **ValidateProviderConfig** / **Configure**: The provider takes no settings
//! - **Stop**: Graceful shutdown
//! - **ValidateResourceConfig**: Schema and Kubernetes naming rules
//! - **UpgradeResourceState**: Only schema version 0 exists
//! - **Plan**: Attribute diff, replacement on name or namespace change
//! - **Create/Read/Update/Delete**: Render, return, re-render, forget

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod crds;
pub mod error;
pub mod k8s;
pub mod logging;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::CrdProvider;
pub use resource::{CrdResource, CustomResource, ResourceHandler};
pub use schema::ProviderSchema;
pub use server::{serve, serve_with_options, ProviderService, ServeOptions};
pub use types::{
    AttributeChange, PlanResult, ProviderMetadata, ServerCapabilities, HANDSHAKE_PREFIX,
    PROTOCOL_VERSION,
};
pub use validation::{is_valid, validate, validate_result};

pub use async_trait::async_trait;

pub use serde_json;
pub use tonic;
pub use tracing;
