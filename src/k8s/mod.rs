//! Kubernetes building blocks shared by all custom resource kinds.

pub mod core;
pub mod meta;
pub mod object;
pub mod validators;

pub use meta::{metadata_block, ObjectMeta};
pub use object::{FieldSchema, ObjectSchema};
