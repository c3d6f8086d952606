//! Error types for the provider.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Errors that can occur while serving a resource operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The configuration did not match the resource's native structure.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A JSON serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The manifest could not be rendered as YAML.
    #[error("Could not generate YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The prior state's id is already the largest representable id.
    #[error("Resource id {0} cannot be advanced")]
    IdExhausted(i64),

    /// Invalid request from client.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Get the error message as a string.
    ///
    /// Returns a reference to the error message for any variant.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::Yaml(_err) => "YAML error (see Debug output)",
            Self::IdExhausted(_) => "resource id cannot be advanced",
            Self::InvalidRequest(msg) => msg,
        }
    }

    /// Convert the error into the single diagnostic reported to the host.
    ///
    /// # Examples
    ///
    /// ```
    /// use k8s_crd_provider::ProviderError;
    ///
    /// let err = ProviderError::UnknownResource("k8s_example".to_string());
    /// let diagnostic = err.to_diagnostic();
    /// assert_eq!(diagnostic.summary, "Unknown resource type: k8s_example");
    /// ```
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Yaml(err) => Diagnostic::error("Could not generate YAML").with_detail(format!(
                "An unexpected error occurred while marshalling the manifest. Error: {}",
                err
            )),
            Self::Validation(msg) => {
                Diagnostic::error("Invalid resource configuration").with_detail(msg.clone())
            },
            other => Diagnostic::error(other.to_string()),
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::Yaml(err) => {
                tonic::Status::internal(format!("Could not generate YAML: {}", err))
            },
            ProviderError::IdExhausted(id) => {
                tonic::Status::failed_precondition(format!("Resource id {} cannot be advanced", id))
            },
            ProviderError::InvalidRequest(msg) => tonic::Status::invalid_argument(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DiagnosticSeverity;

    fn yaml_error() -> serde_yaml::Error {
        serde_yaml::from_str::<i64>("not a number").unwrap_err()
    }

    #[test]
    fn test_error_display() {
        let err = ProviderError::Validation("invalid input".to_string());
        assert_eq!(format!("{}", err), "Validation error: invalid input");

        let err = ProviderError::UnknownResource("custom_resource".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: custom_resource");

        let err = ProviderError::Yaml(yaml_error());
        assert!(format!("{}", err).starts_with("Could not generate YAML: "));
    }

    #[test]
    fn test_error_to_status() {
        let err = ProviderError::Validation("test".to_string());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let err = ProviderError::Configuration("test".to_string());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let err = ProviderError::UnknownResource("test".to_string());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let err = ProviderError::Yaml(yaml_error());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::Internal);

        let err = ProviderError::IdExhausted(i64::MAX);
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);
    }

    #[test]
    fn test_yaml_error_diagnostic() {
        let diagnostic = ProviderError::Yaml(yaml_error()).to_diagnostic();
        assert_eq!(diagnostic.severity, DiagnosticSeverity::Error);
        assert_eq!(diagnostic.summary, "Could not generate YAML");
        assert!(diagnostic
            .detail
            .as_deref()
            .is_some_and(|d| d.contains("marshalling the manifest")));
    }

    #[test]
    fn test_validation_error_diagnostic() {
        let diagnostic =
            ProviderError::Validation("unknown field `bogus`".to_string()).to_diagnostic();
        assert_eq!(diagnostic.summary, "Invalid resource configuration");
        assert_eq!(diagnostic.detail.as_deref(), Some("unknown field `bogus`"));
    }

    #[test]
    fn test_message_method() {
        let err = ProviderError::Configuration("invalid config".to_string());
        assert_eq!(err.message(), "invalid config");

        let err = ProviderError::InvalidRequest("bad request".to_string());
        assert_eq!(err.message(), "bad request");
    }
}
