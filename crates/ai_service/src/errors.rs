//! Inference service error types

use coach_ai_core::AiCoreError;
use thiserror::Error;

/// Inference service errors
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The request cannot be turned into a feature vector
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The bundle could not be loaded at startup
    #[error("Model bundle unavailable: {0}")]
    BundleUnavailable(String),

    /// The classifier failed on an assembled vector
    #[error("Model error: {0}")]
    Model(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl ServiceError {
    /// Whether the caller is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServiceError::InvalidInput(_))
    }
}

impl From<toml::de::Error> for ServiceError {
    fn from(err: toml::de::Error) -> Self {
        ServiceError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Io(err.to_string())
    }
}

impl From<AiCoreError> for ServiceError {
    fn from(err: AiCoreError) -> Self {
        match err {
            AiCoreError::ArtifactNotFound(_)
            | AiCoreError::BundleMismatch(_)
            | AiCoreError::IntegrityFailed { .. } => {
                ServiceError::BundleUnavailable(err.to_string())
            }
            other => ServiceError::Model(other.to_string()),
        }
    }
}
