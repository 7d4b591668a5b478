//! Error types for the Coach AI core

use thiserror::Error;

/// Errors that can occur while fitting, assembling or persisting features
#[derive(Error, Debug)]
pub enum AiCoreError {
    /// A transformer was fitted on data it cannot learn from
    #[error("Fit failed: {0}")]
    FitFailed(String),

    /// No registered transformer for the requested column
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Input shape does not match what the model expects
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Invalid model parameters
    #[error("Invalid model parameters: {0}")]
    InvalidParameters(String),

    /// No artifact of the requested kind could be located
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    /// Artifacts of one bundle disagree with each other
    #[error("Bundle mismatch: {0}")]
    BundleMismatch(String),

    /// Persisted content does not match its recorded hash
    #[error("Integrity check failed for {path}: expected {expected}, got {actual}")]
    IntegrityFailed {
        path: String,
        expected: String,
        actual: String,
    },

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Binary artifact encoding error
    #[error("Binary encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, AiCoreError>;
