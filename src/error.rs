//! Custom error types for deployer-backup
//!
//! This module defines the error hierarchy for the backup engine using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for deployer-backup operations
#[derive(Error, Debug)]
pub enum DeployerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for data models
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Duplicate entity errors
    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: &'static str,
        identifier: String,
    },

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Export errors (query or serialization failure)
    #[error("Export error: {0}")]
    Export(String),

    /// The backup document could not be decoded
    #[error("invalid backup data: {0}")]
    MalformedEnvelope(String),

    /// The backup was produced by a different module
    #[error("backup module mismatch: expected {expected}, got {found}")]
    ModuleMismatch { expected: String, found: String },

    /// The backup uses an unsupported format version
    #[error("backup version mismatch: expected {expected}, got {found}")]
    VersionMismatch { expected: String, found: String },

    /// The caller is not allowed to perform the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl DeployerError {
    /// Create a "not found" error for an entity kind
    pub fn not_found(entity_type: &'static str, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            identifier: identifier.into(),
        }
    }

    /// Create a "duplicate" error for an entity kind
    pub fn duplicate(entity_type: &'static str, identifier: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type,
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error rejects an import before any record is touched
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::MalformedEnvelope(_)
                | Self::ModuleMismatch { .. }
                | Self::VersionMismatch { .. }
                | Self::Forbidden(_)
        )
    }
}

impl From<std::io::Error> for DeployerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DeployerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for deployer-backup operations
pub type DeployerResult<T> = Result<T, DeployerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DeployerError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_not_found_error() {
        let err = DeployerError::not_found("DeploymentTarget", "tgt-1234abcd");
        assert_eq!(err.to_string(), "DeploymentTarget not found: tgt-1234abcd");
        assert!(err.is_not_found());
        assert!(!err.is_structural());
    }

    #[test]
    fn test_mismatch_messages() {
        let err = DeployerError::ModuleMismatch {
            expected: "deployer".into(),
            found: "lcm".into(),
        };
        assert_eq!(
            err.to_string(),
            "backup module mismatch: expected deployer, got lcm"
        );

        let err = DeployerError::VersionMismatch {
            expected: "1.0".into(),
            found: "2.0".into(),
        };
        assert_eq!(
            err.to_string(),
            "backup version mismatch: expected 1.0, got 2.0"
        );
    }

    #[test]
    fn test_structural_errors() {
        assert!(DeployerError::MalformedEnvelope("eof".into()).is_structural());
        assert!(DeployerError::Forbidden("no".into()).is_structural());
        assert!(!DeployerError::Storage("disk full".into()).is_structural());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DeployerError = io_err.into();
        assert!(matches!(err, DeployerError::Io(_)));
    }
}
