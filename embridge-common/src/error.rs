//! Common error types for embridge

use thiserror::Error;

/// Common result type for embridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the import bridge
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading, template resolution, or config parsing error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The external tool rejected the generated configuration outright
    #[error("Invalid import configuration: {0}")]
    InvalidConfig(String),

    /// The external tool failed to launch or reported an internal error
    #[error("External tool error: {0}")]
    ExternalTool(String),

    /// The tool completed but its output signals the inferred schema is
    /// not trustworthy (warnings in the run log)
    #[error("Schema inference quality error: {0}")]
    InferenceQuality(String),

    /// Internal error (task join failures and similar)
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::Config("no usable template".to_string());
        assert_eq!(err.to_string(), "Configuration error: no usable template");

        let err = Error::InvalidConfig("tool rejected arguments".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid import configuration: tool rejected arguments"
        );

        let err = Error::InferenceQuality("warnings in run log".to_string());
        assert_eq!(
            err.to_string(),
            "Schema inference quality error: warnings in run log"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
