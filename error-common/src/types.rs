use thiserror::Error;

/// Process-level error for binaries and startup code
#[derive(Error, Debug)]
pub enum EhrError {
    /// Network communication errors (bind, accept)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server runtime errors
    #[error("Server error: {0}")]
    ServerError(String),

    /// Database connection or migration errors
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Wrapped external errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for process-level operations
pub type Result<T> = std::result::Result<T, EhrError>;

/// Log an error with the context it happened in
pub fn log_error(context: &str, error: &EhrError) {
    tracing::error!(
        context = context,
        error = %error,
        "EHR engine error occurred"
    );
}
