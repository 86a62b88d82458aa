//! Error handling module for the gallery admin core.
//!
//! Provides a single error type shared by the store, the remote client and the
//! batch processor, with stable error codes for reporting.

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const CONFLICT: &str = "VERSION_MISMATCH";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const TRANSPORT_ERROR: &str = "TRANSPORT_ERROR";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const PUBLISH_IN_PROGRESS: &str = "PUBLISH_IN_PROGRESS";
    pub const IMAGE_ERROR: &str = "IMAGE_ERROR";
    pub const IO_ERROR: &str = "IO_ERROR";
}

/// Application error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Record id or remote path does not exist
    NotFound(String),
    /// Remote version tag did not match (optimistic concurrency)
    Conflict(String),
    /// Credential missing or rejected by the remote store
    Unauthorized(String),
    /// Network failure or unexpected remote status
    Transport(String),
    /// Input that cannot be defaulted
    Validation(String),
    /// A publish was requested while another one is outstanding
    PublishInProgress,
    /// Image decode or encode failure
    Image(String),
    /// Local filesystem failure
    Io(String),
}

impl AppError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Conflict(_) => codes::CONFLICT,
            AppError::Unauthorized(_) => codes::UNAUTHORIZED,
            AppError::Transport(_) => codes::TRANSPORT_ERROR,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::PublishInProgress => codes::PUBLISH_IN_PROGRESS,
            AppError::Image(_) => codes::IMAGE_ERROR,
            AppError::Io(_) => codes::IO_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::NotFound(msg) => msg.clone(),
            AppError::Conflict(msg) => msg.clone(),
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::Transport(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::PublishInProgress => "A publish is already in progress".to_string(),
            AppError::Image(msg) => msg.clone(),
            AppError::Io(msg) => msg.clone(),
        }
    }

    /// True for the remote "file is absent" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("Transport error: {:?}", err);
        AppError::Transport(format!("Transport error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Validation(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("IO error: {:?}", err);
        AppError::Io(format!("IO error: {}", err))
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        tracing::error!("Image error: {:?}", err);
        AppError::Image(format!("Image error: {}", err))
    }
}

/// Convenience alias used across the crate.
pub type AppResult<T> = Result<T, AppError>;
