//! Error types for the restaurant content service

use thiserror::Error;

/// Result type alias for content operations
pub type Result<T> = std::result::Result<T, ContentError>;

/// Error types that can occur while serving content
#[derive(Error, Debug, Clone)]
pub enum ContentError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid module ID: {0}")]
    InvalidModuleId(String),

    #[error("Invalid query parameters: {0}")]
    InvalidQuery(String),

    #[error("Failed to load content manifest: {0}")]
    ManifestLoadError(String),

    #[error("Content manifest not found: {0}")]
    ManifestNotFound(String),

    #[error("Version mismatch: requested {requested}, available {available}")]
    VersionMismatch { requested: String, available: String },

    #[error("Module {0} not found in manifest")]
    ModuleNotFound(String),

    #[error("Module too large: {actual_size} bytes exceeds {max_size}")]
    ResponseTooLarge { max_size: usize, actual_size: usize },

    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Rate limit store error: {0}")]
    RateLimitStoreError(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for ContentError {
    fn from(err: std::io::Error) -> Self {
        ContentError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ContentError {
    fn from(err: serde_json::Error) -> Self {
        ContentError::ParseError(err.to_string())
    }
}

impl From<http::Error> for ContentError {
    fn from(err: http::Error) -> Self {
        ContentError::InternalError(format!("Failed to build response: {}", err))
    }
}

impl ContentError {
    /// Convert error to HTTP status code
    ///
    /// Client mistakes map to 4xx; anything the client cannot fix by changing
    /// the request becomes a 500.
    pub fn to_http_status(&self) -> u16 {
        match self {
            ContentError::InvalidModuleId(_) => 400,
            ContentError::InvalidQuery(_) => 400,
            ContentError::ParseError(_) => 400,
            ContentError::ManifestNotFound(_) => 404,
            ContentError::ModuleNotFound(_) => 404,
            ContentError::FileNotFound(_) => 404,
            ContentError::VersionMismatch { .. } => 409,
            ContentError::ResponseTooLarge { .. } => 413,
            ContentError::RateLimited { .. } => 429,

            ContentError::ConfigError(_) => 500,
            ContentError::ManifestLoadError(_) => 500,
            ContentError::RateLimitStoreError(_) => 500,
            ContentError::IoError(_) => 500,
            ContentError::CacheError(_) => 500,
            ContentError::InternalError(_) => 500,
        }
    }

    /// Create a VersionMismatch error
    pub fn version_mismatch(requested: impl Into<String>, available: impl Into<String>) -> Self {
        ContentError::VersionMismatch {
            requested: requested.into(),
            available: available.into(),
        }
    }
}
