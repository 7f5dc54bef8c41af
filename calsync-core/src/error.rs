//! Error types for the calsync engine.

use thiserror::Error;

/// Errors that can occur during a sync run or a quick-add.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not logged in to the upstream calendar")]
    NotLoggedIn,

    #[error("Upstream fetch failed: {0}")]
    UpstreamFetch(String),

    #[error("Remote store rejected credentials (HTTP {0})")]
    Unauthorized(u16),

    #[error("Upload failed with HTTP {status}: {body}")]
    UploadFailed { status: u16, body: String },

    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("Parsing service is not configured: {0}")]
    ParseServiceNotConfigured(String),

    #[error("Unsupported parsing service provider: {0}")]
    UnsupportedProvider(String),

    #[error("Parsing service request failed with HTTP {0}")]
    ParseServiceHttp(u16),

    #[error("Parsing service returned an unusable response: {0}")]
    ParseServiceInvalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for calsync operations.
pub type SyncResult<T> = Result<T, SyncError>;
