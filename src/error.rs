//! Error types for the asset-cache crate

use thiserror::Error;

/// Result type for asset-cache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cache and origin operations
#[derive(Debug, Error)]
pub enum Error {
    /// No destination is configured for the requested asset name
    #[error("No destination configured for asset: {0}")]
    UnknownAsset(String),

    /// The origin responded with a non-success status
    #[error("Origin returned {status} for {url}: {message}")]
    OriginStatus {
        /// The origin URL that was fetched
        url: String,
        /// The HTTP status code the origin returned
        status: u16,
        /// The origin's response body text
        message: String,
    },

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// A stored payload did not match the expected blob layout
    #[error("Malformed cached payload: {0}")]
    MalformedPayload(String),

    /// Encoded payload text was not valid base64
    #[error("Base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    /// The cache store rejected or failed an operation
    #[error("Cache store error: {0}")]
    Store(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a malformed payload error
    pub fn malformed_payload(reason: impl Into<String>) -> Self {
        Self::MalformedPayload(reason.into())
    }

    /// Create a cache store error
    pub fn store(reason: impl Into<String>) -> Self {
        Self::Store(reason.into())
    }

    /// HTTP status code this error maps to at the serving boundary.
    ///
    /// Origin failures carry the origin's own status through; everything
    /// else that can escape the lookup chain is a gateway-side problem.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::UnknownAsset(_) => 404,
            Self::OriginStatus { status, .. } => *status,
            Self::Http(e) => e.status().map_or(502, |s| s.as_u16()),
            Self::MalformedPayload(_) | Self::Decode(_) | Self::Store(_) | Self::Json(_) => 502,
        }
    }
}
