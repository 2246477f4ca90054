//! Error types for caskd.
//!
//! Two families, matching how failures propagate:
//!
//! - [`WebError`]: request-level failures. These are converted to 4xx/5xx
//!   responses at the dispatch boundary and never unwind past it.
//! - [`ConfigError`]: startup failures. These abort initialization before the
//!   server accepts any traffic.
//!
//! # Example
//!
//! ```rust
//! use caskd_core::WebError;
//! use http::StatusCode;
//!
//! let err = WebError::invalid_ref("Invalid blobref");
//! assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
//! ```

use http::StatusCode;
use thiserror::Error;

/// Result type alias using [`WebError`].
pub type WebResult<T> = Result<T, WebError>;

/// Request-level error, mapped to an HTTP status at the boundary.
#[derive(Debug, Error)]
pub enum WebError {
    /// A content reference in the request failed validation.
    #[error("{message}")]
    InvalidRef {
        /// Short human-readable message sent to the client.
        message: String,
    },

    /// No route or resource matched the request.
    #[error("{message}")]
    NotFound {
        /// Short human-readable message sent to the client.
        message: String,
    },

    /// A required storage dependency is not configured.
    #[error("{message}")]
    StorageUnavailable {
        /// Short human-readable message sent to the client.
        message: String,
    },

    /// Internal failure while producing the response.
    #[error("{message}")]
    Internal {
        /// Short human-readable message sent to the client.
        message: String,
        /// The underlying error, kept server-side.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl WebError {
    /// Creates an invalid-reference error.
    #[must_use]
    pub fn invalid_ref(message: impl Into<String>) -> Self {
        Self::InvalidRef {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a missing-storage error.
    #[must_use]
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error wrapping its cause.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRef { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::StorageUnavailable { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Fatal configuration error detected at startup.
///
/// Any of these prevents the web front-end from being mounted; none of them
/// is ever surfaced as an HTTP response.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The web handler requires a root handler to exist.
    #[error("no root handler configured, which is necessary for the web handler")]
    MissingRootHandler,

    /// The configured asset root is unusable.
    #[error("invalid asset root {root:?}: {reason}")]
    InvalidAssetRoot {
        /// The configured root hint.
        root: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A publish root in the configuration has no usable definition.
    #[error("publish root {prefix:?} is invalid: {reason}")]
    InvalidPublishRoot {
        /// The configured prefix.
        prefix: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No source of UI files (embedded or on disk) is available.
    #[error("no UI files available: {0}")]
    MissingUiFiles(String),

    /// Catch-all for malformed configuration values.
    #[error("{0}")]
    Invalid(String),

    /// Filesystem inspection during validation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_ref_is_bad_request() {
        let err = WebError::invalid_ref("Invalid blobref");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid blobref");
    }

    #[test]
    fn test_not_found_is_404() {
        let err = WebError::not_found("Illegal URL.");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_missing_storage_is_500() {
        let err = WebError::storage_unavailable("No BlobRoot configured");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("BlobRoot"));
    }

    #[test]
    fn test_internal_keeps_source_out_of_message() {
        let err = WebError::internal_with_source(
            "Server error",
            std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"),
        );
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Server error");
    }

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::InvalidAssetRoot {
            root: "/tmp/nope".to_string(),
            reason: "not a directory".to_string(),
        };
        assert!(err.to_string().contains("/tmp/nope"));
        assert!(err.to_string().contains("not a directory"));

        assert!(ConfigError::MissingRootHandler
            .to_string()
            .contains("root handler"));
    }
}
