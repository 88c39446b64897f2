//! Error handling utilities for the perspectiv core.
//!
//! This module provides the central error type `AppError` which represents all
//! possible error conditions surfaced by the caches, the outbox, and the remote
//! API gateway, as well as the convenience type alias `AppResult` for functions
//! that can return these errors. Malformed persisted JSON is not an error:
//! the caches read it as missing.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Represents failures of the durable key-value store.
///
/// # Examples
///
/// ```
/// use perspectiv::errors::StorageError;
/// use std::io::{self, ErrorKind};
///
/// let error = StorageError::Io {
///     key: "perspectiv.outbox".to_string(),
///     source: io::Error::new(ErrorKind::PermissionDenied, "permission denied"),
/// };
///
/// assert!(format!("{}", error).contains("perspectiv.outbox"));
/// assert!(format!("{}", error).contains("permission denied"));
/// ```
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the value for a key failed.
    #[error("Storage I/O failed for key '{key}': {source}. Please check that the data directory is writable.")]
    Io {
        /// The key being read or written
        key: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A value could not be serialized before being written.
    #[error("Failed to serialize value for key '{key}': {source}")]
    Serialize {
        /// The key being written
        key: String,
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },
}

/// Represents errors that can occur when locking the data directory.
///
/// # Examples
///
/// ```
/// use perspectiv::errors::LockError;
/// use std::path::PathBuf;
///
/// let error = LockError::StoreBusy {
///     path: PathBuf::from("/data/.perspectiv.lock"),
/// };
///
/// assert!(format!("{}", error).contains("in use by another process"));
/// ```
#[derive(Debug, Error)]
pub enum LockError {
    /// Error when the data directory is already locked by another process.
    #[error("Data directory is in use by another process: {path}. Please wait for the other perspectiv process to finish.")]
    StoreBusy {
        /// The path to the lock file
        path: PathBuf,
    },

    /// Error when acquiring the lock fails for a technical reason.
    #[error("Failed to acquire lock {path}: {source}. Please check directory permissions.")]
    AcquisitionFailed {
        /// The path to the lock file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Errors raised by the remote API gateway.
///
/// Every variant is retryable from the outbox's point of view; the status code is
/// exposed for callers that want to distinguish failures.
///
/// # Examples
///
/// ```
/// use perspectiv::errors::ApiError;
///
/// let error = ApiError::Status {
///     status: 422,
///     message: "rating out of range".to_string(),
///     code: None,
/// };
/// assert_eq!(error.status(), Some(422));
/// assert!(format!("{}", error).contains("rating out of range"));
/// ```
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("API request failed with status {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Message taken from the response body when available
        message: String,
        /// Machine-readable error code when available
        code: Option<String>,
    },

    /// The server could not be reached.
    #[error("API unreachable: {0}. Check your network connection.")]
    Network(#[source] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("Invalid response from API: {0}")]
    InvalidResponse(String),

    /// Requests are failing fast after an HTML routing error.
    #[error("Routing backoff active after an HTML response; retry shortly")]
    RoutingBackoff,
}

impl ApiError {
    /// Returns the HTTP-like status code for this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::RoutingBackoff => Some(503),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            ApiError::InvalidResponse(_) => None,
        }
    }

    /// Returns the machine-readable error code, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Status { code, .. } => code.as_deref(),
            ApiError::RoutingBackoff => Some(crate::constants::ROUTING_BACKOFF_CODE),
            _ => None,
        }
    }
}

/// Represents all possible errors that can occur in the perspectiv core.
///
/// This enum is the central error type used across the crate, with variants
/// for different error categories. It uses `thiserror` for deriving the `Error`
/// trait implementation and formatted error messages.
///
/// # Examples
///
/// ```
/// use perspectiv::errors::AppError;
///
/// let error = AppError::Validation("rating must be between 1 and 5".to_string());
/// assert_eq!(format!("{}", error), "Validation error: rating must be between 1 and 5");
/// ```
#[derive(Debug, Error)]
pub enum AppError {
    /// Errors related to configuration loading or validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input/output errors from filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input rejected before it reached local state or the network.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Errors from the durable key-value store.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Errors related to locking the data directory.
    #[error("Locking error: {0}")]
    Lock(#[from] LockError),

    /// Errors from the remote API gateway.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// An online-only operation was requested without a token.
    #[error("Not signed in. Set PERSPECTIV_TOKEN to reach the backend.")]
    NotAuthenticated,
}

impl AppError {
    /// Whether the backend rejected the request's credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::Api(e) if e.status() == Some(401))
    }
}

/// A type alias for `Result<T, AppError>` to simplify function signatures.
pub type AppResult<T> = Result<T, AppError>;
