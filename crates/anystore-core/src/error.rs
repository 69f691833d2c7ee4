//! Storage error types.
//!
//! Defines [`StorageError`], the single error enum every backend returns, and
//! [`ErrorKind`], a flat classification that looks through context wrapping.
//! Callers compare against kinds (or use [`StorageError::is_iterate_done`])
//! instead of matching on the concrete variant, since backends are free to
//! wrap errors with the operation and path that produced them.
//!
//! # Usage
//!
//! ```
//! use anystore_core::error::{ErrorKind, StorageError};
//!
//! let err = StorageError::not_found("a/b.txt").with_context("read", "a/b.txt");
//! assert_eq!(err.kind(), ErrorKind::NotFound);
//! assert!(!err.is_iterate_done());
//! ```

use std::fmt;

/// Result alias used across all anystore crates.
pub type Result<T, E = StorageError> = std::result::Result<T, E>;

/// Storage error type.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    // -----------------------------------------------------------------------
    // Caller errors
    // -----------------------------------------------------------------------
    /// A path, pair value or connection string is malformed.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// A pair was not recognized by the operation that received it.
    #[error("Unsupported pair {pair} for operation {operation}")]
    UnsupportedPair {
        /// Name of the operation.
        operation: String,
        /// Name of the pair.
        pair: String,
    },

    // -----------------------------------------------------------------------
    // Capability errors
    // -----------------------------------------------------------------------
    /// The backend does not implement the requested capability.
    #[error("Unsupported operation {operation} on backend {backend}")]
    UnsupportedOperation {
        /// Backend type.
        backend: String,
        /// Capability or operation name.
        operation: String,
    },

    /// No backend is registered for the scheme.
    #[error("Unsupported backend: {scheme}")]
    UnsupportedBackend {
        /// Scheme of the requested backend.
        scheme: String,
    },

    // -----------------------------------------------------------------------
    // Object state errors
    // -----------------------------------------------------------------------
    /// The object, directory or upload does not exist.
    #[error("Not found: {resource}")]
    NotFound {
        /// What was looked up.
        resource: String,
    },

    /// The object already exists.
    #[error("Already exists: {resource}")]
    AlreadyExists {
        /// What collided.
        resource: String,
    },

    /// The operation is not valid in the object's current state.
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the state violation.
        message: String,
    },

    /// The write would grow an object past the backend's maximum size.
    #[error("Capacity exceeded: requested {requested} bytes, limit {limit}")]
    CapacityExceeded {
        /// Size the object would reach.
        requested: u64,
        /// Backend limit.
        limit: u64,
    },

    // -----------------------------------------------------------------------
    // Control flow
    // -----------------------------------------------------------------------
    /// Normal end of an iterator.
    #[error("iterate is done")]
    IterateDone,

    /// A caller-supplied deadline elapsed before the operation finished.
    #[error("Deadline exceeded after {transferred} bytes")]
    Timeout {
        /// Bytes copied before the deadline fired.
        transferred: u64,
    },

    // -----------------------------------------------------------------------
    // Pass-through errors
    // -----------------------------------------------------------------------
    /// An I/O error from the backend medium or a caller stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),

    /// Another error annotated with the operation and path that produced it.
    #[error("{op} {path}: {source}")]
    Object {
        /// Operation name, e.g. `"read"`.
        op: &'static str,
        /// Path the operation was applied to.
        path: String,
        /// Underlying error.
        #[source]
        source: Box<StorageError>,
    },
}

/// Flat classification of a [`StorageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`StorageError::InvalidArgument`].
    InvalidArgument,
    /// See [`StorageError::UnsupportedPair`].
    UnsupportedPair,
    /// See [`StorageError::UnsupportedOperation`].
    UnsupportedOperation,
    /// See [`StorageError::UnsupportedBackend`].
    UnsupportedBackend,
    /// See [`StorageError::NotFound`].
    NotFound,
    /// See [`StorageError::AlreadyExists`].
    AlreadyExists,
    /// See [`StorageError::InvalidState`].
    InvalidState,
    /// See [`StorageError::CapacityExceeded`].
    CapacityExceeded,
    /// See [`StorageError::IterateDone`].
    IterateDone,
    /// See [`StorageError::Timeout`].
    Timeout,
    /// See [`StorageError::Io`].
    Io,
    /// See [`StorageError::Internal`].
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl StorageError {
    /// Shorthand for [`StorageError::InvalidArgument`].
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Shorthand for [`StorageError::InvalidState`].
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Shorthand for [`StorageError::NotFound`].
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Shorthand for [`StorageError::UnsupportedOperation`].
    #[must_use]
    pub fn unsupported_operation(backend: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            backend: backend.into(),
            operation: operation.into(),
        }
    }

    /// Wrap this error with the operation and path that produced it.
    ///
    /// `IterateDone` is never wrapped so iterator loops can keep matching on it
    /// directly.
    #[must_use]
    pub fn with_context(self, op: &'static str, path: impl Into<String>) -> Self {
        match self {
            Self::IterateDone => Self::IterateDone,
            other => Self::Object {
                op,
                path: path.into(),
                source: Box::new(other),
            },
        }
    }

    /// Return the innermost error, skipping context wrappers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Object { source, .. } => source.root(),
            other => other,
        }
    }

    /// Classify this error, looking through context wrappers.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::UnsupportedPair { .. } => ErrorKind::UnsupportedPair,
            Self::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
            Self::UnsupportedBackend { .. } => ErrorKind::UnsupportedBackend,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::IterateDone => ErrorKind::IterateDone,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Io(_) => ErrorKind::Io,
            Self::Internal(_) | Self::Object { .. } => ErrorKind::Internal,
        }
    }

    /// Whether this error is the end-of-iteration sentinel.
    #[must_use]
    pub fn is_iterate_done(&self) -> bool {
        self.kind() == ErrorKind::IterateDone
    }

    /// Map a native I/O error onto the storage taxonomy.
    #[must_use]
    pub fn from_io(err: std::io::Error, resource: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(resource),
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists {
                resource: resource.to_owned(),
            },
            _ => Self::Io(err),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
