//! Error types for searchsync.

use std::fmt;

/// Classification of a failed call to the search engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportErrorKind {
    /// The request did not complete within its timeout.
    Timeout,
    /// The engine could not be reached (connection refused, DNS, TLS).
    Connect,
    /// The engine answered with a non-2xx status.
    Status(u16),
    /// The request could not be built or its body could not be read.
    Request,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Timeout => write!(f, "timeout"),
            TransportErrorKind::Connect => write!(f, "connect"),
            TransportErrorKind::Status(code) => write!(f, "HTTP {code}"),
            TransportErrorKind::Request => write!(f, "request"),
        }
    }
}

/// A failed call to the search engine transport.
///
/// Always surfaced to the caller; the reindex scheduler relies on it to tell
/// "batch failed, retry" apart from "batch succeeded".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} error calling {url}: {message}")]
pub struct TransportError {
    /// What went wrong
    pub kind: TransportErrorKind,
    /// Target URL of the failed call
    pub url: String,
    /// Human-readable detail (response body excerpt, client error text)
    pub message: String,
}

impl TransportError {
    /// Creates a transport error of the given kind.
    pub fn new<U, M>(kind: TransportErrorKind, url: U, message: M) -> Self
    where
        U: Into<String>,
        M: Into<String>,
    {
        Self {
            kind,
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout<U: Into<String>>(url: U) -> Self {
        Self::new(TransportErrorKind::Timeout, url, "request timed out")
    }

    /// Creates an error for a non-2xx response.
    pub fn status<U, M>(status: u16, url: U, body: M) -> Self
    where
        U: Into<String>,
        M: Into<String>,
    {
        Self::new(TransportErrorKind::Status(status), url, body)
    }

    /// Returns the HTTP status if the engine answered.
    pub fn status_code(&self) -> Option<u16> {
        match self.kind {
            TransportErrorKind::Status(code) => Some(code),
            _ => None,
        }
    }
}

/// Errors that can occur while synchronizing the search index.
///
/// All error variants are marked with `#[non_exhaustive]` to allow
/// adding new error types without breaking changes.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Network or HTTP failure talking to the search engine.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A record or field cannot be mapped to an index document.
    #[error("Schema error for {class}#{key}: {message}")]
    Schema {
        /// Record class of the offending record
        class: String,
        /// Primary key of the offending record
        key: u64,
        /// Field that failed to map, if known
        field: Option<String>,
        /// What went wrong
        message: String,
    },

    /// A variant strategy misbehaved.
    #[error("Variant '{variant}' failed: {message}")]
    VariantExpansion {
        /// Name of the variant strategy
        variant: String,
        /// What went wrong
        message: String,
    },

    /// Persisted reindex job state is unreadable or inconsistent.
    #[error("Job state corrupted for {job}: {message}")]
    JobStateCorruption {
        /// Job identifier (or file name when the id is unreadable)
        job: String,
        /// What is wrong with the state
        message: String,
    },

    /// A job was asked to make a transition its state machine forbids.
    #[error("Invalid job transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// No index definition is registered under this name.
    #[error("Unknown index: {name}")]
    UnknownIndex {
        /// Requested index name
        name: String,
    },

    /// Reindex job not found.
    #[error("Job not found: {id}")]
    JobNotFound {
        /// Job ID that was not found
        id: String,
    },

    /// Input validation error
    #[error("Validation error: {message}")]
    Validation {
        /// Field or aspect that failed validation
        field: Option<String>,
        /// What went wrong
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// I/O error (job state files, fixtures)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience `Result` type alias for searchsync operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns whether this error is retryable.
    ///
    /// Only transient failures qualify. Schema, variant and configuration
    /// errors are deterministic and retrying them cannot succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Io(_) => true,
            Error::Schema { .. } => false,
            Error::VariantExpansion { .. } => false,
            Error::JobStateCorruption { .. } => false,
            Error::InvalidTransition { .. } => false,
            Error::UnknownIndex { .. } => false,
            Error::JobNotFound { .. } => false,
            Error::Validation { .. } => false,
            Error::Config { .. } => false,
            Error::Serialization(_) => false,
        }
    }

    /// Returns `true` if this is a per-document schema error.
    pub fn is_schema(&self) -> bool {
        matches!(self, Error::Schema { .. })
    }

    /// Creates a schema error for a record.
    pub fn schema<C, M>(class: C, key: u64, message: M) -> Self
    where
        C: Into<String>,
        M: Into<String>,
    {
        Error::Schema {
            class: class.into(),
            key,
            field: None,
            message: message.into(),
        }
    }

    /// Creates a schema error naming the offending field.
    pub fn schema_field<C, F, M>(class: C, key: u64, field: F, message: M) -> Self
    where
        C: Into<String>,
        F: Into<String>,
        M: Into<String>,
    {
        Error::Schema {
            class: class.into(),
            key,
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Creates a variant expansion error.
    pub fn variant<V, M>(variant: V, message: M) -> Self
    where
        V: Into<String>,
        M: Into<String>,
    {
        Error::VariantExpansion {
            variant: variant.into(),
            message: message.into(),
        }
    }

    /// Creates a job state corruption error.
    pub fn corruption<J, M>(job: J, message: M) -> Self
    where
        J: Into<String>,
        M: Into<String>,
    {
        Error::JobStateCorruption {
            job: job.into(),
            message: message.into(),
        }
    }

    /// Creates a new validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Error::Validation {
            field: None,
            message: message.into(),
        }
    }

    /// Creates a new validation error with a field name.
    pub fn validation_field<F, M>(field: F, message: M) -> Self
    where
        F: Into<String>,
        M: Into<String>,
    {
        Error::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates an unknown-index error.
    pub fn unknown_index<S: Into<String>>(name: S) -> Self {
        Error::UnknownIndex { name: name.into() }
    }
}
