//! Error types shared by every provider crate.
//!
//! [`ClientError`] is what a `CloudClient` backend reports. [`ProviderError`]
//! is what the lifecycle controller and the query engine return to their
//! callers; transport failures are passed through it unclassified.

use std::fmt;
use std::time::Duration;

use crate::kind::ResourceKind;

/// Errors reported by a cloud API backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The remote object does not exist (HTTP 404).
    #[error("Remote object not found: {kind}/{id}")]
    NotFound {
        /// Kind of the missing object.
        kind: ResourceKind,
        /// Identifier of the missing object.
        id: String,
    },

    /// The remote API refused the request (4xx other than 404).
    #[error("Request rejected: {message}")]
    Rejected {
        /// Reason given by the API.
        message: String,
    },

    /// Connection reset, timeout or 5xx response.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The backend does not implement the requested capability.
    #[error("Unsupported operation: {operation}")]
    Unsupported {
        /// Name of the missing capability.
        operation: String,
    },
}

impl ClientError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Creates a new `Rejected` error.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Creates a new `Transport` error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a new `Unsupported` error.
    #[must_use]
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Returns `true` if the remote object is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Rejected { .. } => ErrorCategory::Validation,
            Self::Transport { .. } => ErrorCategory::Infrastructure,
            Self::Unsupported { .. } => ErrorCategory::Infrastructure,
        }
    }
}

/// Errors returned by reconciliation and query operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// A descriptor or filter is malformed. Never retried.
    #[error("Validation failed: {message}")]
    ValidationFailed {
        /// What was wrong with the input.
        message: String,
    },

    /// The remote object is absent on a direct read.
    #[error("Resource not found: {kind}/{id}")]
    NotFound {
        /// Kind of the missing resource.
        kind: ResourceKind,
        /// Identifier of the missing resource.
        id: String,
    },

    /// More than one candidate survived filtering.
    #[error(
        "Query returned {count} results, please use a more specific search criteria or set most_recent"
    )]
    AmbiguousResult {
        /// Number of candidates left after filtering.
        count: usize,
    },

    /// No candidate survived filtering.
    #[error("Query returned no results out of {candidates} candidates, please change the search criteria")]
    NoMatch {
        /// Number of candidates before filtering.
        candidates: usize,
    },

    /// The remote create call itself failed.
    #[error("Error creating {kind}: {source}")]
    CreateFailed {
        /// Kind of resource being created.
        kind: ResourceKind,
        /// The underlying client error.
        #[source]
        source: ClientError,
    },

    /// The remote side reported a definite failure status.
    #[error("Operation on {kind}/{id} failed with status {status}: {detail}")]
    OperationFailed {
        /// Kind of the resource.
        kind: ResourceKind,
        /// Identifier of the resource.
        id: String,
        /// The failure status observed.
        status: String,
        /// Human readable detail.
        detail: String,
    },

    /// The deadline elapsed before a terminal status was observed.
    #[error("Timeout after {waited:?} waiting for {kind}/{id} (last status: {last_status})")]
    Timeout {
        /// Kind of the resource.
        kind: ResourceKind,
        /// Identifier of the resource.
        id: String,
        /// Last status observed before giving up.
        last_status: String,
        /// How long the operation waited.
        waited: Duration,
    },

    /// The caller cancelled the operation.
    #[error("Operation on {kind}/{id} was cancelled")]
    Cancelled {
        /// Kind of the resource.
        kind: ResourceKind,
        /// Identifier of the resource.
        id: String,
    },

    /// Unclassified client failure, passed through untouched.
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl ProviderError {
    /// Creates a new `ValidationFailed` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Creates a new `OperationFailed` error.
    #[must_use]
    pub fn operation_failed(
        kind: ResourceKind,
        id: impl Into<String>,
        status: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::OperationFailed {
            kind,
            id: id.into(),
            status: status.into(),
            detail: detail.into(),
        }
    }

    /// Maps a client error from a direct read, turning absence into `NotFound`.
    #[must_use]
    pub fn from_read(err: ClientError) -> Self {
        match err {
            ClientError::NotFound { kind, id } => Self::NotFound { kind, id },
            other => Self::Client(other),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if the operation was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns `true` when re-polling later may still succeed.
    ///
    /// Only a timeout qualifies: the remote operation may complete after the
    /// deadline. Everything else is definite or belongs to the caller.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is_timeout()
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ValidationFailed { .. } => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::AmbiguousResult { .. } | Self::NoMatch { .. } => ErrorCategory::Query,
            Self::CreateFailed { source, .. } => source.category(),
            Self::OperationFailed { .. } => ErrorCategory::Remote,
            Self::Timeout { .. } | Self::Cancelled { .. } => ErrorCategory::Interrupted,
            Self::Client(err) => err.category(),
        }
    }
}

/// Categories of errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Invalid input.
    Validation,
    /// Remote object absent.
    NotFound,
    /// Query produced zero or several matches.
    Query,
    /// Remote side reported a failure.
    Remote,
    /// Deadline or cancellation.
    Interrupted,
    /// Transport or backend problem.
    Infrastructure,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not_found"),
            Self::Query => write!(f, "query"),
            Self::Remote => write!(f, "remote"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::Infrastructure => write!(f, "infrastructure"),
        }
    }
}

/// Type alias for a provider result.
pub type ProviderResult<T> = Result<T, ProviderError>;
