//! Error types for lifecycle operations.
//!
//! Provider errors are categorized so the reconciler knows which ones are
//! worth retrying. Anything that survives the retry budget, or is permanent
//! to begin with, surfaces as a [`ReconcileError`].

use std::fmt;
use tablespec::InvariantError;
use thiserror::Error;

/// Provider operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// CreateTable
    Create,
    /// UpdateTable
    Update,
    /// DeleteTable
    Delete,
    /// DescribeTable
    Describe,
    /// ListTables
    List,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "CreateTable",
            Operation::Update => "UpdateTable",
            Operation::Delete => "DeleteTable",
            Operation::Describe => "DescribeTable",
            Operation::List => "ListTables",
        };
        f.write_str(name)
    }
}

/// Categories of provider errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network or throttling, worth retrying
    Transient,
    /// Will fail the same way again
    Permanent,
}

impl ErrorCategory {
    /// Whether this error category is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// Errors reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Request rate exceeded
    #[error("throttled: {message}")]
    Throttled {
        /// Provider message
        message: String,
    },

    /// Control plane unreachable or timed out
    #[error("service unavailable: {message}")]
    Unavailable {
        /// Provider message
        message: String,
    },

    /// A table with this name already exists
    #[error("table '{name}' already exists")]
    NameConflict {
        /// Conflicting name
        name: String,
    },

    /// Account limits reached
    #[error("quota exceeded: {message}")]
    QuotaExceeded {
        /// Provider message
        message: String,
    },

    /// Request refused as invalid
    #[error("request rejected: {message}")]
    Rejected {
        /// Provider message
        message: String,
    },

    /// Table does not exist
    #[error("table '{name}' not found")]
    NotFound {
        /// Missing table name
        name: String,
    },
}

impl ProviderError {
    /// Get the error category for retry logic.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProviderError::Throttled { .. } | ProviderError::Unavailable { .. } => {
                ErrorCategory::Transient
            }
            _ => ErrorCategory::Permanent,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether this is a not-found response.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }
}

/// Errors that abort a reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// Provider refused the request, or transient failures used up the retry budget
    #[error("{operation} failed for table '{name}' after {attempts} attempt(s): {response}")]
    Permanent {
        /// Operation that failed
        operation: Operation,
        /// Table the operation targeted
        name: String,
        /// Attempts made
        attempts: u32,
        /// Last provider response
        response: ProviderError,
    },

    /// Another reconciliation holds this name
    #[error("reconciliation already in progress for table '{name}'")]
    ConcurrentReconcileInProgress {
        /// Locked name
        name: String,
    },

    /// Cancelled by the caller
    #[error("cancelled during {operation} (request sent: {request_sent})")]
    Cancelled {
        /// Operation that was pending
        operation: Operation,
        /// Whether a request had already reached the provider
        request_sent: bool,
    },

    /// Table never reported ACTIVE
    #[error("table '{name}' did not become active after {polls} polls")]
    ActivationTimeout {
        /// Table name
        name: String,
        /// Polls made
        polls: u32,
    },

    /// Desired spec breaks an invariant; nothing was sent to the provider
    #[error("table '{name}' is inconsistent: {source}")]
    InvalidSpec {
        /// Table name
        name: String,
        /// Violated rule
        source: InvariantError,
    },

    /// A replace deleted the old table, then failed to create the new one
    #[error("table '{deleted}' was deleted but its replacement failed: {source}")]
    PartialReplace {
        /// Table the provider confirmed deleted
        deleted: String,
        /// Failure while creating the replacement
        source: Box<ReconcileError>,
    },
}

impl ReconcileError {
    /// Last provider response, if the error came from the provider.
    pub fn provider_response(&self) -> Option<&ProviderError> {
        match self {
            ReconcileError::Permanent { response, .. } => Some(response),
            ReconcileError::PartialReplace { source, .. } => source.provider_response(),
            _ => None,
        }
    }

    /// Table the provider confirmed deleted before the cycle failed, if any.
    ///
    /// Callers should drop their record of it.
    pub fn deleted_table(&self) -> Option<&str> {
        match self {
            ReconcileError::PartialReplace { deleted, .. } => Some(deleted),
            _ => None,
        }
    }
}

/// Result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;
