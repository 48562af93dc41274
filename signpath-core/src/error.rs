//! Error taxonomy surfaced by the progress service.

use thiserror::Error;

use crate::storage;

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Failures returned to the transport layer.
#[derive(Debug, Error)]
pub enum ProgressError {
    /// The operation needed an existing aggregate, account or lesson.
    #[error("not found: {0}")]
    NotFound(String),

    /// A caller-supplied value violates a stated constraint.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Concurrent writers kept colliding after every internal retry.
    #[error("write conflict: {0}")]
    Conflict(String),

    /// The persistence collaborator failed or timed out.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] storage::Error),
}

/// Coarse class used by the transport layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    NotFound,
    BadRequest,
    Internal,
}

impl ProgressError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Map to the transport-facing class.
    #[must_use]
    pub fn failure_class(&self) -> FailureClass {
        match self {
            Self::NotFound(_) => FailureClass::NotFound,
            Self::InvalidArgument(_) => FailureClass::BadRequest,
            Self::Conflict(_) | Self::StoreUnavailable(_) => FailureClass::Internal,
        }
    }

    /// Whether repeating the whole request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::StoreUnavailable(_))
    }
}

impl From<storage::Error> for ProgressError {
    fn from(err: storage::Error) -> Self {
        match err {
            storage::Error::NotFound(key) => Self::NotFound(key),
            conflict @ storage::Error::Conflict { .. } => Self::Conflict(conflict.to_string()),
            other => Self::StoreUnavailable(other),
        }
    }
}
