//! Status-coded errors for every Rode operation.

use std::fmt;

use tracing::error;

/// Status taxonomy surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    FailedPrecondition,
    PermissionDenied,
    Internal,
}

impl Code {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::FailedPrecondition => "FAILED_PRECONDITION",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RodeError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    FailedPrecondition(String),

    #[error("{0}")]
    PermissionDenied(String),

    /// The policy failed validation; `errors` keeps every message.
    #[error("failed to compile the provided policy: {}", .errors.join("; "))]
    InvalidPolicy { errors: Vec<String> },

    /// A downstream call failed.
    #[error("{operation}: {source}")]
    Internal {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RodeError {
    pub fn code(&self) -> Code {
        match self {
            Self::InvalidArgument(_) | Self::InvalidPolicy { .. } => Code::InvalidArgument,
            Self::NotFound(_) => Code::NotFound,
            Self::AlreadyExists(_) => Code::AlreadyExists,
            Self::FailedPrecondition(_) => Code::FailedPrecondition,
            Self::PermissionDenied(_) => Code::PermissionDenied,
            Self::Internal { .. } => Code::Internal,
        }
    }

    /// Wrap a downstream failure, logging it with its operation first.
    pub fn internal(
        operation: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        let operation = operation.into();
        let source = source.into();
        error!(operation = %operation, error = %source, "downstream call failed");
        Self::Internal { operation, source }
    }
}

impl RodeError {
    /// Store failures caused by the caller's paging input are their fault;
    /// everything else is internal.
    pub(crate) fn from_store(operation: &str, err: rode_store::StoreError) -> Self {
        match err {
            rode_store::StoreError::InvalidPageToken { .. }
            | rode_store::StoreError::InvalidFilter { .. } => {
                Self::InvalidArgument(format!("{}: {}", operation, err))
            }
            other => Self::internal(operation, other),
        }
    }
}

/// Result type for Rode operations.
pub type RodeResult<T> = Result<T, RodeError>;

/// Converts downstream errors into [`RodeError::Internal`].
pub(crate) trait InternalExt<T> {
    fn internal(self, operation: &str) -> RodeResult<T>;
}

impl<T, E> InternalExt<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn internal(self, operation: &str) -> RodeResult<T> {
        self.map_err(|e| RodeError::internal(operation, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_policy_is_invalid_argument() {
        let err = RodeError::InvalidPolicy {
            errors: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.code(), Code::InvalidArgument);
        assert_eq!(err.to_string(), "failed to compile the provided policy: a; b");
    }

    #[test]
    fn test_internal_keeps_source() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::other("connection reset"));
        let err = result.internal("listing occurrences").unwrap_err();
        assert_eq!(err.code(), Code::Internal);
        assert_eq!(err.to_string(), "listing occurrences: connection reset");
        assert!(std::error::Error::source(&err).is_some());
    }
}
