//! Error types for the document store.

use std::fmt;

/// A failed item of a bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemError {
    /// Position of the operation in the request.
    pub position: usize,
    pub id: String,
    pub reason: String,
}

impl fmt::Display for BulkItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.position, self.id, self.reason)
    }
}

/// Document store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document {id} not found in {index}")]
    NotFound { index: String, id: String },

    #[error("document {id} already exists in {index}")]
    AlreadyExists { index: String, id: String },

    #[error("invalid filter: {message}")]
    InvalidFilter { message: String },

    #[error("invalid page token: {token}")]
    InvalidPageToken { token: String },

    /// At least one bulk item failed; nothing was written.
    #[error("bulk request failed: {}", format_items(.errors))]
    Bulk { errors: Vec<BulkItemError> },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_items(errors: &[BulkItemError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for document store operations.
pub type StoreResult<T> = Result<T, StoreError>;
