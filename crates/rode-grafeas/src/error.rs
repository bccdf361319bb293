//! Error types for the artifact metadata store client.

/// Artifact metadata store errors.
#[derive(Debug, thiserror::Error)]
pub enum GrafeasError {
    /// Transport failure or unexpected HTTP status.
    #[error("http error: {message}")]
    Http {
        status: Option<u16>,
        message: String,
    },

    /// The store answered with a body that could not be decoded.
    #[error("bad response from occurrence store: {message}")]
    BadResponse { message: String },

    /// Invalid request arguments (bad parent, bad URL).
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl GrafeasError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GrafeasError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// Result type for occurrence store operations.
pub type GrafeasResult<T> = Result<T, GrafeasError>;
