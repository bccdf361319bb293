//! Error types for the rule engine client.

/// Rule engine errors.
///
/// A policy that evaluates to `pass: false` is not an error; these variants
/// only describe failures to talk to the engine.
#[derive(Debug, thiserror::Error)]
pub enum OpaError {
    /// Checking whether the policy is already loaded failed.
    #[error("error checking if policy {policy_id} exists: {message}")]
    PolicyExists { policy_id: String, message: String },

    /// Loading the policy into the engine failed.
    #[error("error publishing policy {policy_id}: {message}")]
    PublishPolicy { policy_id: String, message: String },

    /// Transport failure or unexpected HTTP status.
    #[error("http error: {message}")]
    Http {
        status: Option<u16>,
        message: String,
    },

    /// The engine answered with a body that could not be decoded.
    #[error("bad response from rule engine: {message}")]
    BadResponse { message: String },

    /// The policy source could not be addressed (no parsable package).
    #[error("invalid policy: {message}")]
    InvalidPolicy { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl OpaError {
    /// HTTP status returned by the engine, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OpaError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// Result type for rule engine operations.
pub type OpaResult<T> = Result<T, OpaError>;
