//! Error types for Rego parsing.

use std::fmt;

/// Position of a token in the policy source (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub row: usize,
    pub col: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

/// Syntax errors raised while lexing or parsing a module.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// A character that cannot start any token.
    #[error("{location}: rego_parse_error: unexpected character {found:?}")]
    UnexpectedChar { found: char, location: Location },

    /// A string literal missing its closing quote.
    #[error("{location}: rego_parse_error: unterminated string")]
    UnterminatedString { location: Location },

    /// A token that does not fit the grammar at this position.
    #[error("{location}: rego_parse_error: unexpected {found}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        location: Location,
    },

    /// Source ended in the middle of a construct.
    #[error("rego_parse_error: unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },

    /// Terms or bodies nested past the parser's limit.
    #[error("{location}: rego_parse_error: nesting exceeds maximum depth of {limit}")]
    NestingTooDeep { limit: usize, location: Location },

    /// The module does not start with a package declaration.
    #[error("rego_parse_error: package expected")]
    MissingPackage,
}

impl ParseError {
    pub fn location(&self) -> Option<Location> {
        match self {
            Self::UnexpectedChar { location, .. }
            | Self::UnterminatedString { location }
            | Self::UnexpectedToken { location, .. }
            | Self::NestingTooDeep { location, .. } => Some(*location),
            Self::UnexpectedEof { .. } | Self::MissingPackage => None,
        }
    }
}

/// Result type for parsing.
pub type ParseResult<T> = Result<T, ParseError>;
