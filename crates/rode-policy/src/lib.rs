//! Rego policy parsing and validation for Rode.
//!
//! A Rode policy is a Rego module that defines:
//!
//! - a `pass` rule, the overall verdict
//! - a `violations` partial set whose members are bound to `result` and carry
//!   `pass`, `id`, `name` and `message`
//!
//! ```
//! use rode_policy::validate_policy;
//!
//! let result = validate_policy("package p\nallow { true }\n");
//! assert!(!result.compile);
//! assert_eq!(result.errors.len(), 2);
//! ```

pub mod ast;
mod compile;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod validate;

pub use compile::compile_errors;
pub use error::{Location, ParseError, ParseResult};
pub use parser::{parse_module, MAX_NESTING_DEPTH};
pub use validate::{
    contract_errors, package_path, validate_policy, ValidationResult, INVALID_VIOLATIONS_SHAPE,
    MISSING_PASS_RULE, MISSING_VIOLATIONS_RULE, REQUIRED_VIOLATION_FIELDS,
};
