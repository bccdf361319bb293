//! Filter expression language used by list operations.
//!
//! ```text
//! expr     := or
//! or       := and ("||" and)*
//! and      := unary ("&&" unary)*
//! unary    := "!" unary | "(" expr ")" | test
//! test     := operand (cmp operand)? | path "." func "(" string ")"
//! cmp      := "==" | "!=" | "<" | "<=" | ">" | ">="
//! func     := "startsWith" | "contains"
//! operand  := path | string | number | true | false | null
//! ```
//!
//! Fields are dotted paths into the document source. Strings that both
//! parse as RFC 3339 timestamps are ordered chronologically.

pub(crate) mod eval;
mod lexer;
mod parser;

use std::fmt;

use serde_json::Value;

pub use eval::compare_values;

use crate::error::StoreError;

/// Syntax error in a filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterError {
    pub message: String,
    /// Byte offset into the filter text.
    pub position: usize,
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at position {}", self.message, self.position)
    }
}

impl std::error::Error for FilterError {}

impl From<FilterError> for StoreError {
    fn from(err: FilterError) -> Self {
        StoreError::InvalidFilter {
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    StartsWith,
    Contains,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "startsWith" => Some(Self::StartsWith),
            "contains" => Some(Self::Contains),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Field(Vec<String>),
    Literal(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    Call {
        field: Vec<String>,
        function: Function,
        argument: String,
    },
    /// A bare field, true when it holds `true`.
    Truthy(Operand),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

/// A parsed filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    expr: Expr,
}

impl Filter {
    pub fn parse(input: &str) -> Result<Self, FilterError> {
        let tokens = lexer::tokenize(input)?;
        let expr = parser::parse(tokens, input.len())?;
        Ok(Self { expr })
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn matches(&self, source: &Value) -> bool {
        self.expr.matches(source)
    }
}

impl From<Expr> for Filter {
    fn from(expr: Expr) -> Self {
        Self { expr }
    }
}

impl std::str::FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
