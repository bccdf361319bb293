//! Rule engine client for Rode.
//!
//! Loads Rego policies into an OPA-compatible engine and evaluates them
//! against an input document (the resolved occurrence set of a resource).
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `RODE_OPA_URL` | Engine base URL (default: `http://localhost:8181`) |
//! | `RODE_OPA_EXPLAIN` | Request `explain=full` traces |
//! | `RODE_OPA_TIMEOUT` | Request timeout in seconds (default: 30) |

pub mod client;
pub mod engine;
pub mod error;
pub mod types;

pub use client::{OpaClient, OPA_USER_AGENT};
pub use engine::PolicyEngine;
pub use error::{OpaError, OpaResult};
pub use types::{EvaluatePolicyResponse, EvaluationResult, OpaConfig, Violation};
