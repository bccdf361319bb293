//! Wire and domain types for the rule engine protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of a policy's `violations` set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub link: String,

    #[serde(default)]
    pub pass: bool,
}

/// The `result` document produced by a Rode policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    #[serde(default)]
    pub pass: bool,

    #[serde(default)]
    pub violations: Vec<Violation>,
}

/// Outcome of evaluating one policy against an input document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluatePolicyResponse {
    /// Absent results are normalized to a failing evaluation.
    #[serde(default)]
    pub result: EvaluationResult,

    /// Trace returned when the engine runs with `explain=full`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Vec<Value>>,
}

impl EvaluatePolicyResponse {
    pub fn pass(&self) -> bool {
        self.result.pass
    }
}

/// Raw body of `POST /v1/data/{path}`.
#[derive(Debug, Deserialize)]
pub(crate) struct DataResponse {
    #[serde(default)]
    pub result: Option<EvaluationResult>,

    #[serde(default)]
    pub explanation: Option<Vec<Value>>,
}

impl From<DataResponse> for EvaluatePolicyResponse {
    fn from(raw: DataResponse) -> Self {
        Self {
            result: raw.result.unwrap_or_default(),
            explanation: raw.explanation,
        }
    }
}

/// Rule engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpaConfig {
    /// Base URL of the engine's REST API.
    #[serde(default = "default_opa_url")]
    pub url: String,

    /// Request a full evaluation trace.
    #[serde(default)]
    pub explain: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_opa_url() -> String {
    "http://localhost:8181".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for OpaConfig {
    fn default() -> Self {
        Self {
            url: default_opa_url(),
            explain: false,
            timeout_secs: default_timeout(),
        }
    }
}

impl OpaConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `RODE_OPA_URL` | Engine base URL |
    /// | `RODE_OPA_EXPLAIN` | Return evaluation traces (`1`/`true`) |
    /// | `RODE_OPA_TIMEOUT` | Request timeout in seconds |
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("RODE_OPA_URL").unwrap_or_else(|_| default_opa_url()),
            explain: std::env::var("RODE_OPA_EXPLAIN")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            timeout_secs: std::env::var("RODE_OPA_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }
}
