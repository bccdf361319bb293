//! The evaluation protocol as seen by the rest of Rode.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::OpaResult;
use crate::types::EvaluatePolicyResponse;

/// A rule engine that can hold Rego policies and evaluate them.
#[async_trait]
pub trait PolicyEngine: Send + Sync {
    /// Ensure `rego_content` is loaded under `policy_id`. Idempotent.
    async fn initialize_policy(&self, policy_id: &str, rego_content: &str) -> OpaResult<()>;

    /// Evaluate the policy's `pass`/`violations` contract against `input`.
    async fn evaluate_policy(
        &self,
        rego_content: &str,
        input: &Value,
    ) -> OpaResult<EvaluatePolicyResponse>;
}
