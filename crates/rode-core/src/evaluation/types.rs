//! Evaluation records. Written once, never updated or deleted.

use chrono::{DateTime, Utc};
use rode_opa::Violation;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resource::ResourceVersion;

/// Who asked for an evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationSource {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub url: String,
}

/// Outcome of evaluating a resource against a policy group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEvaluation {
    pub id: String,
    pub resource_version: ResourceVersion,
    pub policy_group: String,
    /// True only when every child passed.
    pub pass: bool,
    #[serde(default)]
    pub source: EvaluationSource,
    pub created: DateTime<Utc>,
}

/// Outcome of one policy within a resource evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyEvaluation {
    pub id: String,
    pub resource_evaluation_id: String,
    pub policy_version_id: String,
    pub pass: bool,
    #[serde(default)]
    pub violations: Vec<Violation>,
    pub created: DateTime<Utc>,
}

/// A resource evaluation with its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEvaluationResult {
    pub resource_evaluation: ResourceEvaluation,
    pub policy_evaluations: Vec<PolicyEvaluation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResourceRequest {
    pub resource_uri: String,
    pub policy_group: String,
    #[serde(default)]
    pub source: EvaluationSource,
}

/// Ad-hoc evaluation of one policy; `policy_id` may be a version id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatePolicyRequest {
    pub policy_id: String,
    pub resource_uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatePolicyResult {
    pub pass: bool,
    /// The version that was evaluated.
    pub policy_version_id: String,
    pub resource_version: ResourceVersion,
    #[serde(default)]
    pub violations: Vec<Violation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResourceEvaluationsRequest {
    pub resource_uri: String,
    #[serde(default)]
    pub filter: String,
    #[serde(default)]
    pub page_size: usize,
    #[serde(default)]
    pub page_token: String,
}
