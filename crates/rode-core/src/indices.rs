//! Document store layout.

/// Policies (parent, relation `policy`) and their versions (child, relation
/// `version`).
pub const POLICIES: &str = "rode-policies";
pub const POLICY_GROUPS: &str = "rode-policy-groups";
pub const POLICY_ASSIGNMENTS: &str = "rode-policy-assignments";
/// Resource evaluations (parent, relation `resource`) and policy evaluations
/// (child, relation `policy`).
pub const EVALUATIONS: &str = "rode-evaluations";

pub const JOIN_FIELD: &str = "join";

pub const POLICY_RELATION: &str = "policy";
pub const POLICY_VERSION_RELATION: &str = "version";
pub const RESOURCE_EVALUATION_RELATION: &str = "resource";
pub const POLICY_EVALUATION_RELATION: &str = "policy";
