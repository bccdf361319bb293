//! Versioned policies.

mod manager;
pub mod types;

pub use manager::PolicyManager;
pub use types::{
    parse_policy_version_id, policy_version_id, CreatePolicyRequest, Policy, PolicyVersion,
    UpdatePolicyRequest,
};
