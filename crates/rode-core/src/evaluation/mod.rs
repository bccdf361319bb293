//! Evaluating resources against policy groups.

mod manager;
pub mod types;

pub use manager::EvaluationManager;
pub use types::{
    EvaluatePolicyRequest, EvaluatePolicyResult, EvaluateResourceRequest, EvaluationSource,
    ListResourceEvaluationsRequest, PolicyEvaluation, ResourceEvaluation,
    ResourceEvaluationResult,
};
