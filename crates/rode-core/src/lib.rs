//! Rode policy governance core.
//!
//! Operators declare versioned Rego policies, group them into named gates
//! (policy groups) by assigning specific policy versions, and evaluate a
//! resource against a gate. Each evaluation resolves the resource's build
//! lineage in the artifact metadata store, runs every assigned policy in the
//! rule engine, and records an immutable pass/fail result with per-policy
//! detail.
//!
//! [`RodeServer`] is the entry point: it checks the caller against
//! [`MethodPermissions`] and delegates to the managers.

pub mod assignment;
pub mod authz;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod group;
pub mod indices;
pub mod list;
pub mod policy;
pub mod resource;
pub mod server;
pub mod telemetry;

pub use assignment::{policy_assignment_id, AssignmentScope, PolicyAssignment, PolicyAssignmentManager};
pub use authz::{Authorizer, Caller, Method, MethodPermissions, Permission, Role, RoleAuthorizer};
pub use config::RodeConfig;
pub use error::{Code, RodeError, RodeResult};
pub use evaluation::{
    EvaluatePolicyRequest, EvaluatePolicyResult, EvaluateResourceRequest, EvaluationManager,
    EvaluationSource, ListResourceEvaluationsRequest, PolicyEvaluation, ResourceEvaluation,
    ResourceEvaluationResult,
};
pub use group::{PolicyGroup, PolicyGroupManager};
pub use list::{ListOptions, Page};
pub use policy::{CreatePolicyRequest, Policy, PolicyManager, PolicyVersion, UpdatePolicyRequest};
pub use resource::{
    distinct_resources, ResolvedResource, ResourceIdentity, ResourceType, ResourceUri,
    ResourceVersion, ResourceVersionResolver, UnrecognizedResourceType,
};
pub use server::RodeServer;
