//! Method-level authorization.
//!
//! Every public operation maps to the permissions it requires through an
//! explicit [`MethodPermissions`] table. The table and an [`Authorizer`] are
//! handed to the service at construction; there is no global registry.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RodeError, RodeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    ResourceEvaluate,
    ResourceEvaluationRead,
    PolicyEvaluate,
    PolicyRead,
    PolicyWrite,
    PolicyDelete,
    PolicyValidate,
    PolicyGroupRead,
    PolicyGroupWrite,
    PolicyGroupDelete,
    PolicyAssignmentRead,
    PolicyAssignmentWrite,
    PolicyAssignmentDelete,
}

impl Permission {
    pub const ALL: [Permission; 13] = [
        Self::ResourceEvaluate,
        Self::ResourceEvaluationRead,
        Self::PolicyEvaluate,
        Self::PolicyRead,
        Self::PolicyWrite,
        Self::PolicyDelete,
        Self::PolicyValidate,
        Self::PolicyGroupRead,
        Self::PolicyGroupWrite,
        Self::PolicyGroupDelete,
        Self::PolicyAssignmentRead,
        Self::PolicyAssignmentWrite,
        Self::PolicyAssignmentDelete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceEvaluate => "resource:evaluate",
            Self::ResourceEvaluationRead => "resource-evaluation:read",
            Self::PolicyEvaluate => "policy:evaluate",
            Self::PolicyRead => "policy:read",
            Self::PolicyWrite => "policy:write",
            Self::PolicyDelete => "policy:delete",
            Self::PolicyValidate => "policy:validate",
            Self::PolicyGroupRead => "policy-group:read",
            Self::PolicyGroupWrite => "policy-group:write",
            Self::PolicyGroupDelete => "policy-group:delete",
            Self::PolicyAssignmentRead => "policy-assignment:read",
            Self::PolicyAssignmentWrite => "policy-assignment:write",
            Self::PolicyAssignmentDelete => "policy-assignment:delete",
        }
    }
}

/// Operations exposed by [`crate::RodeServer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    EvaluateResource,
    GetResourceEvaluation,
    ListResourceEvaluations,
    EvaluatePolicy,
    CreatePolicy,
    GetPolicy,
    ListPolicies,
    UpdatePolicy,
    DeletePolicy,
    ListPolicyVersions,
    ValidatePolicy,
    CreatePolicyGroup,
    GetPolicyGroup,
    ListPolicyGroups,
    UpdatePolicyGroup,
    DeletePolicyGroup,
    CreatePolicyAssignment,
    GetPolicyAssignment,
    UpdatePolicyAssignment,
    DeletePolicyAssignment,
    ListPolicyAssignments,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EvaluateResource => "EvaluateResource",
            Self::GetResourceEvaluation => "GetResourceEvaluation",
            Self::ListResourceEvaluations => "ListResourceEvaluations",
            Self::EvaluatePolicy => "EvaluatePolicy",
            Self::CreatePolicy => "CreatePolicy",
            Self::GetPolicy => "GetPolicy",
            Self::ListPolicies => "ListPolicies",
            Self::UpdatePolicy => "UpdatePolicy",
            Self::DeletePolicy => "DeletePolicy",
            Self::ListPolicyVersions => "ListPolicyVersions",
            Self::ValidatePolicy => "ValidatePolicy",
            Self::CreatePolicyGroup => "CreatePolicyGroup",
            Self::GetPolicyGroup => "GetPolicyGroup",
            Self::ListPolicyGroups => "ListPolicyGroups",
            Self::UpdatePolicyGroup => "UpdatePolicyGroup",
            Self::DeletePolicyGroup => "DeletePolicyGroup",
            Self::CreatePolicyAssignment => "CreatePolicyAssignment",
            Self::GetPolicyAssignment => "GetPolicyAssignment",
            Self::UpdatePolicyAssignment => "UpdatePolicyAssignment",
            Self::DeletePolicyAssignment => "DeletePolicyAssignment",
            Self::ListPolicyAssignments => "ListPolicyAssignments",
        }
    }
}

/// Method to required permissions. Methods absent from the table are denied.
#[derive(Debug, Clone, Default)]
pub struct MethodPermissions {
    table: HashMap<Method, Vec<Permission>>,
}

impl MethodPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, method: Method, permissions: &[Permission]) -> Self {
        self.table.insert(method, permissions.to_vec());
        self
    }

    /// The table for every operation of the service.
    pub fn standard() -> Self {
        use Method as M;
        use Permission as P;

        Self::new()
            .with(M::EvaluateResource, &[P::ResourceEvaluate])
            .with(M::GetResourceEvaluation, &[P::ResourceEvaluationRead])
            .with(M::ListResourceEvaluations, &[P::ResourceEvaluationRead])
            .with(M::EvaluatePolicy, &[P::PolicyEvaluate])
            .with(M::CreatePolicy, &[P::PolicyWrite])
            .with(M::GetPolicy, &[P::PolicyRead])
            .with(M::ListPolicies, &[P::PolicyRead])
            .with(M::UpdatePolicy, &[P::PolicyWrite])
            .with(M::DeletePolicy, &[P::PolicyDelete])
            .with(M::ListPolicyVersions, &[P::PolicyRead])
            .with(M::ValidatePolicy, &[P::PolicyValidate])
            .with(M::CreatePolicyGroup, &[P::PolicyGroupWrite])
            .with(M::GetPolicyGroup, &[P::PolicyGroupRead])
            .with(M::ListPolicyGroups, &[P::PolicyGroupRead])
            .with(M::UpdatePolicyGroup, &[P::PolicyGroupWrite])
            .with(M::DeletePolicyGroup, &[P::PolicyGroupDelete])
            .with(M::CreatePolicyAssignment, &[P::PolicyAssignmentWrite])
            .with(M::GetPolicyAssignment, &[P::PolicyAssignmentRead])
            .with(M::UpdatePolicyAssignment, &[P::PolicyAssignmentWrite])
            .with(M::DeletePolicyAssignment, &[P::PolicyAssignmentDelete])
            .with(M::ListPolicyAssignments, &[P::PolicyAssignmentRead])
    }

    pub fn required(&self, method: Method) -> Option<&[Permission]> {
        self.table.get(&method).map(Vec::as_slice)
    }

    /// PermissionDenied unless `authorizer` grants every required permission.
    pub fn check(
        &self,
        authorizer: &dyn Authorizer,
        caller: &Caller,
        method: Method,
    ) -> RodeResult<()> {
        let allowed = match self.required(method) {
            Some(required) => authorizer.authorize(caller, required),
            None => false,
        };
        if allowed {
            return Ok(());
        }

        warn!(method = method.as_str(), subject = %caller.subject, "permission denied");
        Err(RodeError::PermissionDenied(format!(
            "{} is not allowed to call {}",
            caller.subject,
            method.as_str()
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Anonymous,
    Enforcer,
    ApplicationDeveloper,
    PolicyDeveloper,
    PolicyAdministrator,
    Administrator,
}

/// An authenticated identity and its roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub subject: String,
    pub roles: Vec<Role>,
}

impl Caller {
    pub fn new(subject: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            subject: subject.into(),
            roles,
        }
    }

    pub fn anonymous() -> Self {
        Self::new("anonymous", vec![Role::Anonymous])
    }
}

/// Decides whether a caller holds a set of permissions.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, caller: &Caller, required: &[Permission]) -> bool;
}

/// Grants permissions by role.
#[derive(Debug, Clone, Default)]
pub struct RoleAuthorizer {
    grants: HashMap<Role, HashSet<Permission>>,
}

impl RoleAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, role: Role, permissions: &[Permission]) -> Self {
        self.grants
            .entry(role)
            .or_default()
            .extend(permissions.iter().copied());
        self
    }

    pub fn standard() -> Self {
        use Permission as P;

        let application_developer = [
            P::ResourceEvaluationRead,
            P::PolicyEvaluate,
            P::PolicyRead,
            P::PolicyValidate,
            P::PolicyGroupRead,
            P::PolicyAssignmentRead,
        ];

        Self::new()
            .grant(Role::Anonymous, &[])
            .grant(
                Role::Enforcer,
                &[P::ResourceEvaluate, P::ResourceEvaluationRead, P::PolicyGroupRead],
            )
            .grant(Role::ApplicationDeveloper, &application_developer)
            .grant(Role::PolicyDeveloper, &application_developer)
            .grant(Role::PolicyDeveloper, &[P::PolicyWrite])
            .grant(
                Role::PolicyAdministrator,
                &Permission::ALL
                    .iter()
                    .copied()
                    .filter(|p| *p != P::ResourceEvaluate)
                    .collect::<Vec<_>>(),
            )
            .grant(Role::Administrator, &Permission::ALL)
    }
}

impl Authorizer for RoleAuthorizer {
    fn authorize(&self, caller: &Caller, required: &[Permission]) -> bool {
        required.iter().all(|permission| {
            caller.roles.iter().any(|role| {
                self.grants
                    .get(role)
                    .is_some_and(|granted| granted.contains(permission))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(caller: &Caller, method: Method) -> RodeResult<()> {
        MethodPermissions::standard().check(&RoleAuthorizer::standard(), caller, method)
    }

    #[test]
    fn test_every_method_has_an_entry() {
        let table = MethodPermissions::standard();
        assert_eq!(table.table.len(), 21);
        assert_eq!(
            table.required(Method::DeletePolicy),
            Some(&[Permission::PolicyDelete][..])
        );
    }

    #[test]
    fn test_enforcer_can_evaluate_but_not_write() {
        let caller = Caller::new("ci", vec![Role::Enforcer]);
        assert!(check(&caller, Method::EvaluateResource).is_ok());
        let err = check(&caller, Method::CreatePolicy).unwrap_err();
        assert_eq!(err.code(), crate::Code::PermissionDenied);
    }

    #[test]
    fn test_roles_combine() {
        let caller = Caller::new("dev", vec![Role::Enforcer, Role::PolicyDeveloper]);
        assert!(check(&caller, Method::EvaluateResource).is_ok());
        assert!(check(&caller, Method::UpdatePolicy).is_ok());
        assert!(check(&caller, Method::DeletePolicy).is_err());
    }

    #[test]
    fn test_anonymous_denied() {
        assert!(check(&Caller::anonymous(), Method::GetPolicy).is_err());
    }

    #[test]
    fn test_method_missing_from_table_is_denied() {
        let table = MethodPermissions::new().with(Method::GetPolicy, &[]);
        let admin = Caller::new("root", vec![Role::Administrator]);
        assert!(table
            .check(&RoleAuthorizer::standard(), &admin, Method::GetPolicy)
            .is_ok());
        assert!(table
            .check(&RoleAuthorizer::standard(), &admin, Method::DeletePolicy)
            .is_err());
    }
}
