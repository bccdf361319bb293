//! Policy assignments: which version of which policy a group enforces.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rode_store::{
    filter::{Expr, Function},
    Document, DocumentStore, Filter, Query, SearchRequest, Sort, StoreError,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{InternalExt, RodeError, RodeResult};
use crate::group::PolicyGroupManager;
use crate::indices;
use crate::list::{ListOptions, Page};
use crate::policy::{parse_policy_version_id, PolicyManager};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyAssignment {
    /// `policies/{policyId}/assignments/policy-groups/{policyGroup}`
    pub id: String,
    pub policy_version_id: String,
    pub policy_group: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

pub fn policy_assignment_id(policy_id: &str, policy_group: &str) -> String {
    format!(
        "policies/{}/assignments/policy-groups/{}",
        policy_id, policy_group
    )
}

fn policy_prefix(policy_id: &str) -> String {
    format!("policies/{}/", policy_id)
}

fn id_prefix_query(prefix: String) -> Query {
    Query::Filter(Filter::from(Expr::Call {
        field: vec!["id".to_string()],
        function: Function::StartsWith,
        argument: prefix,
    }))
}

async fn search_all(
    store: &dyn DocumentStore,
    query: Query,
) -> RodeResult<Vec<PolicyAssignment>> {
    let request = SearchRequest::new(query).with_sort(Sort::desc("created"));
    store
        .search(indices::POLICY_ASSIGNMENTS, &request)
        .await
        .internal("error searching policy assignments")?
        .hits
        .iter()
        .map(|doc| doc.deserialize().internal("error decoding policy assignment"))
        .collect()
}

/// Every assignment of any version of `policy_id`.
pub(crate) async fn assignments_for_policy(
    store: &dyn DocumentStore,
    policy_id: &str,
) -> RodeResult<Vec<PolicyAssignment>> {
    search_all(store, id_prefix_query(policy_prefix(policy_id))).await
}

/// Which assignments a list call covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentScope {
    Policy(String),
    PolicyGroup(String),
}

impl AssignmentScope {
    /// Parse `policies/{policyId}` or `policy-groups/{name}`.
    pub fn parse(scope: &str) -> RodeResult<Self> {
        let parsed = if let Some(id) = scope.strip_prefix("policies/") {
            Self::Policy(id.to_string())
        } else if let Some(name) = scope.strip_prefix("policy-groups/") {
            Self::PolicyGroup(name.to_string())
        } else {
            return Err(RodeError::InvalidArgument(format!(
                "invalid assignment scope {:?}: expected policies/{{id}} or policy-groups/{{name}}",
                scope
            )));
        };

        match &parsed {
            Self::Policy(v) | Self::PolicyGroup(v) if v.is_empty() || v.contains('/') => Err(
                RodeError::InvalidArgument(format!("invalid assignment scope {:?}", scope)),
            ),
            _ => Ok(parsed),
        }
    }

    fn query(&self) -> Query {
        match self {
            Self::Policy(id) => id_prefix_query(policy_prefix(id)),
            Self::PolicyGroup(name) => Query::term("policyGroup", name.as_str()),
        }
    }
}

#[derive(Clone)]
pub struct PolicyAssignmentManager {
    store: Arc<dyn DocumentStore>,
    policies: PolicyManager,
    groups: PolicyGroupManager,
}

impl PolicyAssignmentManager {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        policies: PolicyManager,
        groups: PolicyGroupManager,
    ) -> Self {
        Self {
            store,
            policies,
            groups,
        }
    }

    /// Check that the version exists under a live policy and the group is
    /// live. Returns the owning policy id.
    async fn check_references(
        &self,
        policy_version_id: &str,
        policy_group: &str,
    ) -> RodeResult<String> {
        if policy_version_id.is_empty() || policy_group.is_empty() {
            return Err(RodeError::InvalidArgument(
                "policy version id and policy group are required".to_string(),
            ));
        }
        let (policy_id, _) = parse_policy_version_id(policy_version_id).ok_or_else(|| {
            RodeError::InvalidArgument(format!(
                "policy version id {:?} must have the form {{policyId}}.{{version}}",
                policy_version_id
            ))
        })?;

        if self
            .policies
            .get_policy_version(policy_version_id)
            .await?
            .is_none()
        {
            return Err(RodeError::NotFound(format!(
                "policy version {} not found",
                policy_version_id
            )));
        }
        let policy = self
            .policies
            .load_policy(policy_id)
            .await?
            .ok_or_else(|| RodeError::NotFound(format!("policy {} not found", policy_id)))?;
        if policy.deleted {
            return Err(RodeError::FailedPrecondition(format!(
                "policy {} has been deleted",
                policy_id
            )));
        }

        self.groups.get_active_policy_group(policy_group).await?;
        Ok(policy_id.to_string())
    }

    pub async fn create_policy_assignment(
        &self,
        policy_version_id: &str,
        policy_group: &str,
    ) -> RodeResult<PolicyAssignment> {
        let policy_id = self
            .check_references(policy_version_id, policy_group)
            .await?;

        let now = Utc::now();
        let assignment = PolicyAssignment {
            id: policy_assignment_id(&policy_id, policy_group),
            policy_version_id: policy_version_id.to_string(),
            policy_group: policy_group.to_string(),
            created: now,
            updated: now,
        };
        let document = Document::from_serialize(&assignment.id, &assignment)
            .internal("error serializing policy assignment")?;

        match self.store.create(indices::POLICY_ASSIGNMENTS, document).await {
            Ok(()) => {}
            Err(StoreError::AlreadyExists { .. }) => {
                return Err(RodeError::AlreadyExists(format!(
                    "policy {} is already assigned to policy group {}",
                    policy_id, policy_group
                )))
            }
            Err(e) => return Err(RodeError::internal("error creating policy assignment", e)),
        }
        info!(
            assignment_id = %assignment.id,
            policy_version_id,
            policy_group,
            "policy assigned"
        );
        Ok(assignment)
    }

    pub async fn get_policy_assignment(&self, id: &str) -> RodeResult<PolicyAssignment> {
        if id.is_empty() {
            return Err(RodeError::InvalidArgument(
                "policy assignment id is required".to_string(),
            ));
        }
        self.store
            .get(indices::POLICY_ASSIGNMENTS, id)
            .await
            .internal("error fetching policy assignment")?
            .ok_or_else(|| RodeError::NotFound(format!("policy assignment {} not found", id)))?
            .deserialize()
            .internal("error decoding policy assignment")
    }

    /// Point an assignment at another version of the same policy.
    pub async fn update_policy_assignment(
        &self,
        id: &str,
        policy_version_id: &str,
    ) -> RodeResult<PolicyAssignment> {
        let mut assignment = self.get_policy_assignment(id).await?;
        let policy_id = self
            .check_references(policy_version_id, &assignment.policy_group)
            .await?;

        let assigned_policy = parse_policy_version_id(&assignment.policy_version_id)
            .map(|(p, _)| p.to_string())
            .unwrap_or_default();
        if policy_id != assigned_policy {
            return Err(RodeError::InvalidArgument(format!(
                "policy version {} does not belong to policy {}",
                policy_version_id, assigned_policy
            )));
        }

        assignment.policy_version_id = policy_version_id.to_string();
        assignment.updated = Utc::now();
        let document = Document::from_serialize(&assignment.id, &assignment)
            .internal("error serializing policy assignment")?;
        self.store
            .update(indices::POLICY_ASSIGNMENTS, document)
            .await
            .internal("error updating policy assignment")?;
        Ok(assignment)
    }

    pub async fn delete_policy_assignment(&self, id: &str) -> RodeResult<()> {
        if id.is_empty() {
            return Err(RodeError::InvalidArgument(
                "policy assignment id is required".to_string(),
            ));
        }
        match self.store.delete(indices::POLICY_ASSIGNMENTS, id).await {
            Ok(()) => {
                info!(assignment_id = id, "policy assignment deleted");
                Ok(())
            }
            Err(StoreError::NotFound { .. }) => Err(RodeError::NotFound(format!(
                "policy assignment {} not found",
                id
            ))),
            Err(e) => Err(RodeError::internal("error deleting policy assignment", e)),
        }
    }

    /// Assignments under `scope`, newest first.
    pub async fn list_policy_assignments(
        &self,
        scope: &str,
        options: &ListOptions,
    ) -> RodeResult<Page<PolicyAssignment>> {
        let scope = AssignmentScope::parse(scope)?;
        let request = options.search(vec![scope.query()], Sort::desc("created"))?;
        let response = self
            .store
            .search(indices::POLICY_ASSIGNMENTS, &request)
            .await
            .map_err(|e| RodeError::from_store("error searching policy assignments", e))?;

        let items = response
            .hits
            .iter()
            .map(|doc| doc.deserialize().internal("error decoding policy assignment"))
            .collect::<RodeResult<Vec<PolicyAssignment>>>()?;
        Ok(Page {
            items,
            next_page_token: response.next_page_token,
        })
    }

    /// Every assignment of `policy_group`, unpaginated.
    pub(crate) async fn assignments_for_group(
        &self,
        policy_group: &str,
    ) -> RodeResult<Vec<PolicyAssignment>> {
        search_all(
            self.store.as_ref(),
            AssignmentScope::PolicyGroup(policy_group.to_string()).query(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_id() {
        assert_eq!(
            policy_assignment_id("abc", "prod"),
            "policies/abc/assignments/policy-groups/prod"
        );
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!(
            AssignmentScope::parse("policies/abc").unwrap(),
            AssignmentScope::Policy("abc".into())
        );
        assert_eq!(
            AssignmentScope::parse("policy-groups/prod").unwrap(),
            AssignmentScope::PolicyGroup("prod".into())
        );
        assert!(AssignmentScope::parse("groups/prod").is_err());
        assert!(AssignmentScope::parse("policies/").is_err());
        assert!(AssignmentScope::parse("policies/a/b").is_err());
    }
}
