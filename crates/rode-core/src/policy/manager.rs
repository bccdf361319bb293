//! Policy lifecycle: create, read, list, update, tombstone.

use std::sync::Arc;

use chrono::Utc;
use rode_policy::ValidationResult;
use rode_store::{BulkOperation, Document, DocumentStore, JoinField, Query, Sort};
use tracing::info;
use uuid::Uuid;

use super::types::{
    parse_policy_version_id, policy_version_id, CreatePolicyRequest, Policy, PolicyVersion,
    UpdatePolicyRequest,
};
use crate::assignment::assignments_for_policy;
use crate::error::{InternalExt, RodeError, RodeResult};
use crate::indices;
use crate::list::{ListOptions, Page};

#[derive(Clone)]
pub struct PolicyManager {
    store: Arc<dyn DocumentStore>,
}

fn policy_document(policy: &Policy) -> RodeResult<Document> {
    let mut stored = policy.clone();
    stored.policy = None;
    Ok(Document::from_serialize(&stored.id, &stored)
        .internal("error serializing policy")?
        .with_join(JoinField::parent(
            indices::JOIN_FIELD,
            indices::POLICY_RELATION,
        )))
}

fn version_document(version: &PolicyVersion) -> RodeResult<Document> {
    Ok(Document::from_serialize(&version.id, version)
        .internal("error serializing policy version")?
        .with_join(JoinField::child(
            indices::JOIN_FIELD,
            indices::POLICY_VERSION_RELATION,
            &version.policy_id,
        )))
}

/// Run the validator and turn a failure into a structured status.
fn ensure_valid(rego_content: &str) -> RodeResult<()> {
    let result = rode_policy::validate_policy(rego_content);
    if result.is_valid() {
        Ok(())
    } else {
        Err(RodeError::InvalidPolicy {
            errors: result.errors,
        })
    }
}

impl PolicyManager {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Load a policy document without its version; deleted policies included.
    pub(crate) async fn load_policy(&self, id: &str) -> RodeResult<Option<Policy>> {
        let document = self
            .store
            .get(indices::POLICIES, id)
            .await
            .internal("error fetching policy")?;
        match document {
            Some(doc) if doc.relation() == Some(indices::POLICY_RELATION) => {
                Ok(Some(doc.deserialize().internal("error decoding policy")?))
            }
            _ => Ok(None),
        }
    }

    /// Load one version by `{policyId}.{version}`.
    pub async fn get_policy_version(&self, version_id: &str) -> RodeResult<Option<PolicyVersion>> {
        let document = self
            .store
            .get(indices::POLICIES, version_id)
            .await
            .internal("error fetching policy version")?;
        match document {
            Some(doc) if doc.relation() == Some(indices::POLICY_VERSION_RELATION) => Ok(Some(
                doc.deserialize().internal("error decoding policy version")?,
            )),
            _ => Ok(None),
        }
    }

    pub async fn create_policy(&self, request: CreatePolicyRequest) -> RodeResult<Policy> {
        if request.name.is_empty() {
            return Err(RodeError::InvalidArgument(
                "policy name is required".to_string(),
            ));
        }
        if request.rego_content.is_empty() {
            return Err(RodeError::InvalidArgument(
                "policy rego content is required".to_string(),
            ));
        }
        ensure_valid(&request.rego_content)?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let version = PolicyVersion {
            id: policy_version_id(&id, 1),
            policy_id: id.clone(),
            version: 1,
            rego_content: request.rego_content,
            source_path: request.source_path,
            message: request.message,
            created: now,
        };
        let policy = Policy {
            id: id.clone(),
            name: request.name,
            description: request.description,
            current_version: 1,
            deleted: false,
            created: now,
            updated: now,
            policy: None,
        };

        self.store
            .bulk(
                indices::POLICIES,
                vec![
                    BulkOperation::Create(policy_document(&policy)?),
                    BulkOperation::Create(version_document(&version)?),
                ],
            )
            .await
            .internal("error creating policy")?;
        info!(policy_id = %id, name = %policy.name, "policy created");

        Ok(Policy {
            policy: Some(version),
            ..policy
        })
    }

    /// Accepts a policy id (current version) or a `{policyId}.{version}` id.
    pub async fn get_policy(&self, id: &str) -> RodeResult<Policy> {
        if id.is_empty() {
            return Err(RodeError::InvalidArgument("policy id is required".to_string()));
        }

        let (policy_id, version) = match parse_policy_version_id(id) {
            Some((policy_id, version)) => (policy_id, Some(version)),
            None => (id, None),
        };
        let policy = self
            .load_policy(policy_id)
            .await?
            .ok_or_else(|| RodeError::NotFound(format!("policy {} not found", policy_id)))?;

        let version_id = policy_version_id(policy_id, version.unwrap_or(policy.current_version));
        let version = match self.get_policy_version(&version_id).await? {
            Some(v) => v,
            None if version.is_some() => {
                return Err(RodeError::NotFound(format!(
                    "policy version {} not found",
                    version_id
                )))
            }
            None => {
                return Err(RodeError::internal(
                    "error fetching current policy version",
                    format!("policy {} has no version {}", policy_id, version_id),
                ))
            }
        };

        Ok(Policy {
            policy: Some(version),
            ..policy
        })
    }

    /// Non-deleted policies, newest first.
    pub async fn list_policies(&self, options: &ListOptions) -> RodeResult<Page<Policy>> {
        let request = options.search(
            vec![
                Query::HasRelation(indices::POLICY_RELATION.to_string()),
                Query::term("deleted", false),
            ],
            Sort::desc("created"),
        )?;
        let response = self
            .store
            .search(indices::POLICIES, &request)
            .await
            .map_err(|e| RodeError::from_store("error searching policies", e))?;

        let items = response
            .hits
            .iter()
            .map(|doc| doc.deserialize().internal("error decoding policy"))
            .collect::<RodeResult<Vec<Policy>>>()?;
        Ok(Page {
            items,
            next_page_token: response.next_page_token,
        })
    }

    /// A changed rego body appends a new version; metadata edits do not.
    pub async fn update_policy(&self, id: &str, request: UpdatePolicyRequest) -> RodeResult<Policy> {
        let mut policy = self
            .load_policy(id)
            .await?
            .ok_or_else(|| RodeError::NotFound(format!("policy {} not found", id)))?;
        if policy.deleted {
            return Err(RodeError::FailedPrecondition(format!(
                "policy {} has been deleted",
                id
            )));
        }
        let current_id = policy_version_id(id, policy.current_version);
        let current = self.get_policy_version(&current_id).await?.ok_or_else(|| {
            RodeError::internal(
                "error updating policy",
                format!("policy {} has no version {}", id, current_id),
            )
        })?;

        if let Some(name) = request.name {
            if name.is_empty() {
                return Err(RodeError::InvalidArgument(
                    "policy name cannot be empty".to_string(),
                ));
            }
            policy.name = name;
        }
        if let Some(description) = request.description {
            policy.description = description;
        }

        let mut operations = Vec::new();
        let mut embedded = current.clone();
        if let Some(rego_content) = request.rego_content {
            if rego_content != current.rego_content {
                ensure_valid(&rego_content)?;
                let version = current.version + 1;
                embedded = PolicyVersion {
                    id: policy_version_id(&policy.id, version),
                    policy_id: policy.id.clone(),
                    version,
                    rego_content,
                    source_path: request.source_path.unwrap_or(current.source_path),
                    message: request.message.unwrap_or_default(),
                    created: Utc::now(),
                };
                policy.current_version = version;
                operations.push(BulkOperation::Create(version_document(&embedded)?));
            }
        }

        policy.updated = Utc::now();
        operations.insert(0, BulkOperation::Update(policy_document(&policy)?));
        self.store
            .bulk(indices::POLICIES, operations)
            .await
            .internal("error updating policy")?;
        info!(
            policy_id = %policy.id,
            current_version = policy.current_version,
            "policy updated"
        );

        Ok(Policy {
            policy: Some(embedded),
            ..policy
        })
    }

    /// Tombstone the policy and drop every assignment of its versions.
    pub async fn delete_policy(&self, id: &str) -> RodeResult<()> {
        let mut policy = self
            .load_policy(id)
            .await?
            .ok_or_else(|| RodeError::NotFound(format!("policy {} not found", id)))?;
        if policy.deleted {
            return Err(RodeError::FailedPrecondition(format!(
                "policy {} has already been deleted",
                id
            )));
        }

        let assignments = assignments_for_policy(self.store.as_ref(), id).await?;
        if !assignments.is_empty() {
            let operations = assignments
                .iter()
                .map(|a| BulkOperation::Delete { id: a.id.clone() })
                .collect();
            self.store
                .bulk(indices::POLICY_ASSIGNMENTS, operations)
                .await
                .internal("error deleting policy assignments")?;
        }

        policy.deleted = true;
        policy.updated = Utc::now();
        self.store
            .update(indices::POLICIES, policy_document(&policy)?)
            .await
            .internal("error deleting policy")?;
        info!(policy_id = %id, assignments = assignments.len(), "policy deleted");
        Ok(())
    }

    /// Versions of a policy, newest first.
    pub async fn list_policy_versions(
        &self,
        policy_id: &str,
        options: &ListOptions,
    ) -> RodeResult<Page<PolicyVersion>> {
        if self.load_policy(policy_id).await?.is_none() {
            return Err(RodeError::NotFound(format!("policy {} not found", policy_id)));
        }

        let request = options.search(vec![Query::children_of(policy_id)], Sort::desc("version"))?;
        let response = self
            .store
            .search(indices::POLICIES, &request)
            .await
            .map_err(|e| RodeError::from_store("error searching policy versions", e))?;

        let items = response
            .hits
            .iter()
            .map(|doc| doc.deserialize().internal("error decoding policy version"))
            .collect::<RodeResult<Vec<PolicyVersion>>>()?;
        Ok(Page {
            items,
            next_page_token: response.next_page_token,
        })
    }

    pub fn validate_policy(&self, rego_content: &str) -> RodeResult<ValidationResult> {
        if rego_content.is_empty() {
            return Err(RodeError::InvalidArgument(
                "policy rego content is required".to_string(),
            ));
        }
        Ok(rode_policy::validate_policy(rego_content))
    }
}
