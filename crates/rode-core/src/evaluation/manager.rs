//! Resource and policy evaluation.
//!
//! A resource evaluation is persisted as one bulk write of the parent and all
//! of its children, after every policy has been evaluated. Dropping the
//! future before that point persists nothing.

use std::sync::Arc;

use chrono::Utc;
use rode_opa::PolicyEngine;
use rode_store::{BulkOperation, Document, DocumentStore, JoinField, Query, SearchRequest, Sort};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use super::types::{
    EvaluatePolicyRequest, EvaluatePolicyResult, EvaluateResourceRequest,
    ListResourceEvaluationsRequest, PolicyEvaluation, ResourceEvaluation,
    ResourceEvaluationResult,
};
use crate::assignment::PolicyAssignmentManager;
use crate::error::{InternalExt, RodeError, RodeResult};
use crate::group::PolicyGroupManager;
use crate::indices;
use crate::list::{ListOptions, Page};
use crate::policy::{PolicyManager, PolicyVersion};
use crate::resource::{ResolvedResource, ResourceUri, ResourceVersionResolver};

#[derive(Clone)]
pub struct EvaluationManager {
    store: Arc<dyn DocumentStore>,
    engine: Arc<dyn PolicyEngine>,
    resolver: ResourceVersionResolver,
    policies: PolicyManager,
    groups: PolicyGroupManager,
    assignments: PolicyAssignmentManager,
}

/// Rule engine input for a resolved resource.
fn policy_input(resolved: &ResolvedResource) -> Value {
    json!({ "occurrences": resolved.occurrences })
}

impl EvaluationManager {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        engine: Arc<dyn PolicyEngine>,
        resolver: ResourceVersionResolver,
        policies: PolicyManager,
        groups: PolicyGroupManager,
        assignments: PolicyAssignmentManager,
    ) -> Self {
        Self {
            store,
            engine,
            resolver,
            policies,
            groups,
            assignments,
        }
    }

    async fn resolve(&self, resource_uri: &str) -> RodeResult<ResolvedResource> {
        let resource = ResourceUri::parse(resource_uri)
            .map_err(|e| RodeError::InvalidArgument(e.to_string()))?;
        debug!(
            resource_uri,
            resource_type = %resource.resource_type,
            name = %resource.name,
            "resolving resource"
        );
        self.resolver.resolve(resource_uri).await
    }

    /// Load `version` into the engine and evaluate it.
    async fn run_policy(
        &self,
        version: &PolicyVersion,
        input: &Value,
    ) -> RodeResult<rode_opa::EvaluatePolicyResponse> {
        self.engine
            .initialize_policy(&version.id, &version.rego_content)
            .await
            .internal("error initializing policy in rule engine")?;
        self.engine
            .evaluate_policy(&version.rego_content, input)
            .await
            .internal("error evaluating policy")
    }

    pub async fn evaluate_resource(
        &self,
        request: EvaluateResourceRequest,
    ) -> RodeResult<ResourceEvaluationResult> {
        if request.resource_uri.is_empty() {
            return Err(RodeError::InvalidArgument(
                "resource uri is required".to_string(),
            ));
        }
        if request.policy_group.is_empty() {
            return Err(RodeError::InvalidArgument(
                "policy group is required".to_string(),
            ));
        }

        let resolved = self.resolve(&request.resource_uri).await?;
        let group = self
            .groups
            .get_active_policy_group(&request.policy_group)
            .await?;

        let assignments = self.assignments.assignments_for_group(&group.name).await?;
        if assignments.is_empty() {
            return Err(RodeError::FailedPrecondition(format!(
                "policy group {} has no policy assignments",
                group.name
            )));
        }

        let now = Utc::now();
        let mut evaluation = ResourceEvaluation {
            id: Uuid::new_v4().to_string(),
            resource_version: resolved.resource_version.clone(),
            policy_group: group.name.clone(),
            pass: true,
            source: request.source,
            created: now,
        };

        let input = policy_input(&resolved);
        let mut policy_evaluations = Vec::with_capacity(assignments.len());
        for assignment in &assignments {
            let version = self
                .policies
                .get_policy_version(&assignment.policy_version_id)
                .await?
                .ok_or_else(|| {
                    RodeError::internal(
                        "error fetching assigned policy version",
                        format!(
                            "assignment {} references missing policy version {}",
                            assignment.id, assignment.policy_version_id
                        ),
                    )
                })?;

            let response = self.run_policy(&version, &input).await?;
            let pass = response.pass();
            debug!(
                resource_evaluation_id = %evaluation.id,
                policy_version_id = %version.id,
                pass,
                violations = response.result.violations.len(),
                "policy evaluated"
            );
            evaluation.pass &= pass;
            policy_evaluations.push(PolicyEvaluation {
                id: Uuid::new_v4().to_string(),
                resource_evaluation_id: evaluation.id.clone(),
                policy_version_id: version.id,
                pass,
                violations: response.result.violations,
                created: now,
            });
        }

        let mut operations = Vec::with_capacity(policy_evaluations.len() + 1);
        operations.push(BulkOperation::Create(
            Document::from_serialize(&evaluation.id, &evaluation)
                .internal("error serializing resource evaluation")?
                .with_join(JoinField::parent(
                    indices::JOIN_FIELD,
                    indices::RESOURCE_EVALUATION_RELATION,
                )),
        ));
        for child in &policy_evaluations {
            operations.push(BulkOperation::Create(
                Document::from_serialize(&child.id, child)
                    .internal("error serializing policy evaluation")?
                    .with_join(JoinField::child(
                        indices::JOIN_FIELD,
                        indices::POLICY_EVALUATION_RELATION,
                        &evaluation.id,
                    )),
            ));
        }
        self.store
            .bulk(indices::EVALUATIONS, operations)
            .await
            .internal("error saving evaluation results")?;

        info!(
            resource_evaluation_id = %evaluation.id,
            resource_uri = %request.resource_uri,
            policy_group = %evaluation.policy_group,
            pass = evaluation.pass,
            policies = policy_evaluations.len(),
            "resource evaluated"
        );
        Ok(ResourceEvaluationResult {
            resource_evaluation: evaluation,
            policy_evaluations,
        })
    }

    /// Evaluate one policy without persisting anything.
    pub async fn evaluate_policy(
        &self,
        request: EvaluatePolicyRequest,
    ) -> RodeResult<EvaluatePolicyResult> {
        if request.policy_id.is_empty() {
            return Err(RodeError::InvalidArgument("policy id is required".to_string()));
        }
        if request.resource_uri.is_empty() {
            return Err(RodeError::InvalidArgument(
                "resource uri is required".to_string(),
            ));
        }

        let policy = self.policies.get_policy(&request.policy_id).await?;
        let version = policy.policy.ok_or_else(|| {
            RodeError::internal(
                "error fetching policy version",
                format!("policy {} has no version", policy.id),
            )
        })?;
        let resolved = self.resolve(&request.resource_uri).await?;

        let response = self.run_policy(&version, &policy_input(&resolved)).await?;
        debug!(
            policy_version_id = %version.id,
            resource_uri = %request.resource_uri,
            pass = response.pass(),
            "ad-hoc policy evaluation"
        );
        Ok(EvaluatePolicyResult {
            pass: response.result.pass,
            policy_version_id: version.id,
            resource_version: resolved.resource_version,
            violations: response.result.violations,
            explanation: response.explanation,
        })
    }

    pub async fn get_resource_evaluation(&self, id: &str) -> RodeResult<ResourceEvaluationResult> {
        if id.is_empty() {
            return Err(RodeError::InvalidArgument(
                "resource evaluation id is required".to_string(),
            ));
        }

        let responses = self
            .store
            .multi_search(
                indices::EVALUATIONS,
                &[
                    SearchRequest::new(Query::And(vec![
                        Query::HasRelation(indices::RESOURCE_EVALUATION_RELATION.to_string()),
                        Query::term("id", id),
                    ])),
                    SearchRequest::new(Query::children_of(id)),
                ],
            )
            .await
            .internal("error fetching resource evaluation")?;

        let (parent, children) = match responses.as_slice() {
            [parent, children] => (parent, children),
            _ => {
                return Err(RodeError::internal(
                    "error fetching resource evaluation",
                    format!("expected 2 search responses, got {}", responses.len()),
                ))
            }
        };
        let resource_evaluation: ResourceEvaluation = parent
            .hits
            .first()
            .ok_or_else(|| RodeError::NotFound(format!("resource evaluation {} not found", id)))?
            .deserialize()
            .internal("error decoding resource evaluation")?;
        let policy_evaluations = children
            .hits
            .iter()
            .map(|doc| doc.deserialize().internal("error decoding policy evaluation"))
            .collect::<RodeResult<Vec<PolicyEvaluation>>>()?;

        Ok(ResourceEvaluationResult {
            resource_evaluation,
            policy_evaluations,
        })
    }

    /// Evaluations of one resource, newest first, with their children.
    pub async fn list_resource_evaluations(
        &self,
        request: &ListResourceEvaluationsRequest,
    ) -> RodeResult<Page<ResourceEvaluationResult>> {
        if request.resource_uri.is_empty() {
            return Err(RodeError::InvalidArgument(
                "resource uri is required".to_string(),
            ));
        }

        let options = ListOptions::default()
            .with_filter(request.filter.clone())
            .with_page_size(request.page_size)
            .with_page_token(request.page_token.clone());
        let search = options.search(
            vec![
                Query::HasRelation(indices::RESOURCE_EVALUATION_RELATION.to_string()),
                Query::term("resourceVersion.version", request.resource_uri.as_str()),
            ],
            Sort::desc("created"),
        )?;
        let response = self
            .store
            .search(indices::EVALUATIONS, &search)
            .await
            .map_err(|e| RodeError::from_store("error searching resource evaluations", e))?;

        let parents = response
            .hits
            .iter()
            .map(|doc| doc.deserialize().internal("error decoding resource evaluation"))
            .collect::<RodeResult<Vec<ResourceEvaluation>>>()?;
        if parents.is_empty() {
            return Ok(Page {
                items: Vec::new(),
                next_page_token: response.next_page_token,
            });
        }

        let child_searches: Vec<SearchRequest> = parents
            .iter()
            .map(|p| SearchRequest::new(Query::children_of(p.id.as_str())))
            .collect();
        let children = self
            .store
            .multi_search(indices::EVALUATIONS, &child_searches)
            .await
            .internal("error fetching policy evaluations")?;
        if children.len() != parents.len() {
            return Err(RodeError::internal(
                "error fetching policy evaluations",
                format!(
                    "expected {} search responses, got {}",
                    parents.len(),
                    children.len()
                ),
            ));
        }

        let mut items = Vec::with_capacity(parents.len());
        for (resource_evaluation, children) in parents.into_iter().zip(children) {
            let policy_evaluations = children
                .hits
                .iter()
                .map(|doc| doc.deserialize().internal("error decoding policy evaluation"))
                .collect::<RodeResult<Vec<PolicyEvaluation>>>()?;
            items.push(ResourceEvaluationResult {
                resource_evaluation,
                policy_evaluations,
            });
        }

        Ok(Page {
            items,
            next_page_token: response.next_page_token,
        })
    }
}
