//! Service facade: authorization gate in front of every manager.

use std::sync::Arc;

use rode_grafeas::{GrafeasClient, OccurrenceStore};
use rode_opa::{OpaClient, PolicyEngine};
use rode_policy::ValidationResult;
use rode_store::DocumentStore;

use crate::assignment::{PolicyAssignment, PolicyAssignmentManager};
use crate::authz::{Authorizer, Caller, Method, MethodPermissions};
use crate::config::RodeConfig;
use crate::error::{InternalExt, RodeResult};
use crate::evaluation::{
    EvaluatePolicyRequest, EvaluatePolicyResult, EvaluateResourceRequest, EvaluationManager,
    ListResourceEvaluationsRequest, ResourceEvaluationResult,
};
use crate::group::{PolicyGroup, PolicyGroupManager};
use crate::list::{ListOptions, Page};
use crate::policy::{CreatePolicyRequest, Policy, PolicyManager, PolicyVersion, UpdatePolicyRequest};
use crate::resource::ResourceVersionResolver;

#[derive(Clone)]
pub struct RodeServer {
    permissions: Arc<MethodPermissions>,
    authorizer: Arc<dyn Authorizer>,
    policies: PolicyManager,
    groups: PolicyGroupManager,
    assignments: PolicyAssignmentManager,
    evaluations: EvaluationManager,
}

impl RodeServer {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        occurrences: Arc<dyn OccurrenceStore>,
        engine: Arc<dyn PolicyEngine>,
        permissions: MethodPermissions,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        let policies = PolicyManager::new(store.clone());
        let groups = PolicyGroupManager::new(store.clone());
        let assignments =
            PolicyAssignmentManager::new(store.clone(), policies.clone(), groups.clone());
        let evaluations = EvaluationManager::new(
            store,
            engine,
            ResourceVersionResolver::new(occurrences),
            policies.clone(),
            groups.clone(),
            assignments.clone(),
        );

        Self {
            permissions: Arc::new(permissions),
            authorizer,
            policies,
            groups,
            assignments,
            evaluations,
        }
    }

    /// Build HTTP clients for the occurrence store and rule engine from
    /// `config`.
    pub fn from_config(
        config: &RodeConfig,
        store: Arc<dyn DocumentStore>,
        permissions: MethodPermissions,
        authorizer: Arc<dyn Authorizer>,
    ) -> RodeResult<Self> {
        let occurrences =
            GrafeasClient::new(config.grafeas.clone()).internal("error creating occurrence client")?;
        let engine = OpaClient::new(config.opa.clone()).internal("error creating rule engine client")?;
        Ok(Self::new(
            store,
            Arc::new(occurrences),
            Arc::new(engine),
            permissions,
            authorizer,
        ))
    }

    fn authorize(&self, caller: &Caller, method: Method) -> RodeResult<()> {
        self.permissions
            .check(self.authorizer.as_ref(), caller, method)
    }

    pub async fn evaluate_resource(
        &self,
        caller: &Caller,
        request: EvaluateResourceRequest,
    ) -> RodeResult<ResourceEvaluationResult> {
        self.authorize(caller, Method::EvaluateResource)?;
        self.evaluations.evaluate_resource(request).await
    }

    pub async fn get_resource_evaluation(
        &self,
        caller: &Caller,
        id: &str,
    ) -> RodeResult<ResourceEvaluationResult> {
        self.authorize(caller, Method::GetResourceEvaluation)?;
        self.evaluations.get_resource_evaluation(id).await
    }

    pub async fn list_resource_evaluations(
        &self,
        caller: &Caller,
        request: &ListResourceEvaluationsRequest,
    ) -> RodeResult<Page<ResourceEvaluationResult>> {
        self.authorize(caller, Method::ListResourceEvaluations)?;
        self.evaluations.list_resource_evaluations(request).await
    }

    pub async fn evaluate_policy(
        &self,
        caller: &Caller,
        request: EvaluatePolicyRequest,
    ) -> RodeResult<EvaluatePolicyResult> {
        self.authorize(caller, Method::EvaluatePolicy)?;
        self.evaluations.evaluate_policy(request).await
    }

    pub async fn create_policy(
        &self,
        caller: &Caller,
        request: CreatePolicyRequest,
    ) -> RodeResult<Policy> {
        self.authorize(caller, Method::CreatePolicy)?;
        self.policies.create_policy(request).await
    }

    pub async fn get_policy(&self, caller: &Caller, id: &str) -> RodeResult<Policy> {
        self.authorize(caller, Method::GetPolicy)?;
        self.policies.get_policy(id).await
    }

    pub async fn list_policies(
        &self,
        caller: &Caller,
        options: &ListOptions,
    ) -> RodeResult<Page<Policy>> {
        self.authorize(caller, Method::ListPolicies)?;
        self.policies.list_policies(options).await
    }

    pub async fn update_policy(
        &self,
        caller: &Caller,
        id: &str,
        request: UpdatePolicyRequest,
    ) -> RodeResult<Policy> {
        self.authorize(caller, Method::UpdatePolicy)?;
        self.policies.update_policy(id, request).await
    }

    pub async fn delete_policy(&self, caller: &Caller, id: &str) -> RodeResult<()> {
        self.authorize(caller, Method::DeletePolicy)?;
        self.policies.delete_policy(id).await
    }

    pub async fn list_policy_versions(
        &self,
        caller: &Caller,
        policy_id: &str,
        options: &ListOptions,
    ) -> RodeResult<Page<PolicyVersion>> {
        self.authorize(caller, Method::ListPolicyVersions)?;
        self.policies.list_policy_versions(policy_id, options).await
    }

    pub fn validate_policy(
        &self,
        caller: &Caller,
        rego_content: &str,
    ) -> RodeResult<ValidationResult> {
        self.authorize(caller, Method::ValidatePolicy)?;
        self.policies.validate_policy(rego_content)
    }

    pub async fn create_policy_group(
        &self,
        caller: &Caller,
        name: &str,
        description: &str,
    ) -> RodeResult<PolicyGroup> {
        self.authorize(caller, Method::CreatePolicyGroup)?;
        self.groups.create_policy_group(name, description).await
    }

    pub async fn get_policy_group(&self, caller: &Caller, name: &str) -> RodeResult<PolicyGroup> {
        self.authorize(caller, Method::GetPolicyGroup)?;
        self.groups.get_policy_group(name).await
    }

    pub async fn list_policy_groups(
        &self,
        caller: &Caller,
        options: &ListOptions,
    ) -> RodeResult<Page<PolicyGroup>> {
        self.authorize(caller, Method::ListPolicyGroups)?;
        self.groups.list_policy_groups(options).await
    }

    pub async fn update_policy_group(
        &self,
        caller: &Caller,
        name: &str,
        description: &str,
    ) -> RodeResult<PolicyGroup> {
        self.authorize(caller, Method::UpdatePolicyGroup)?;
        self.groups.update_policy_group(name, description).await
    }

    pub async fn delete_policy_group(&self, caller: &Caller, name: &str) -> RodeResult<()> {
        self.authorize(caller, Method::DeletePolicyGroup)?;
        self.groups.delete_policy_group(name).await
    }

    pub async fn create_policy_assignment(
        &self,
        caller: &Caller,
        policy_version_id: &str,
        policy_group: &str,
    ) -> RodeResult<PolicyAssignment> {
        self.authorize(caller, Method::CreatePolicyAssignment)?;
        self.assignments
            .create_policy_assignment(policy_version_id, policy_group)
            .await
    }

    pub async fn get_policy_assignment(
        &self,
        caller: &Caller,
        id: &str,
    ) -> RodeResult<PolicyAssignment> {
        self.authorize(caller, Method::GetPolicyAssignment)?;
        self.assignments.get_policy_assignment(id).await
    }

    pub async fn update_policy_assignment(
        &self,
        caller: &Caller,
        id: &str,
        policy_version_id: &str,
    ) -> RodeResult<PolicyAssignment> {
        self.authorize(caller, Method::UpdatePolicyAssignment)?;
        self.assignments
            .update_policy_assignment(id, policy_version_id)
            .await
    }

    pub async fn delete_policy_assignment(&self, caller: &Caller, id: &str) -> RodeResult<()> {
        self.authorize(caller, Method::DeletePolicyAssignment)?;
        self.assignments.delete_policy_assignment(id).await
    }

    pub async fn list_policy_assignments(
        &self,
        caller: &Caller,
        scope: &str,
        options: &ListOptions,
    ) -> RodeResult<Page<PolicyAssignment>> {
        self.authorize(caller, Method::ListPolicyAssignments)?;
        self.assignments.list_policy_assignments(scope, options).await
    }
}
