//! Full evaluation against HTTP occurrence and rule engine backends.

mod common;

use std::sync::Arc;

use common::{admin, policy_rego};
use rode_core::{
    CreatePolicyRequest, EvaluateResourceRequest, MethodPermissions, RodeConfig, RodeServer,
    RoleAuthorizer,
};
use rode_grafeas::GrafeasConfig;
use rode_opa::OpaConfig;
use rode_store::MemoryStore;
use serde_json::json;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IMAGE: &str = "harbor.io/rode/demo@sha256:0123abcd";

#[tokio::test]
async fn test_evaluate_resource_over_http() {
    let grafeas = MockServer::start().await;
    let opa = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1beta1/projects/rode/occurrences"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "occurrences": [{
                "name": "projects/rode/occurrences/vuln-1",
                "resource": {"uri": IMAGE},
                "noteName": "projects/rode/notes/cve",
                "kind": "VULNERABILITY"
            }]
        })))
        .expect(2)
        .mount(&grafeas)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/v1/policies/.+\.1$"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&opa)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/v1/policies/.+\.1$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&opa)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/data/rode/harbor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "pass": true,
                "violations": [{"id": "seen", "name": "Occurrence seen", "pass": true}]
            }
        })))
        .expect(1)
        .mount(&opa)
        .await;

    let config = RodeConfig::default()
        .with_grafeas(GrafeasConfig::default().with_url(grafeas.uri()))
        .with_opa(OpaConfig::default().with_url(opa.uri()));
    let server = RodeServer::from_config(
        &config,
        Arc::new(MemoryStore::new()),
        MethodPermissions::standard(),
        Arc::new(RoleAuthorizer::standard()),
    )
    .unwrap();

    let policy = server
        .create_policy(
            &admin(),
            CreatePolicyRequest {
                name: "harbor".to_string(),
                rego_content: policy_rego("rode.harbor", "v1"),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    server.create_policy_group(&admin(), "prod", "").await.unwrap();
    server
        .create_policy_assignment(&admin(), &format!("{}.1", policy.id), "prod")
        .await
        .unwrap();

    let result = server
        .evaluate_resource(
            &admin(),
            EvaluateResourceRequest {
                resource_uri: IMAGE.to_string(),
                policy_group: "prod".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(result.resource_evaluation.pass);
    assert_eq!(result.policy_evaluations.len(), 1);
    assert_eq!(result.policy_evaluations[0].violations[0].id, "seen");
}
