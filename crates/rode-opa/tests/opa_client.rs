//! Integration tests for OpaClient.
//!
//! Uses wiremock for HTTP mocking. Covers idempotent policy loading, error
//! classification and result normalization.

use rode_opa::{OpaClient, OpaConfig, OpaError, PolicyEngine};
use serde_json::json;
use wiremock::matchers::{body_json, body_string, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const POLICY: &str = "package rode.demo.harbor\n\npass { true }\n";

fn client(server: &MockServer) -> OpaClient {
    OpaClient::new(OpaConfig::default().with_url(server.uri())).expect("failed to create client")
}

#[tokio::test]
async fn test_initialize_skips_publish_when_loaded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/policies/abc.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    client(&server)
        .initialize_policy("abc.1", POLICY)
        .await
        .expect("initialize failed");
}

#[tokio::test]
async fn test_initialize_publishes_missing_policy() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/policies/abc.1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/policies/abc.1"))
        .and(body_string(POLICY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .initialize_policy("abc.1", POLICY)
        .await
        .expect("initialize failed");
}

#[tokio::test]
async fn test_initialize_existence_check_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/policies/abc.1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client(&server)
        .initialize_policy("abc.1", POLICY)
        .await
        .unwrap_err();
    match err {
        OpaError::PolicyExists { policy_id, message } => {
            assert_eq!(policy_id, "abc.1");
            assert!(message.contains("500"));
        }
        other => panic!("expected PolicyExists, got {:?}", other),
    }
}

#[tokio::test]
async fn test_initialize_publish_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "invalid_parameter",
            "message": "error(s) occurred while compiling module(s)"
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .initialize_policy("abc.1", POLICY)
        .await
        .unwrap_err();
    assert!(matches!(err, OpaError::PublishPolicy { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_evaluate_maps_result_and_violations() {
    let server = MockServer::start().await;
    let input = json!({"occurrences": [{"name": "occ-1"}]});

    Mock::given(method("POST"))
        .and(path("/v1/data/rode/demo/harbor"))
        .and(body_json(json!({ "input": input })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "pass": false,
                "violations": [{
                    "id": "no_critical",
                    "name": "No critical vulnerabilities",
                    "description": "desc",
                    "message": "found 2",
                    "link": "https://example.com",
                    "pass": false
                }]
            }
        })))
        .mount(&server)
        .await;

    let response = client(&server)
        .evaluate_policy(POLICY, &input)
        .await
        .expect("evaluate failed");

    assert!(!response.pass());
    assert_eq!(response.result.violations.len(), 1);
    assert_eq!(response.result.violations[0].id, "no_critical");
    assert_eq!(response.result.violations[0].link, "https://example.com");
    assert!(response.explanation.is_none());
}

#[tokio::test]
async fn test_evaluate_without_result_is_failing_not_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/data/rode/demo/harbor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let response = client(&server)
        .evaluate_policy(POLICY, &json!({}))
        .await
        .expect("evaluate failed");
    assert!(!response.pass());
    assert!(response.result.violations.is_empty());
}

#[tokio::test]
async fn test_evaluate_requests_explanation_when_configured() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/data/rode/demo/harbor"))
        .and(query_param("explain", "full"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"pass": true, "violations": []},
            "explanation": [{"op": "enter"}]
        })))
        .mount(&server)
        .await;

    let client = OpaClient::new(
        OpaConfig::default()
            .with_url(server.uri())
            .with_explain(true),
    )
    .unwrap();
    let response = client.evaluate_policy(POLICY, &json!({})).await.unwrap();
    assert!(response.pass());
    assert_eq!(response.explanation.unwrap().len(), 1);
}

#[tokio::test]
async fn test_evaluate_malformed_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client(&server)
        .evaluate_policy(POLICY, &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, OpaError::BadResponse { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_evaluate_http_failure_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .evaluate_policy(POLICY, &json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
}

#[test]
#[serial_test::serial]
fn test_config_from_env() {
    std::env::set_var("RODE_OPA_URL", "http://opa.internal:8181");
    std::env::set_var("RODE_OPA_EXPLAIN", "true");
    std::env::remove_var("RODE_OPA_TIMEOUT");

    let config = OpaConfig::from_env();
    assert_eq!(config.url, "http://opa.internal:8181");
    assert!(config.explain);
    assert_eq!(config.timeout_secs, 30);

    std::env::remove_var("RODE_OPA_URL");
    std::env::remove_var("RODE_OPA_EXPLAIN");
}
