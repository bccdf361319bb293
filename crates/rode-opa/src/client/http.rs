//! HTTP layer: status mapping for the rule engine REST API.
//!
//! This is the ONLY place for status code handling. Requests are issued
//! exactly once; callers own retry policy.

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::error::{OpaError, OpaResult};
use crate::types::DataResponse;

#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
}

impl HttpBackend {
    fn policy_url(&self, policy_id: &str) -> String {
        format!("{}/v1/policies/{}", self.base_url, policy_id)
    }

    /// `GET /v1/policies/{id}`: 200 => loaded, 404 => absent.
    pub(crate) async fn policy_exists(&self, policy_id: &str) -> OpaResult<bool> {
        let url = self.policy_url(policy_id);
        debug!(url = %url, "checking policy");

        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(status_error(status, response).await),
        }
    }

    /// `PUT /v1/policies/{id}` with the raw Rego module.
    pub(crate) async fn publish_policy(&self, policy_id: &str, rego: &str) -> OpaResult<()> {
        let url = self.policy_url(policy_id);
        debug!(url = %url, "publishing policy");

        let response = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, "text/plain")
            .body(rego.to_string())
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            Err(status_error(status, response).await)
        }
    }

    /// `POST /v1/data/{path}` with `{"input": ...}`.
    pub(crate) async fn query_data(
        &self,
        data_path: &str,
        input: &Value,
        explain: bool,
    ) -> OpaResult<DataResponse> {
        let mut url = format!("{}/v1/data/{}", self.base_url, data_path);
        if explain {
            url.push_str("?explain=full");
        }
        debug!(url = %url, "evaluating policy");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "input": input }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| OpaError::BadResponse {
            message: format!("failed to decode evaluation response: {}", e),
        })
    }
}

async fn status_error(status: StatusCode, response: reqwest::Response) -> OpaError {
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| status.to_string());
    OpaError::Http {
        status: Some(status.as_u16()),
        message: format!("HTTP {}: {}", status.as_u16(), message),
    }
}
