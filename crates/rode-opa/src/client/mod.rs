//! Rule engine client.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::debug;

use crate::engine::PolicyEngine;
use crate::error::{OpaError, OpaResult};
use crate::types::{EvaluatePolicyResponse, OpaConfig};

mod http;

use http::HttpBackend;

pub const OPA_USER_AGENT: &str = concat!("rode-opa/", env!("CARGO_PKG_VERSION"));

/// Client for an OPA-compatible rule engine.
#[derive(Debug, Clone)]
pub struct OpaClient {
    http: HttpBackend,
    explain: bool,
}

impl OpaClient {
    pub fn new(config: OpaConfig) -> OpaResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(OPA_USER_AGENT));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| OpaError::Config {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http: HttpBackend {
                client,
                base_url: config.url.trim_end_matches('/').to_string(),
            },
            explain: config.explain,
        })
    }

    pub fn from_env() -> OpaResult<Self> {
        Self::new(OpaConfig::from_env())
    }

    pub fn base_url(&self) -> &str {
        &self.http.base_url
    }
}

#[async_trait]
impl PolicyEngine for OpaClient {
    async fn initialize_policy(&self, policy_id: &str, rego_content: &str) -> OpaResult<()> {
        let exists = self
            .http
            .policy_exists(policy_id)
            .await
            .map_err(|e| OpaError::PolicyExists {
                policy_id: policy_id.to_string(),
                message: e.to_string(),
            })?;

        if exists {
            debug!(policy_id, "policy already loaded");
            return Ok(());
        }

        self.http
            .publish_policy(policy_id, rego_content)
            .await
            .map_err(|e| OpaError::PublishPolicy {
                policy_id: policy_id.to_string(),
                message: e.to_string(),
            })
    }

    async fn evaluate_policy(
        &self,
        rego_content: &str,
        input: &Value,
    ) -> OpaResult<EvaluatePolicyResponse> {
        let data_path =
            rode_policy::package_path(rego_content).map_err(|e| OpaError::InvalidPolicy {
                message: e.to_string(),
            })?;

        let raw = self.http.query_data(&data_path, input, self.explain).await?;
        Ok(raw.into())
    }
}
