//! Occurrence store client.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::error::{GrafeasError, GrafeasResult};
use crate::store::OccurrenceStore;
use crate::types::{GrafeasConfig, ListOccurrencesRequest, ListOccurrencesResponse};

mod http;

use http::HttpBackend;

pub const GRAFEAS_USER_AGENT: &str = concat!("rode-grafeas/", env!("CARGO_PKG_VERSION"));

/// Client for a Grafeas-compatible occurrence store.
#[derive(Debug, Clone)]
pub struct GrafeasClient {
    http: HttpBackend,
}

impl GrafeasClient {
    pub fn new(config: GrafeasConfig) -> GrafeasResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(GRAFEAS_USER_AGENT));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| GrafeasError::Config {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http: HttpBackend {
                client,
                base_url: config.url.trim_end_matches('/').to_string(),
            },
        })
    }

    pub fn from_env() -> GrafeasResult<Self> {
        Self::new(GrafeasConfig::from_env())
    }

    pub fn base_url(&self) -> &str {
        &self.http.base_url
    }
}

#[async_trait]
impl OccurrenceStore for GrafeasClient {
    async fn list_occurrences(
        &self,
        request: &ListOccurrencesRequest,
    ) -> GrafeasResult<ListOccurrencesResponse> {
        if request.parent.is_empty() {
            return Err(GrafeasError::InvalidRequest {
                message: "parent is required".to_string(),
            });
        }

        let response = self.http.list_occurrences(request).await?;
        debug!(
            parent = %request.parent,
            count = response.occurrences.len(),
            has_next_page = !response.next_page_token.is_empty(),
            "listed occurrences"
        );
        Ok(response)
    }
}
