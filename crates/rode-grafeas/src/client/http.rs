//! HTTP layer: status mapping for the occurrence store REST API.
//!
//! This is the ONLY place for status code handling. Requests are issued
//! exactly once.

use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use crate::error::{GrafeasError, GrafeasResult};
use crate::types::{ListOccurrencesRequest, ListOccurrencesResponse};

#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
}

impl HttpBackend {
    fn occurrences_url(&self, request: &ListOccurrencesRequest) -> GrafeasResult<Url> {
        let mut url = Url::parse(&format!(
            "{}/v1beta1/{}/occurrences",
            self.base_url, request.parent
        ))
        .map_err(|e| GrafeasError::InvalidRequest {
            message: format!("invalid occurrences URL: {}", e),
        })?;

        {
            let mut query = url.query_pairs_mut();
            if !request.filter.is_empty() {
                query.append_pair("filter", &request.filter);
            }
            if request.page_size > 0 {
                query.append_pair("pageSize", &request.page_size.to_string());
            }
            if !request.page_token.is_empty() {
                query.append_pair("pageToken", &request.page_token);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        Ok(url)
    }

    /// `GET /v1beta1/{parent}/occurrences`.
    pub(crate) async fn list_occurrences(
        &self,
        request: &ListOccurrencesRequest,
    ) -> GrafeasResult<ListOccurrencesResponse> {
        let url = self.occurrences_url(request)?;
        debug!(url = %url, "listing occurrences");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(status_error(status, response).await);
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| GrafeasError::BadResponse {
            message: format!("failed to decode occurrence list: {}", e),
        })
    }
}

async fn status_error(status: StatusCode, response: reqwest::Response) -> GrafeasError {
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| status.to_string());
    GrafeasError::Http {
        status: Some(status.as_u16()),
        message: format!("HTTP {}: {}", status.as_u16(), message),
    }
}
