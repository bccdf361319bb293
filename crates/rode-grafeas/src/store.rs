//! The occurrence listing seam.

use async_trait::async_trait;

use crate::error::GrafeasResult;
use crate::types::{ListOccurrencesRequest, ListOccurrencesResponse};

/// Read access to an artifact metadata store.
#[async_trait]
pub trait OccurrenceStore: Send + Sync {
    /// List one page of occurrences under `request.parent` matching
    /// `request.filter`.
    async fn list_occurrences(
        &self,
        request: &ListOccurrencesRequest,
    ) -> GrafeasResult<ListOccurrencesResponse>;
}
