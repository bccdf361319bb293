//! The document store seam.

use async_trait::async_trait;

use crate::document::Document;
use crate::error::StoreResult;
use crate::query::{BulkOperation, SearchRequest, SearchResponse};

/// Indexed JSON document storage with parent/child joins.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, index: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Fetch several ids at once; absent ids yield `None` in place.
    async fn multi_get(&self, index: &str, ids: &[String]) -> StoreResult<Vec<Option<Document>>>;

    async fn search(&self, index: &str, request: &SearchRequest) -> StoreResult<SearchResponse>;

    /// Run several searches against one consistent view of the index.
    async fn multi_search(
        &self,
        index: &str,
        requests: &[SearchRequest],
    ) -> StoreResult<Vec<SearchResponse>>;

    async fn create(&self, index: &str, document: Document) -> StoreResult<()>;

    async fn update(&self, index: &str, document: Document) -> StoreResult<()>;

    async fn delete(&self, index: &str, id: &str) -> StoreResult<()>;

    /// Apply every operation or none of them.
    async fn bulk(&self, index: &str, operations: Vec<BulkOperation>) -> StoreResult<()>;
}
