//! In-memory document store.
//!
//! Indices are created on first write. Bulk requests are applied to a copy of
//! the index and committed only when every item succeeds.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::Document;
use crate::error::{BulkItemError, StoreError, StoreResult};
use crate::filter::{compare_values, eval::lookup};
use crate::query::{BulkOperation, SearchRequest, SearchResponse, SortOrder};
use crate::store::DocumentStore;

const PAGE_TOKEN_PREFIX: &str = "offset:";

/// Document store held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    indices: HashMap<String, Index>,
    /// Insertion counter; orders unsorted results and breaks sort ties.
    next_seq: u64,
}

#[derive(Debug, Clone, Default)]
struct Index {
    entries: HashMap<String, Entry>,
}

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    document: Document,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `index`.
    pub async fn len(&self, index: &str) -> usize {
        let inner = self.inner.read().await;
        inner.indices.get(index).map_or(0, |i| i.entries.len())
    }

    pub async fn is_empty(&self, index: &str) -> bool {
        self.len(index).await == 0
    }
}

impl Index {
    fn apply(&mut self, name: &str, seq: &mut u64, op: BulkOperation) -> StoreResult<()> {
        match op {
            BulkOperation::Create(document) => {
                if self.entries.contains_key(&document.id) {
                    return Err(StoreError::AlreadyExists {
                        index: name.to_string(),
                        id: document.id,
                    });
                }
                *seq += 1;
                self.entries.insert(
                    document.id.clone(),
                    Entry {
                        seq: *seq,
                        document,
                    },
                );
                Ok(())
            }
            BulkOperation::Update(document) => match self.entries.get_mut(&document.id) {
                Some(entry) => {
                    entry.document = document;
                    Ok(())
                }
                None => Err(StoreError::NotFound {
                    index: name.to_string(),
                    id: document.id,
                }),
            },
            BulkOperation::Delete { id } => match self.entries.remove(&id) {
                Some(_) => Ok(()),
                None => Err(StoreError::NotFound {
                    index: name.to_string(),
                    id,
                }),
            },
        }
    }

    fn search(&self, request: &SearchRequest) -> StoreResult<SearchResponse> {
        let mut matched: Vec<&Entry> = self
            .entries
            .values()
            .filter(|e| request.query.matches(&e.document))
            .collect();

        match &request.sort {
            Some(sort) => {
                let path: Vec<String> = sort.field.split('.').map(String::from).collect();
                matched.sort_by(|a, b| {
                    let left = lookup(&a.document.source, &path);
                    let right = lookup(&b.document.source, &path);
                    let ordering = match (left, right) {
                        (Some(l), Some(r)) => {
                            let ord = compare_values(l, r).unwrap_or(Ordering::Equal);
                            match sort.order {
                                SortOrder::Asc => ord,
                                SortOrder::Desc => ord.reverse(),
                            }
                        }
                        // Documents without the sort field go last.
                        (Some(_), None) => Ordering::Less,
                        (None, Some(_)) => Ordering::Greater,
                        (None, None) => Ordering::Equal,
                    };
                    ordering.then(a.seq.cmp(&b.seq))
                });
            }
            None => matched.sort_by_key(|e| e.seq),
        }

        let total = matched.len();
        let offset = match &request.page_token {
            Some(token) => decode_page_token(token)?,
            None => 0,
        };
        let end = match request.page_size {
            Some(size) => offset.saturating_add(size).min(total),
            None => total,
        };

        let hits = matched
            .iter()
            .skip(offset)
            .take(end.saturating_sub(offset))
            .map(|e| e.document.clone())
            .collect();
        let next_page_token = if end < total {
            encode_page_token(end)
        } else {
            String::new()
        };

        Ok(SearchResponse {
            hits,
            total,
            next_page_token,
        })
    }
}

fn encode_page_token(offset: usize) -> String {
    BASE64.encode(format!("{}{}", PAGE_TOKEN_PREFIX, offset))
}

fn decode_page_token(token: &str) -> StoreResult<usize> {
    let invalid = || StoreError::InvalidPageToken {
        token: token.to_string(),
    };
    let bytes = BASE64.decode(token).map_err(|_| invalid())?;
    let text = String::from_utf8(bytes).map_err(|_| invalid())?;
    text.strip_prefix(PAGE_TOKEN_PREFIX)
        .and_then(|n| n.parse().ok())
        .ok_or_else(invalid)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, index: &str, id: &str) -> StoreResult<Option<Document>> {
        let inner = self.inner.read().await;
        Ok(inner
            .indices
            .get(index)
            .and_then(|i| i.entries.get(id))
            .map(|e| e.document.clone()))
    }

    async fn multi_get(&self, index: &str, ids: &[String]) -> StoreResult<Vec<Option<Document>>> {
        let inner = self.inner.read().await;
        let entries = inner.indices.get(index).map(|i| &i.entries);
        Ok(ids
            .iter()
            .map(|id| {
                entries
                    .and_then(|e| e.get(id))
                    .map(|e| e.document.clone())
            })
            .collect())
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> StoreResult<SearchResponse> {
        let inner = self.inner.read().await;
        match inner.indices.get(index) {
            Some(i) => i.search(request),
            None => Index::default().search(request),
        }
    }

    async fn multi_search(
        &self,
        index: &str,
        requests: &[SearchRequest],
    ) -> StoreResult<Vec<SearchResponse>> {
        let inner = self.inner.read().await;
        let empty = Index::default();
        let target = inner.indices.get(index).unwrap_or(&empty);
        requests.iter().map(|r| target.search(r)).collect()
    }

    async fn create(&self, index: &str, document: Document) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let inner = &mut *inner;
        inner.indices.entry(index.to_string()).or_default().apply(
            index,
            &mut inner.next_seq,
            BulkOperation::Create(document),
        )
    }

    async fn update(&self, index: &str, document: Document) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let inner = &mut *inner;
        inner.indices.entry(index.to_string()).or_default().apply(
            index,
            &mut inner.next_seq,
            BulkOperation::Update(document),
        )
    }

    async fn delete(&self, index: &str, id: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let inner = &mut *inner;
        inner.indices.entry(index.to_string()).or_default().apply(
            index,
            &mut inner.next_seq,
            BulkOperation::Delete { id: id.to_string() },
        )
    }

    async fn bulk(&self, index: &str, operations: Vec<BulkOperation>) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let mut staged = inner.indices.get(index).cloned().unwrap_or_default();
        let mut seq = inner.next_seq;
        let count = operations.len();
        let mut errors = Vec::new();

        for (position, op) in operations.into_iter().enumerate() {
            let id = op.id().to_string();
            if let BulkOperation::Create(doc) | BulkOperation::Update(doc) = &op {
                if let Some(join) = &doc.join {
                    debug!(index, id = %id, routing = join.routing(&doc.id), "bulk item");
                }
            }
            if let Err(err) = staged.apply(index, &mut seq, op) {
                errors.push(BulkItemError {
                    position,
                    id,
                    reason: err.to_string(),
                });
            }
        }

        if !errors.is_empty() {
            return Err(StoreError::Bulk { errors });
        }

        inner.indices.insert(index.to_string(), staged);
        inner.next_seq = seq;
        debug!(index, count, "bulk request committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_token_roundtrip_and_garbage() {
        assert_eq!(decode_page_token(&encode_page_token(40)).unwrap(), 40);
        assert!(matches!(
            decode_page_token("not base64!"),
            Err(StoreError::InvalidPageToken { .. })
        ));
        assert!(decode_page_token(&BASE64.encode("limit:3")).is_err());
    }
}
