//! Document storage for Rode.
//!
//! Policies, policy groups, assignments and evaluation records are stored as
//! JSON documents. Related documents are linked through a join descriptor:
//! a child names its relation and the parent it is routed with, so a parent
//! and all of its children can be fetched together.
//!
//! ```
//! use rode_store::{Document, DocumentStore, MemoryStore};
//! use serde_json::json;
//!
//! # tokio::runtime::Builder::new_current_thread()
//! #     .build()
//! #     .unwrap()
//! #     .block_on(async {
//! let store = MemoryStore::new();
//! store
//!     .create("policies", Document::new("abc", json!({"name": "harbor"})))
//!     .await
//!     .unwrap();
//!
//! let document = store.get("policies", "abc").await.unwrap().unwrap();
//! assert_eq!(document.source["name"], "harbor");
//! # });
//! ```

pub mod document;
pub mod error;
pub mod filter;
pub mod memory;
pub mod query;
pub mod store;

pub use document::{Document, JoinField};
pub use error::{BulkItemError, StoreError, StoreResult};
pub use filter::{Filter, FilterError};
pub use memory::MemoryStore;
pub use query::{BulkOperation, Query, SearchRequest, SearchResponse, Sort, SortOrder};
pub use store::DocumentStore;
