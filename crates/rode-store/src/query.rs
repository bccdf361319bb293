//! Search requests and responses.

use serde_json::Value;

use crate::document::Document;
use crate::filter::Filter;

/// Which documents a search selects.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    All,
    Filter(Filter),
    /// Exact match on a dotted field path.
    Term { field: String, value: Value },
    /// Documents of a given join relation.
    HasRelation(String),
    /// Child documents routed to `parent_id`.
    ChildrenOf { parent_id: String },
    And(Vec<Query>),
}

impl Query {
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn children_of(parent_id: impl Into<String>) -> Self {
        Self::ChildrenOf {
            parent_id: parent_id.into(),
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Self::All => true,
            Self::Filter(filter) => filter.matches(&document.source),
            Self::Term { field, value } => {
                let path: Vec<String> = field.split('.').map(String::from).collect();
                crate::filter::eval::lookup(&document.source, &path) == Some(value)
            }
            Self::HasRelation(relation) => document.relation() == Some(relation.as_str()),
            Self::ChildrenOf { parent_id } => document.parent_id() == Some(parent_id.as_str()),
            Self::And(queries) => queries.iter().all(|q| q.matches(document)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }
}

/// A single search.
///
/// Without a page size every match is returned and no token is produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: Query,
    pub sort: Option<Sort>,
    pub page_size: Option<usize>,
    pub page_token: Option<String>,
}

impl SearchRequest {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            sort: None,
            page_size: None,
            page_token: None,
        }
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Zero means unpaginated.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = (page_size > 0).then_some(page_size);
        self
    }

    /// An empty token means the first page.
    pub fn with_page_token(mut self, page_token: impl Into<String>) -> Self {
        let token = page_token.into();
        self.page_token = (!token.is_empty()).then_some(token);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub hits: Vec<Document>,
    /// Total number of matches across all pages.
    pub total: usize,
    /// Empty on the last page.
    pub next_page_token: String,
}

/// One operation of a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    /// Fails if the id exists.
    Create(Document),
    /// Fails if the id is absent.
    Update(Document),
    Delete { id: String },
}

impl BulkOperation {
    pub fn id(&self) -> &str {
        match self {
            Self::Create(doc) | Self::Update(doc) => &doc.id,
            Self::Delete { id } => id,
        }
    }
}
