//! Paging and filtering shared by list operations.

use rode_store::{Filter, Query, SearchRequest, Sort};

use crate::error::{RodeError, RodeResult};

/// Caller-supplied list options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Optional filter expression.
    pub filter: String,
    /// Zero returns every match.
    pub page_size: usize,
    pub page_token: String,
}

impl ListOptions {
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_page_token(mut self, page_token: impl Into<String>) -> Self {
        self.page_token = page_token.into();
        self
    }

    /// Combine `base` with the caller's filter into a paged search.
    pub(crate) fn search(&self, base: Vec<Query>, sort: Sort) -> RodeResult<SearchRequest> {
        let mut clauses = base;
        if !self.filter.trim().is_empty() {
            let filter = Filter::parse(&self.filter).map_err(|e| {
                RodeError::InvalidArgument(format!("error parsing filter expression: {}", e))
            })?;
            clauses.push(Query::Filter(filter));
        }

        Ok(SearchRequest::new(Query::And(clauses))
            .with_sort(sort)
            .with_page_size(self.page_size)
            .with_page_token(self.page_token.clone()))
    }
}

/// One page of results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Empty on the last page.
    pub next_page_token: String,
}
