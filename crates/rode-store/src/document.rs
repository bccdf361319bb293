//! Stored documents and parent/child join descriptors.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreResult;

/// Join descriptor linking a document to its relation and, for children,
/// to the parent it is routed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinField {
    /// Name of the join field in the index mapping.
    pub field: String,

    pub relation_name: String,

    /// Present on child documents only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl JoinField {
    pub fn parent(field: impl Into<String>, relation_name: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            relation_name: relation_name.into(),
            parent_id: None,
        }
    }

    pub fn child(
        field: impl Into<String>,
        relation_name: impl Into<String>,
        parent_id: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            relation_name: relation_name.into(),
            parent_id: Some(parent_id.into()),
        }
    }

    /// Routing key: children live with their parent.
    pub fn routing<'a>(&'a self, id: &'a str) -> &'a str {
        self.parent_id.as_deref().unwrap_or(id)
    }
}

/// A JSON document with its id and optional join linkage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub source: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join: Option<JoinField>,
}

impl Document {
    pub fn new(id: impl Into<String>, source: Value) -> Self {
        Self {
            id: id.into(),
            source,
            join: None,
        }
    }

    /// Serialize `value` as the document source.
    pub fn from_serialize<T: Serialize>(id: impl Into<String>, value: &T) -> StoreResult<Self> {
        Ok(Self::new(id, serde_json::to_value(value)?))
    }

    pub fn with_join(mut self, join: JoinField) -> Self {
        self.join = Some(join);
        self
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> StoreResult<T> {
        Ok(serde_json::from_value(self.source.clone())?)
    }

    pub fn relation(&self) -> Option<&str> {
        self.join.as_ref().map(|j| j.relation_name.as_str())
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.join.as_ref().and_then(|j| j.parent_id.as_deref())
    }
}
