//! Policy groups: named gates a resource is evaluated against.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use rode_store::{Document, DocumentStore, Query, Sort, StoreError};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{InternalExt, RodeError, RodeResult};
use crate::indices;
use crate::list::{ListOptions, Page};

/// Soft-deleted; the name is the primary key and is never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyGroup {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub deleted: bool,

    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

fn valid_name(name: &str) -> bool {
    static NAME: OnceLock<Regex> = OnceLock::new();
    NAME.get_or_init(|| Regex::new(r"^[a-z0-9_-]+$").expect("group name pattern is valid"))
        .is_match(name)
}

#[derive(Clone)]
pub struct PolicyGroupManager {
    store: Arc<dyn DocumentStore>,
}

impl PolicyGroupManager {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn load(&self, name: &str) -> RodeResult<PolicyGroup> {
        if name.is_empty() {
            return Err(RodeError::InvalidArgument(
                "policy group name is required".to_string(),
            ));
        }
        self.store
            .get(indices::POLICY_GROUPS, name)
            .await
            .internal("error fetching policy group")?
            .ok_or_else(|| RodeError::NotFound(format!("policy group {} not found", name)))?
            .deserialize()
            .internal("error decoding policy group")
    }

    /// Like [`Self::get_policy_group`], but a deleted group is
    /// FailedPrecondition.
    pub async fn get_active_policy_group(&self, name: &str) -> RodeResult<PolicyGroup> {
        let group = self.load(name).await?;
        if group.deleted {
            return Err(RodeError::FailedPrecondition(format!(
                "policy group {} has been deleted",
                name
            )));
        }
        Ok(group)
    }

    async fn save(&self, group: &PolicyGroup) -> RodeResult<()> {
        let document =
            Document::from_serialize(&group.name, group).internal("error serializing policy group")?;
        self.store
            .update(indices::POLICY_GROUPS, document)
            .await
            .internal("error updating policy group")
    }

    pub async fn create_policy_group(
        &self,
        name: &str,
        description: &str,
    ) -> RodeResult<PolicyGroup> {
        if !valid_name(name) {
            return Err(RodeError::InvalidArgument(format!(
                "policy group name {:?} must match ^[a-z0-9_-]+$",
                name
            )));
        }

        let now = Utc::now();
        let group = PolicyGroup {
            name: name.to_string(),
            description: description.to_string(),
            deleted: false,
            created: now,
            updated: now,
        };
        let document =
            Document::from_serialize(name, &group).internal("error serializing policy group")?;

        match self.store.create(indices::POLICY_GROUPS, document).await {
            Ok(()) => {}
            Err(StoreError::AlreadyExists { .. }) => {
                return Err(RodeError::AlreadyExists(format!(
                    "policy group {} already exists",
                    name
                )))
            }
            Err(e) => return Err(RodeError::internal("error creating policy group", e)),
        }
        info!(policy_group = name, "policy group created");
        Ok(group)
    }

    /// Deleted groups are returned with `deleted` set.
    pub async fn get_policy_group(&self, name: &str) -> RodeResult<PolicyGroup> {
        self.load(name).await
    }

    /// Non-deleted groups by name.
    pub async fn list_policy_groups(&self, options: &ListOptions) -> RodeResult<Page<PolicyGroup>> {
        let request = options.search(vec![Query::term("deleted", false)], Sort::asc("name"))?;
        let response = self
            .store
            .search(indices::POLICY_GROUPS, &request)
            .await
            .map_err(|e| RodeError::from_store("error searching policy groups", e))?;

        let items = response
            .hits
            .iter()
            .map(|doc| doc.deserialize().internal("error decoding policy group"))
            .collect::<RodeResult<Vec<PolicyGroup>>>()?;
        Ok(Page {
            items,
            next_page_token: response.next_page_token,
        })
    }

    pub async fn update_policy_group(
        &self,
        name: &str,
        description: &str,
    ) -> RodeResult<PolicyGroup> {
        let mut group = self.get_active_policy_group(name).await?;
        group.description = description.to_string();
        group.updated = Utc::now();
        self.save(&group).await?;
        Ok(group)
    }

    pub async fn delete_policy_group(&self, name: &str) -> RodeResult<()> {
        let mut group = self.get_active_policy_group(name).await?;
        group.deleted = true;
        group.updated = Utc::now();
        self.save(&group).await?;
        info!(policy_group = name, "policy group deleted");
        Ok(())
    }
}
