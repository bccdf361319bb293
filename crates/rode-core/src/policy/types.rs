//! Policy documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named, versioned policy. Never hard-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub current_version: u32,

    #[serde(default)]
    pub deleted: bool,

    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,

    /// The current (or requested) version; not persisted with the policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<PolicyVersion>,
}

/// Immutable content of one policy version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyVersion {
    /// `{policyId}.{version}`
    pub id: String,
    pub policy_id: String,
    pub version: u32,
    pub rego_content: String,

    #[serde(default)]
    pub source_path: String,

    #[serde(default)]
    pub message: String,

    pub created: DateTime<Utc>,
}

pub fn policy_version_id(policy_id: &str, version: u32) -> String {
    format!("{}.{}", policy_id, version)
}

/// Split `{policyId}.{version}`; `None` for a bare policy id.
pub fn parse_policy_version_id(id: &str) -> Option<(&str, u32)> {
    let (policy_id, version) = id.rsplit_once('.')?;
    if policy_id.is_empty() {
        return None;
    }
    Some((policy_id, version.parse().ok()?))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePolicyRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rego_content: String,
    #[serde(default)]
    pub source_path: String,
    #[serde(default)]
    pub message: String,
}

/// Fields left as `None` are unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePolicyRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub rego_content: Option<String>,
    pub source_path: Option<String>,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_id_roundtrip() {
        let id = policy_version_id("3f2c", 12);
        assert_eq!(id, "3f2c.12");
        assert_eq!(parse_policy_version_id(&id), Some(("3f2c", 12)));
    }

    #[test]
    fn test_bare_ids_are_not_versions() {
        assert_eq!(parse_policy_version_id("3f2c"), None);
        assert_eq!(parse_policy_version_id("3f2c.latest"), None);
        assert_eq!(parse_policy_version_id(".1"), None);
    }

    #[test]
    fn test_embedded_version_not_serialized_when_absent() {
        let now = Utc::now();
        let policy = Policy {
            id: "p".into(),
            name: "n".into(),
            description: String::new(),
            current_version: 1,
            deleted: false,
            created: now,
            updated: now,
            policy: None,
        };
        let value = serde_json::to_value(&policy).unwrap();
        assert!(value.get("policy").is_none());
        assert_eq!(value["currentVersion"], 1);
    }
}
