//! Occurrence model and client configuration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Project that holds every occurrence Rode reads.
pub const RODE_PROJECT: &str = "projects/rode";

/// Largest page the store will return for one list call.
pub const MAX_PAGE_SIZE: i32 = 1000;

/// Kind of the note an occurrence instantiates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoteKind {
    Vulnerability,
    Build,
    Image,
    Package,
    Deployment,
    Discovery,
    Attestation,
    Intoto,
    #[default]
    #[serde(other)]
    NoteKindUnspecified,
}

impl NoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoteKindUnspecified => "NOTE_KIND_UNSPECIFIED",
            Self::Vulnerability => "VULNERABILITY",
            Self::Build => "BUILD",
            Self::Image => "IMAGE",
            Self::Package => "PACKAGE",
            Self::Deployment => "DEPLOYMENT",
            Self::Discovery => "DISCOVERY",
            Self::Attestation => "ATTESTATION",
            Self::Intoto => "INTOTO",
        }
    }
}

impl std::fmt::Display for NoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resource an occurrence is attached to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub uri: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An artifact produced by a build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Resource URI of the produced artifact.
    #[serde(default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checksum: String,

    /// Tags the artifact was published under.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildProvenance {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default)]
    pub built_artifacts: Vec<Artifact>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<BuildProvenance>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A metadata record about a resource.
///
/// Only the fields Rode inspects are typed; every other detail field is kept
/// verbatim so the occurrence reaches the rule engine unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub resource: Resource,

    #[serde(default)]
    pub note_name: String,

    #[serde(default)]
    pub kind: NoteKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildDetails>,

    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Occurrence {
    pub fn resource_uri(&self) -> &str {
        &self.resource.uri
    }

    /// Artifacts listed in the build provenance, empty for non-build kinds.
    pub fn built_artifacts(&self) -> &[Artifact] {
        self.build
            .as_ref()
            .and_then(|b| b.provenance.as_ref())
            .map(|p| p.built_artifacts.as_slice())
            .unwrap_or(&[])
    }
}

/// Arguments of a list call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOccurrencesRequest {
    pub parent: String,
    pub filter: String,
    pub page_size: i32,
    pub page_token: String,
}

impl ListOccurrencesRequest {
    pub fn new(parent: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_page_token(mut self, page_token: impl Into<String>) -> Self {
        self.page_token = page_token.into();
        self
    }
}

/// One page of occurrences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOccurrencesResponse {
    #[serde(default)]
    pub occurrences: Vec<Occurrence>,

    /// Empty when this is the last page.
    #[serde(default)]
    pub next_page_token: String,
}

/// Occurrence store client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrafeasConfig {
    #[serde(default = "default_grafeas_url")]
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_grafeas_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for GrafeasConfig {
    fn default() -> Self {
        Self {
            url: default_grafeas_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl GrafeasConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `RODE_GRAFEAS_URL` | Store base URL |
    /// | `RODE_GRAFEAS_TIMEOUT` | Request timeout in seconds |
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("RODE_GRAFEAS_URL").unwrap_or_else(|_| default_grafeas_url()),
            timeout_secs: std::env::var("RODE_GRAFEAS_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}
