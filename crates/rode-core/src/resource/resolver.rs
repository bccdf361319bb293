//! Resource version resolution through build provenance.
//!
//! Phase 1 finds the build that produced (or was run on) the resource.
//! Phase 2 fetches every occurrence attached to the resource, the build's own
//! resource and each artifact that build produced.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rode_grafeas::{
    ListOccurrencesRequest, NoteKind, Occurrence, OccurrenceStore, MAX_PAGE_SIZE, RODE_PROJECT,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{InternalExt, RodeError, RodeResult};
use crate::resource::uri::distinct_resources;

/// The resolved identity of a resource URI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceVersion {
    /// The resource URI.
    pub version: String,

    /// Tags the artifact was published under.
    #[serde(default)]
    pub names: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

/// Output of [`ResourceVersionResolver::resolve`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedResource {
    pub resource_version: ResourceVersion,
    pub occurrences: Vec<Occurrence>,
    /// Non-empty when more occurrences exist than were returned.
    pub next_page_token: String,
}

/// Quote a value as a filter string literal.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Filter selecting builds that ran on, or produced, `resource_uri`.
pub fn build_occurrences_filter(resource_uri: &str) -> String {
    let uri = quote(resource_uri);
    format!(
        "kind == {} && (resource.uri == {} || build.provenance.builtArtifacts.nestedFilter(id == {}))",
        quote(NoteKind::Build.as_str()),
        uri,
        uri
    )
}

/// Filter selecting occurrences on any of `uris`.
pub fn resource_uris_filter<S: AsRef<str>>(uris: &[S]) -> String {
    uris.iter()
        .map(|uri| format!("resource.uri == {}", quote(uri.as_ref())))
        .collect::<Vec<_>>()
        .join(" || ")
}

#[derive(Clone)]
pub struct ResourceVersionResolver {
    occurrences: Arc<dyn OccurrenceStore>,
}

impl ResourceVersionResolver {
    pub fn new(occurrences: Arc<dyn OccurrenceStore>) -> Self {
        Self { occurrences }
    }

    pub async fn resolve(&self, resource_uri: &str) -> RodeResult<ResolvedResource> {
        if resource_uri.is_empty() {
            return Err(RodeError::InvalidArgument(
                "resource uri is required".to_string(),
            ));
        }

        let builds = self
            .occurrences
            .list_occurrences(
                &ListOccurrencesRequest::new(RODE_PROJECT)
                    .with_filter(build_occurrences_filter(resource_uri))
                    .with_page_size(MAX_PAGE_SIZE),
            )
            .await
            .internal("error listing build occurrences")?;
        warn_if_truncated("build", resource_uri, &builds.next_page_token);

        let mut uris = vec![resource_uri.to_string()];
        let mut names: Vec<String> = Vec::new();
        for build in &builds.occurrences {
            push_unique(&mut uris, build.resource_uri());
            for artifact in build.built_artifacts() {
                push_unique(&mut uris, &artifact.id);
                if artifact.id == resource_uri {
                    for name in &artifact.names {
                        push_unique(&mut names, name);
                    }
                }
            }
        }
        debug!(
            resource_uri,
            builds = builds.occurrences.len(),
            related_uris = uris.len(),
            "resolved build lineage"
        );

        let related = self
            .occurrences
            .list_occurrences(
                &ListOccurrencesRequest::new(RODE_PROJECT)
                    .with_filter(resource_uris_filter(&uris))
                    .with_page_size(MAX_PAGE_SIZE),
            )
            .await
            .internal("error listing occurrences")?;
        warn_if_truncated("related", resource_uri, &related.next_page_token);

        let resources = distinct_resources(related.occurrences.iter().map(|o| o.resource_uri()));
        debug!(
            resource_uri,
            occurrences = related.occurrences.len(),
            distinct_resources = resources.len(),
            "resolved occurrences"
        );

        Ok(ResolvedResource {
            resource_version: ResourceVersion {
                version: resource_uri.to_string(),
                names,
                created: None,
            },
            occurrences: related.occurrences,
            next_page_token: related.next_page_token,
        })
    }
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

fn warn_if_truncated(phase: &str, resource_uri: &str, next_page_token: &str) {
    if !next_page_token.is_empty() {
        warn!(
            phase,
            resource_uri,
            page_size = MAX_PAGE_SIZE,
            "occurrence listing truncated; continuing with partial results"
        );
    }
}
