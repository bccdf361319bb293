//! Shared fakes for rode-core integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rode_core::{Caller, MethodPermissions, Role, RodeServer, RoleAuthorizer};
use rode_grafeas::{
    Artifact, BuildDetails, BuildProvenance, GrafeasError, GrafeasResult, ListOccurrencesRequest,
    ListOccurrencesResponse, NoteKind, Occurrence, OccurrenceStore, Resource,
};
use rode_opa::{
    EvaluatePolicyResponse, EvaluationResult, OpaError, OpaResult, PolicyEngine, Violation,
};
use rode_store::{
    BulkOperation, Document, DocumentStore, MemoryStore, SearchRequest, SearchResponse,
    StoreResult,
};
use serde_json::Value;

/// A valid policy under `package`; `marker` ends up in the source so the
/// fake engine can tell policies apart.
pub fn policy_rego(package: &str, marker: &str) -> String {
    format!(
        r#"package {package}

# {marker}
pass {{
	count(failing) == 0
}}

failing[v.id] {{
	v := violations[_]
	not v.pass
}}

violations[result] {{
	occ := input.occurrences[_]
	result := {{
		"pass": true,
		"id": "seen",
		"name": "Occurrence seen",
		"message": sprintf("saw %v", [occ.name]),
	}}
}}
"#
    )
}

pub fn build_occurrence(name: &str, resource_uri: &str, artifacts: &[(&str, &[&str])]) -> Occurrence {
    Occurrence {
        name: name.to_string(),
        resource: Resource {
            uri: resource_uri.to_string(),
            ..Default::default()
        },
        note_name: "projects/rode/notes/build".to_string(),
        kind: NoteKind::Build,
        build: Some(BuildDetails {
            provenance: Some(BuildProvenance {
                id: format!("{}-provenance", name),
                built_artifacts: artifacts
                    .iter()
                    .map(|(id, names)| Artifact {
                        id: id.to_string(),
                        checksum: String::new(),
                        names: names.iter().map(|n| n.to_string()).collect(),
                    })
                    .collect(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn occurrence(name: &str, resource_uri: &str, kind: NoteKind) -> Occurrence {
    Occurrence {
        name: name.to_string(),
        resource: Resource {
            uri: resource_uri.to_string(),
            ..Default::default()
        },
        kind,
        ..Default::default()
    }
}

/// Answers build queries with `builds` and everything else with `related`.
#[derive(Default)]
pub struct FakeOccurrences {
    pub builds: Vec<Occurrence>,
    pub related: Vec<Occurrence>,
    pub fail_builds: bool,
    pub truncate: bool,
    pub requests: Mutex<Vec<ListOccurrencesRequest>>,
}

impl FakeOccurrences {
    pub fn filters(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.filter.clone())
            .collect()
    }
}

#[async_trait]
impl OccurrenceStore for FakeOccurrences {
    async fn list_occurrences(
        &self,
        request: &ListOccurrencesRequest,
    ) -> GrafeasResult<ListOccurrencesResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let is_build_query = request.filter.starts_with("kind == \"BUILD\"");
        if is_build_query && self.fail_builds {
            return Err(GrafeasError::Http {
                status: Some(503),
                message: "HTTP 503: unavailable".to_string(),
            });
        }

        let occurrences = if is_build_query {
            self.builds.clone()
        } else {
            self.related.clone()
        };
        Ok(ListOccurrencesResponse {
            occurrences,
            next_page_token: if self.truncate { "more".to_string() } else { String::new() },
        })
    }
}

/// Rule engine that fails any policy whose source contains `FAIL`, and
/// errors on any policy whose source contains `fail_on`.
#[derive(Default)]
pub struct FakeEngine {
    pub loaded: Mutex<HashMap<String, String>>,
    pub initialize_calls: AtomicUsize,
    pub inputs: Mutex<Vec<Value>>,
    pub fail_on: Option<String>,
}

impl FakeEngine {
    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_on: Some(marker.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl PolicyEngine for FakeEngine {
    async fn initialize_policy(&self, policy_id: &str, rego_content: &str) -> OpaResult<()> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        self.loaded
            .lock()
            .unwrap()
            .entry(policy_id.to_string())
            .or_insert_with(|| rego_content.to_string());
        Ok(())
    }

    async fn evaluate_policy(
        &self,
        rego_content: &str,
        input: &Value,
    ) -> OpaResult<EvaluatePolicyResponse> {
        self.inputs.lock().unwrap().push(input.clone());
        if let Some(marker) = &self.fail_on {
            if rego_content.contains(marker.as_str()) {
                return Err(OpaError::Http {
                    status: Some(503),
                    message: "HTTP 503: engine unavailable".to_string(),
                });
            }
        }
        let pass = !rego_content.contains("FAIL");
        let violations = vec![Violation {
            id: "seen".to_string(),
            name: "Occurrence seen".to_string(),
            message: format!(
                "{} occurrences",
                input["occurrences"].as_array().map_or(0, Vec::len)
            ),
            pass,
            ..Default::default()
        }];
        Ok(EvaluatePolicyResponse {
            result: EvaluationResult { pass, violations },
            explanation: None,
        })
    }
}

/// MemoryStore that counts writes. With `short_multi_search` set, the last
/// response of every multi-search is dropped.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    pub writes: AtomicUsize,
    pub short_multi_search: AtomicBool,
}

impl CountingStore {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn get(&self, index: &str, id: &str) -> StoreResult<Option<Document>> {
        self.inner.get(index, id).await
    }

    async fn multi_get(&self, index: &str, ids: &[String]) -> StoreResult<Vec<Option<Document>>> {
        self.inner.multi_get(index, ids).await
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> StoreResult<SearchResponse> {
        self.inner.search(index, request).await
    }

    async fn multi_search(
        &self,
        index: &str,
        requests: &[SearchRequest],
    ) -> StoreResult<Vec<SearchResponse>> {
        let mut responses = self.inner.multi_search(index, requests).await?;
        if self.short_multi_search.load(Ordering::SeqCst) {
            responses.pop();
        }
        Ok(responses)
    }

    async fn create(&self, index: &str, document: Document) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.create(index, document).await
    }

    async fn update(&self, index: &str, document: Document) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update(index, document).await
    }

    async fn delete(&self, index: &str, id: &str) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(index, id).await
    }

    async fn bulk(&self, index: &str, operations: Vec<BulkOperation>) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.bulk(index, operations).await
    }
}

pub struct Harness {
    pub server: RodeServer,
    pub store: Arc<CountingStore>,
    pub occurrences: Arc<FakeOccurrences>,
    pub engine: Arc<FakeEngine>,
}

pub fn harness(occurrences: FakeOccurrences) -> Harness {
    harness_with_engine(occurrences, FakeEngine::default())
}

pub fn harness_with_engine(occurrences: FakeOccurrences, engine: FakeEngine) -> Harness {
    let store = Arc::new(CountingStore::default());
    let occurrences = Arc::new(occurrences);
    let engine = Arc::new(engine);
    let server = RodeServer::new(
        store.clone(),
        occurrences.clone(),
        engine.clone(),
        MethodPermissions::standard(),
        Arc::new(RoleAuthorizer::standard()),
    );
    Harness {
        server,
        store,
        occurrences,
        engine,
    }
}

pub fn admin() -> Caller {
    Caller::new("admin", vec![Role::Administrator])
}
