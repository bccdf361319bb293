//! Resource version resolution against a fake occurrence store.

mod common;

use std::sync::Arc;

use common::{build_occurrence, occurrence, FakeOccurrences};
use rode_core::{Code, ResourceVersionResolver};
use rode_grafeas::{NoteKind, MAX_PAGE_SIZE, RODE_PROJECT};

const IMAGE: &str = "harbor.io/rode/demo@sha256:0123abcd";
const COMMIT: &str = "git://github.com/rode/demo@deadbeef";

fn clause_count(filter: &str) -> usize {
    filter.split(" || ").count()
}

#[tokio::test]
async fn test_no_build_queries_only_the_uri() {
    let store = Arc::new(FakeOccurrences::default());
    let resolver = ResourceVersionResolver::new(store.clone());

    let resolved = resolver.resolve(IMAGE).await.unwrap();
    assert!(resolved.occurrences.is_empty());
    assert!(resolved.resource_version.names.is_empty());

    let filters = store.filters();
    assert_eq!(filters.len(), 2);
    assert_eq!(filters[1], format!("resource.uri == \"{}\"", IMAGE));

    let requests = store.requests.lock().unwrap();
    assert!(requests
        .iter()
        .all(|r| r.parent == RODE_PROJECT && r.page_size == MAX_PAGE_SIZE));
}

#[tokio::test]
async fn test_build_with_n_artifacts_yields_n_plus_two_clauses() {
    let artifacts: Vec<String> = (0..3)
        .map(|i| format!("harbor.io/rode/other{}@sha256:{:04}", i, i))
        .collect();
    let mut listed: Vec<(&str, &[&str])> = artifacts.iter().map(|a| (a.as_str(), &[][..])).collect();
    // Same artifact listed twice is deduplicated.
    listed.push((artifacts[0].as_str(), &[]));

    let store = Arc::new(FakeOccurrences {
        builds: vec![build_occurrence("build-1", COMMIT, &listed)],
        ..Default::default()
    });
    let resolver = ResourceVersionResolver::new(store.clone());
    resolver.resolve(IMAGE).await.unwrap();

    let filters = store.filters();
    assert_eq!(clause_count(&filters[1]), artifacts.len() + 2);
    assert!(filters[1].starts_with(&format!("resource.uri == \"{}\"", IMAGE)));
    assert!(filters[1].contains(COMMIT));
}

#[tokio::test]
async fn test_names_come_from_matching_artifact() {
    let store = Arc::new(FakeOccurrences {
        builds: vec![build_occurrence(
            "build-1",
            COMMIT,
            &[
                (IMAGE, &["harbor.io/rode/demo:v1", "harbor.io/rode/demo:latest"]),
                ("harbor.io/rode/other@sha256:ff", &["harbor.io/rode/other:v1"]),
            ],
        )],
        related: vec![
            occurrence("vuln-1", IMAGE, NoteKind::Vulnerability),
            occurrence("attest-1", IMAGE, NoteKind::Attestation),
        ],
        ..Default::default()
    });
    let resolved = ResourceVersionResolver::new(store)
        .resolve(IMAGE)
        .await
        .unwrap();

    assert_eq!(resolved.resource_version.version, IMAGE);
    assert_eq!(
        resolved.resource_version.names,
        vec!["harbor.io/rode/demo:v1", "harbor.io/rode/demo:latest"]
    );
    assert_eq!(resolved.occurrences.len(), 2);
}

#[tokio::test]
async fn test_quotes_in_uri_are_escaped() {
    let store = Arc::new(FakeOccurrences::default());
    ResourceVersionResolver::new(store.clone())
        .resolve(r#"generic://we"ird@1"#)
        .await
        .unwrap();
    assert_eq!(store.filters()[1], r#"resource.uri == "generic://we\"ird@1""#);
}

#[tokio::test]
async fn test_build_lookup_failure_stops_resolution() {
    let store = Arc::new(FakeOccurrences {
        fail_builds: true,
        ..Default::default()
    });
    let err = ResourceVersionResolver::new(store.clone())
        .resolve(IMAGE)
        .await
        .unwrap_err();

    assert_eq!(err.code(), Code::Internal);
    assert_eq!(store.filters().len(), 1);
}

#[tokio::test]
async fn test_truncation_is_not_an_error() {
    let store = Arc::new(FakeOccurrences {
        related: vec![occurrence("vuln-1", IMAGE, NoteKind::Vulnerability)],
        truncate: true,
        ..Default::default()
    });
    let resolved = ResourceVersionResolver::new(store)
        .resolve(IMAGE)
        .await
        .unwrap();
    assert_eq!(resolved.occurrences.len(), 1);
    assert_eq!(resolved.next_page_token, "more");
}
