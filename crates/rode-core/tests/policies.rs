//! Policy, policy group and policy assignment lifecycle.

mod common;

use common::{admin, harness, policy_rego, FakeOccurrences, Harness};
use rode_core::{
    policy_assignment_id, Caller, Code, CreatePolicyRequest, ListOptions, Policy, RodeError, Role,
    UpdatePolicyRequest,
};

fn create_request(name: &str, marker: &str) -> CreatePolicyRequest {
    CreatePolicyRequest {
        name: name.to_string(),
        description: format!("{} policy", name),
        rego_content: policy_rego(&format!("rode.{}", name), marker),
        source_path: "https://github.com/rode/policies".to_string(),
        message: "initial".to_string(),
    }
}

async fn create(h: &Harness, name: &str) -> Policy {
    h.server
        .create_policy(&admin(), create_request(name, "v1"))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_then_get() {
    let h = harness(FakeOccurrences::default());
    let created = create(&h, "harbor").await;

    assert_eq!(created.current_version, 1);
    assert!(!created.deleted);
    let version = created.policy.clone().unwrap();
    assert_eq!(version.id, format!("{}.1", created.id));
    assert_eq!(version.version, 1);

    let fetched = h.server.get_policy(&admin(), &created.id).await.unwrap();
    assert_eq!(fetched, created);
    assert_eq!(
        fetched.policy.unwrap().rego_content,
        policy_rego("rode.harbor", "v1")
    );
}

#[tokio::test]
async fn test_create_rejects_invalid_policy() {
    let h = harness(FakeOccurrences::default());
    let mut request = create_request("broken", "v1");
    request.rego_content = "package rode.broken\n\npass { true }\n".to_string();

    let err = h
        .server
        .create_policy(&admin(), request)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
    match err {
        RodeError::InvalidPolicy { errors } => assert!(!errors.is_empty()),
        other => panic!("expected InvalidPolicy, got {:?}", other),
    }
    assert_eq!(h.store.writes(), 0);
}

#[tokio::test]
async fn test_create_requires_name() {
    let h = harness(FakeOccurrences::default());
    let mut request = create_request("nameless", "v1");
    request.name.clear();
    let err = h.server.create_policy(&admin(), request).await.unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_update_versions_only_on_rego_change() {
    let h = harness(FakeOccurrences::default());
    let policy = create(&h, "harbor").await;

    let renamed = h
        .server
        .update_policy(
            &admin(),
            &policy.id,
            UpdatePolicyRequest {
                name: Some("harbor-images".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "harbor-images");
    assert_eq!(renamed.current_version, 1);

    let same_rego = h
        .server
        .update_policy(
            &admin(),
            &policy.id,
            UpdatePolicyRequest {
                rego_content: Some(policy_rego("rode.harbor", "v1")),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(same_rego.current_version, 1);

    let bumped = h
        .server
        .update_policy(
            &admin(),
            &policy.id,
            UpdatePolicyRequest {
                rego_content: Some(policy_rego("rode.harbor", "v2")),
                message: Some("tighten".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(bumped.current_version, 2);
    let version = bumped.policy.unwrap();
    assert_eq!(version.id, format!("{}.2", policy.id));
    assert_eq!(version.message, "tighten");

    let first = h
        .server
        .get_policy(&admin(), &format!("{}.1", policy.id))
        .await
        .unwrap();
    assert_eq!(first.current_version, 2);
    assert_eq!(
        first.policy.unwrap().rego_content,
        policy_rego("rode.harbor", "v1")
    );

    let err = h
        .server
        .get_policy(&admin(), &format!("{}.3", policy.id))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    let versions = h
        .server
        .list_policy_versions(&admin(), &policy.id, &ListOptions::default())
        .await
        .unwrap();
    let numbers: Vec<u32> = versions.items.iter().map(|v| v.version).collect();
    assert_eq!(numbers, vec![2, 1]);
}

#[tokio::test]
async fn test_update_rejects_invalid_rego_without_writing() {
    let h = harness(FakeOccurrences::default());
    let policy = create(&h, "harbor").await;
    let writes_before = h.store.writes();

    let err = h
        .server
        .update_policy(
            &admin(),
            &policy.id,
            UpdatePolicyRequest {
                rego_content: Some("package rode.harbor\n".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
    assert_eq!(h.store.writes(), writes_before);
}

#[tokio::test]
async fn test_delete_tombstones_and_drops_assignments() {
    let h = harness(FakeOccurrences::default());
    let kept = create(&h, "kept").await;
    let doomed = create(&h, "doomed").await;
    h.server.create_policy_group(&admin(), "prod", "").await.unwrap();
    h.server
        .create_policy_assignment(&admin(), &format!("{}.1", kept.id), "prod")
        .await
        .unwrap();
    h.server
        .create_policy_assignment(&admin(), &format!("{}.1", doomed.id), "prod")
        .await
        .unwrap();

    h.server.delete_policy(&admin(), &doomed.id).await.unwrap();

    let tombstone = h.server.get_policy(&admin(), &doomed.id).await.unwrap();
    assert!(tombstone.deleted);

    let listed = h
        .server
        .list_policies(&admin(), &ListOptions::default())
        .await
        .unwrap();
    let ids: Vec<&str> = listed.items.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec![kept.id.as_str()]);

    let assignments = h
        .server
        .list_policy_assignments(&admin(), "policy-groups/prod", &ListOptions::default())
        .await
        .unwrap();
    assert_eq!(assignments.items.len(), 1);
    assert_eq!(assignments.items[0].id, policy_assignment_id(&kept.id, "prod"));

    let err = h.server.delete_policy(&admin(), &doomed.id).await.unwrap_err();
    assert_eq!(err.code(), Code::FailedPrecondition);

    let err = h
        .server
        .update_policy(&admin(), &doomed.id, UpdatePolicyRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::FailedPrecondition);
}

#[tokio::test]
async fn test_list_policies_filter_and_pages() {
    let h = harness(FakeOccurrences::default());
    for name in ["alpha", "beta", "gamma"] {
        create(&h, name).await;
    }

    let filtered = h
        .server
        .list_policies(
            &admin(),
            &ListOptions::default().with_filter("name == \"beta\""),
        )
        .await
        .unwrap();
    assert_eq!(filtered.items.len(), 1);
    assert_eq!(filtered.items[0].name, "beta");

    let first = h
        .server
        .list_policies(&admin(), &ListOptions::default().with_page_size(2))
        .await
        .unwrap();
    assert_eq!(first.items.len(), 2);
    assert!(!first.next_page_token.is_empty());
    let rest = h
        .server
        .list_policies(
            &admin(),
            &ListOptions::default()
                .with_page_size(2)
                .with_page_token(first.next_page_token),
        )
        .await
        .unwrap();
    assert_eq!(rest.items.len(), 1);
    assert!(rest.next_page_token.is_empty());

    let err = h
        .server
        .list_policies(&admin(), &ListOptions::default().with_filter("name =="))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_validate_policy_reports_without_failing() {
    let h = harness(FakeOccurrences::default());

    let ok = h
        .server
        .validate_policy(&admin(), &policy_rego("rode.ok", "v1"))
        .unwrap();
    assert!(ok.compile);
    assert!(ok.errors.is_empty());

    let bad = h
        .server
        .validate_policy(&admin(), "package rode.bad\n\npass { true }\n")
        .unwrap();
    assert!(!bad.errors.is_empty());

    let err = h.server.validate_policy(&admin(), "").unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
    assert_eq!(h.store.writes(), 0);
}

#[tokio::test]
async fn test_policy_group_lifecycle() {
    let h = harness(FakeOccurrences::default());

    let err = h
        .server
        .create_policy_group(&admin(), "Prod Gate", "")
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    h.server
        .create_policy_group(&admin(), "prod", "production gate")
        .await
        .unwrap();
    h.server.create_policy_group(&admin(), "dev", "").await.unwrap();
    let err = h
        .server
        .create_policy_group(&admin(), "prod", "")
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::AlreadyExists);

    let updated = h
        .server
        .update_policy_group(&admin(), "prod", "stricter")
        .await
        .unwrap();
    assert_eq!(updated.description, "stricter");

    h.server.delete_policy_group(&admin(), "dev").await.unwrap();
    let deleted = h.server.get_policy_group(&admin(), "dev").await.unwrap();
    assert!(deleted.deleted);

    // Deleted names stay taken.
    let err = h
        .server
        .create_policy_group(&admin(), "dev", "")
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::AlreadyExists);

    let err = h
        .server
        .update_policy_group(&admin(), "dev", "again")
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::FailedPrecondition);

    let listed = h
        .server
        .list_policy_groups(&admin(), &ListOptions::default())
        .await
        .unwrap();
    let names: Vec<&str> = listed.items.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["prod"]);

    let err = h
        .server
        .get_policy_group(&admin(), "missing")
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
}

#[tokio::test]
async fn test_assignment_reference_checks() {
    let h = harness(FakeOccurrences::default());
    let policy = create(&h, "harbor").await;
    let version_id = format!("{}.1", policy.id);
    h.server.create_policy_group(&admin(), "prod", "").await.unwrap();
    h.server.create_policy_group(&admin(), "old", "").await.unwrap();
    h.server.delete_policy_group(&admin(), "old").await.unwrap();

    let err = h
        .server
        .create_policy_assignment(&admin(), &policy.id, "prod")
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let err = h
        .server
        .create_policy_assignment(&admin(), &format!("{}.9", policy.id), "prod")
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    let err = h
        .server
        .create_policy_assignment(&admin(), &version_id, "missing")
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    let err = h
        .server
        .create_policy_assignment(&admin(), &version_id, "old")
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::FailedPrecondition);

    let assignment = h
        .server
        .create_policy_assignment(&admin(), &version_id, "prod")
        .await
        .unwrap();
    assert_eq!(assignment.id, policy_assignment_id(&policy.id, "prod"));
    assert_eq!(assignment.policy_version_id, version_id);

    let err = h
        .server
        .create_policy_assignment(&admin(), &version_id, "prod")
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::AlreadyExists);
}

#[tokio::test]
async fn test_assignment_update_and_scopes() {
    let h = harness(FakeOccurrences::default());
    let policy = create(&h, "harbor").await;
    let other = create(&h, "other").await;
    h.server
        .update_policy(
            &admin(),
            &policy.id,
            UpdatePolicyRequest {
                rego_content: Some(policy_rego("rode.harbor", "v2")),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    h.server.create_policy_group(&admin(), "prod", "").await.unwrap();
    h.server.create_policy_group(&admin(), "dev", "").await.unwrap();

    let assignment = h
        .server
        .create_policy_assignment(&admin(), &format!("{}.1", policy.id), "prod")
        .await
        .unwrap();
    h.server
        .create_policy_assignment(&admin(), &format!("{}.1", other.id), "prod")
        .await
        .unwrap();
    h.server
        .create_policy_assignment(&admin(), &format!("{}.2", policy.id), "dev")
        .await
        .unwrap();

    let updated = h
        .server
        .update_policy_assignment(&admin(), &assignment.id, &format!("{}.2", policy.id))
        .await
        .unwrap();
    assert_eq!(updated.policy_version_id, format!("{}.2", policy.id));
    assert_eq!(updated.policy_group, "prod");

    let err = h
        .server
        .update_policy_assignment(&admin(), &assignment.id, &format!("{}.1", other.id))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let by_policy = h
        .server
        .list_policy_assignments(
            &admin(),
            &format!("policies/{}", policy.id),
            &ListOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_policy.items.len(), 2);

    let by_group = h
        .server
        .list_policy_assignments(&admin(), "policy-groups/prod", &ListOptions::default())
        .await
        .unwrap();
    assert_eq!(by_group.items.len(), 2);

    for scope in ["", "groups/prod", "policies/", "policy-groups/a/b"] {
        let err = h
            .server
            .list_policy_assignments(&admin(), scope, &ListOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument, "scope {:?}", scope);
    }

    h.server
        .delete_policy_assignment(&admin(), &assignment.id)
        .await
        .unwrap();
    let err = h
        .server
        .get_policy_assignment(&admin(), &assignment.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
    let err = h
        .server
        .delete_policy_assignment(&admin(), &assignment.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
}

#[tokio::test]
async fn test_role_gates_policy_writes() {
    let h = harness(FakeOccurrences::default());
    let developer = Caller::new("dev", vec![Role::PolicyDeveloper]);

    let policy = h
        .server
        .create_policy(&developer, create_request("harbor", "v1"))
        .await
        .unwrap();
    let err = h
        .server
        .delete_policy(&developer, &policy.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::PermissionDenied);

    let err = h
        .server
        .list_policies(&Caller::anonymous(), &ListOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::PermissionDenied);
}
