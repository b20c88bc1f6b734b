mod common;

use common::fixtures::{
    resolver_for, resolver_with_remotes, snapshot, snapshot_unchecked, write_hosted_artifact,
    STORAGE_ID,
};
use common::mocks::MockRemote;
use depot_core::{GroupMember, RemoteConfig, Repository};
use depot_storage::error::StorageError;
use std::collections::HashMap;
use tempfile::TempDir;

const PATH: &str = "org/example/widget/1.0/widget-1.0.jar";

fn proxy(id: &str) -> Repository {
    Repository::proxy(id, RemoteConfig::new(format!("mock://{id}")))
}

#[tokio::test]
async fn first_matching_member_wins_and_later_members_are_not_consulted() {
    let temp = TempDir::new().unwrap();

    let m1 = MockRemote::new();
    let m2 = MockRemote::new();
    let m3 = MockRemote::new();
    m2.insert(PATH, "from m2");
    m3.insert(PATH, "from m3");

    let config = snapshot(
        &temp,
        vec![
            proxy("m1"),
            proxy("m2"),
            proxy("m3"),
            Repository::group(
                "public",
                vec![
                    GroupMember::local("m1"),
                    GroupMember::local("m2"),
                    GroupMember::local("m3"),
                ],
            ),
        ],
    );
    let remotes = HashMap::from([
        ("m1".to_string(), m1.clone()),
        ("m2".to_string(), m2.clone()),
        ("m3".to_string(), m3.clone()),
    ]);
    let resolver = resolver_with_remotes(config, remotes);

    let path = resolver
        .resolve(STORAGE_ID, "public", PATH)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(path.repository_key().repository_id, "m2");
    assert_eq!(tokio::fs::read(path.absolute()).await.unwrap(), b"from m2");
    assert_eq!(m1.fetch_count(), 1, "m1 was consulted and missed");
    assert_eq!(m2.fetch_count(), 1, "m2 satisfied the request");
    assert_eq!(m3.fetch_count(), 0, "m3 must not be consulted after a hit");
}

#[tokio::test]
async fn membership_cycle_is_rejected_not_recursed() {
    let temp = TempDir::new().unwrap();
    let config = snapshot_unchecked(
        &temp,
        vec![
            Repository::group("a", vec![GroupMember::local("b")]),
            Repository::group("b", vec![GroupMember::local("a")]),
        ],
    );
    let resolver = resolver_for(config);

    let err = resolver.resolve(STORAGE_ID, "a", PATH).await.unwrap_err();
    assert!(
        matches!(err, StorageError::CyclicGroupDefinition(_)),
        "expected cycle rejection, got {err:?}"
    );
}

#[tokio::test]
async fn cycle_is_also_rejected_at_configuration_time() {
    let temp = TempDir::new().unwrap();
    let config = snapshot_unchecked(
        &temp,
        vec![
            Repository::group("a", vec![GroupMember::local("b")]),
            Repository::group("b", vec![GroupMember::local("a")]),
        ],
    );
    assert!(matches!(
        config.validate(),
        Err(depot_core::Error::CyclicGroupDefinition(_))
    ));
}

#[tokio::test]
async fn failing_member_remote_is_skipped() {
    let temp = TempDir::new().unwrap();

    let broken = MockRemote::new();
    broken.set_unreachable(true);
    let healthy = MockRemote::new();
    healthy.insert(PATH, "from healthy");

    let config = snapshot(
        &temp,
        vec![
            proxy("broken"),
            proxy("healthy"),
            Repository::group(
                "public",
                vec![GroupMember::local("broken"), GroupMember::local("healthy")],
            ),
        ],
    );
    let remotes = HashMap::from([
        ("broken".to_string(), broken),
        ("healthy".to_string(), healthy),
    ]);
    let resolver = resolver_with_remotes(config, remotes);

    let path = resolver
        .resolve(STORAGE_ID, "public", PATH)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(path.repository_key().repository_id, "healthy");
}

#[tokio::test]
async fn no_member_with_a_copy_is_absent_not_an_error() {
    let temp = TempDir::new().unwrap();
    let config = snapshot(
        &temp,
        vec![
            Repository::hosted("releases"),
            Repository::group("public", vec![GroupMember::local("releases")]),
        ],
    );
    let resolver = resolver_for(config);

    let outcome = resolver.resolve(STORAGE_ID, "public", PATH).await.unwrap();
    assert!(outcome.is_none());
}

#[tokio::test]
async fn nested_groups_resolve_depth_first() {
    let temp = TempDir::new().unwrap();
    let config = snapshot(
        &temp,
        vec![
            Repository::hosted("releases"),
            Repository::group("inner", vec![GroupMember::local("releases")]),
            Repository::group("outer", vec![GroupMember::local("inner")]),
        ],
    );
    let resolver = resolver_for(config);

    write_hosted_artifact(&resolver, "releases", PATH, b"nested").await;

    let path = resolver
        .resolve(STORAGE_ID, "outer", PATH)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(path.repository_key().repository_id, "releases");
}

#[tokio::test]
async fn browse_deduplicates_first_member_wins() {
    let temp = TempDir::new().unwrap();
    let config = snapshot(
        &temp,
        vec![
            Repository::hosted("first"),
            Repository::hosted("second"),
            Repository::group(
                "public",
                vec![GroupMember::local("first"), GroupMember::local("second")],
            ),
        ],
    );
    let resolver = resolver_for(config);

    write_hosted_artifact(&resolver, "first", "shared/a.jar", b"first copy").await;
    write_hosted_artifact(&resolver, "second", "shared/a.jar", b"second copy").await;
    write_hosted_artifact(&resolver, "second", "only/b.jar", b"b").await;

    let listing = resolver.browse(STORAGE_ID, "public", "").await.unwrap();
    assert_eq!(
        listing,
        vec!["only/b.jar".to_string(), "shared/a.jar".to_string()]
    );

    // Resolution follows the same order: the first member's copy is served.
    let path = resolver
        .resolve(STORAGE_ID, "public", "shared/a.jar")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(path.repository_key().repository_id, "first");
    assert_eq!(
        tokio::fs::read(path.absolute()).await.unwrap(),
        b"first copy"
    );
}
