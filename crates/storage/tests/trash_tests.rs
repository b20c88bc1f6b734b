mod common;

use common::fixtures::{resolver_for, snapshot, write_hosted_artifact, STORAGE_ID};
use depot_core::{ChecksumAlgorithm, Repository};
use depot_storage::checksums;
use depot_storage::resolver::PathResolver;
use depot_storage::trash;
use std::sync::Arc;
use tempfile::TempDir;

const PATH: &str = "org/example/widget/1.0/widget-1.0.jar";

async fn deploy_with_sidecars(resolver: &PathResolver, repository_id: &str, relative: &str) {
    write_hosted_artifact(resolver, repository_id, relative, b"jar bytes").await;
    let root = resolver
        .resolve_root(STORAGE_ID, repository_id)
        .await
        .unwrap();
    let path = root.resolve(relative).unwrap();
    let set = checksums::compute_file(&path).await.unwrap();
    checksums::write_sidecars(&path, &set).await.unwrap();
}

fn trashed_resolver(temp: &TempDir) -> Arc<PathResolver> {
    resolver_for(snapshot(
        temp,
        vec![Repository::hosted("releases").with_trash(true)],
    ))
}

#[tokio::test]
async fn delete_moves_artifact_and_sidecars_into_trash() {
    let temp = TempDir::new().unwrap();
    let resolver = trashed_resolver(&temp);
    deploy_with_sidecars(&resolver, "releases", PATH).await;

    let root = resolver.resolve_root(STORAGE_ID, "releases").await.unwrap();
    let (_, repository) = resolver.repository(STORAGE_ID, "releases").unwrap();
    trash::delete(&root, repository, PATH, false).await.unwrap();

    let live = root.resolve(PATH).unwrap();
    assert!(!live.absolute().exists());
    for (_, sidecar) in live.sidecars() {
        assert!(!sidecar.absolute().exists());
    }

    let trashed = root.trash_dir().join(PATH);
    assert_eq!(tokio::fs::read(&trashed).await.unwrap(), b"jar bytes");
    assert!(root
        .trash_dir()
        .join(format!("{PATH}.{}", ChecksumAlgorithm::Sha256.extension()))
        .exists());

    // Deleted artifacts disappear from resolution.
    let outcome = resolver.resolve(STORAGE_ID, "releases", PATH).await.unwrap();
    assert!(outcome.is_none());
}

#[tokio::test]
async fn restore_brings_artifact_and_sidecars_back() {
    let temp = TempDir::new().unwrap();
    let resolver = trashed_resolver(&temp);
    deploy_with_sidecars(&resolver, "releases", PATH).await;

    let root = resolver.resolve_root(STORAGE_ID, "releases").await.unwrap();
    trash::move_to_trash(&root, PATH).await.unwrap();
    trash::restore(&root, PATH).await.unwrap();

    let live = root.resolve(PATH).unwrap();
    assert_eq!(tokio::fs::read(live.absolute()).await.unwrap(), b"jar bytes");
    checksums::verify(&live).await.unwrap();
    assert!(!root.trash_dir().join(PATH).exists());
}

#[tokio::test]
async fn purge_empties_the_trash_but_keeps_live_content() {
    let temp = TempDir::new().unwrap();
    let resolver = trashed_resolver(&temp);
    deploy_with_sidecars(&resolver, "releases", PATH).await;
    deploy_with_sidecars(&resolver, "releases", "org/example/other/1.0/other-1.0.jar").await;

    let root = resolver.resolve_root(STORAGE_ID, "releases").await.unwrap();
    trash::move_to_trash(&root, PATH).await.unwrap();
    trash::purge(&root).await.unwrap();

    assert!(!root.trash_dir().join(PATH).exists());
    // The survivor stays resolvable after the purge.
    let survivor = resolver
        .resolve(STORAGE_ID, "releases", "org/example/other/1.0/other-1.0.jar")
        .await
        .unwrap();
    assert!(survivor.is_some());
    // Purged artifacts are gone for good.
    assert!(resolver
        .resolve(STORAGE_ID, "releases", PATH)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn purge_all_covers_every_repository_in_the_storage() {
    let temp = TempDir::new().unwrap();
    let resolver = resolver_for(snapshot(
        &temp,
        vec![
            Repository::hosted("releases").with_trash(true),
            Repository::hosted("snapshots").with_trash(true),
        ],
    ));
    for repository_id in ["releases", "snapshots"] {
        deploy_with_sidecars(&resolver, repository_id, PATH).await;
        let root = resolver
            .resolve_root(STORAGE_ID, repository_id)
            .await
            .unwrap();
        trash::move_to_trash(&root, PATH).await.unwrap();
    }

    trash::purge_all(&resolver, STORAGE_ID).await.unwrap();

    for repository_id in ["releases", "snapshots"] {
        let root = resolver
            .resolve_root(STORAGE_ID, repository_id)
            .await
            .unwrap();
        assert!(!root.trash_dir().join(PATH).exists());
    }
}

#[tokio::test]
async fn force_delete_bypasses_trash_only_when_allowed() {
    let temp = TempDir::new().unwrap();
    let resolver = resolver_for(snapshot(
        &temp,
        vec![
            Repository::hosted("permissive")
                .with_trash(true)
                .with_force_deletion(true),
            Repository::hosted("strict").with_trash(true),
        ],
    ));

    // force + allowed: straight to permanent deletion.
    deploy_with_sidecars(&resolver, "permissive", PATH).await;
    let root = resolver
        .resolve_root(STORAGE_ID, "permissive")
        .await
        .unwrap();
    let (_, repository) = resolver.repository(STORAGE_ID, "permissive").unwrap();
    trash::delete(&root, repository, PATH, true).await.unwrap();
    assert!(!root.resolve(PATH).unwrap().absolute().exists());
    assert!(!root.trash_dir().join(PATH).exists());

    // force + forbidden: degrades to a trash move.
    deploy_with_sidecars(&resolver, "strict", PATH).await;
    let root = resolver.resolve_root(STORAGE_ID, "strict").await.unwrap();
    let (_, repository) = resolver.repository(STORAGE_ID, "strict").unwrap();
    trash::delete(&root, repository, PATH, true).await.unwrap();
    assert!(!root.resolve(PATH).unwrap().absolute().exists());
    assert!(root.trash_dir().join(PATH).exists());
}

#[tokio::test]
async fn trash_disabled_repository_deletes_permanently() {
    let temp = TempDir::new().unwrap();
    let resolver = resolver_for(snapshot(&temp, vec![Repository::hosted("releases")]));
    deploy_with_sidecars(&resolver, "releases", PATH).await;

    let root = resolver.resolve_root(STORAGE_ID, "releases").await.unwrap();
    let (_, repository) = resolver.repository(STORAGE_ID, "releases").unwrap();
    trash::delete(&root, repository, PATH, false).await.unwrap();

    assert!(!root.resolve(PATH).unwrap().absolute().exists());
    assert!(!root.trash_dir().exists() || !root.trash_dir().join(PATH).exists());
}

#[tokio::test]
async fn deleting_a_missing_artifact_is_an_error() {
    let temp = TempDir::new().unwrap();
    let resolver = resolver_for(snapshot(&temp, vec![Repository::hosted("releases")]));
    let root = resolver.resolve_root(STORAGE_ID, "releases").await.unwrap();

    assert!(trash::permanent_delete(&root, PATH).await.is_err());
}

#[tokio::test]
async fn index_tree_is_never_touched() {
    let temp = TempDir::new().unwrap();
    let resolver = trashed_resolver(&temp);
    deploy_with_sidecars(&resolver, "releases", PATH).await;

    let root = resolver.resolve_root(STORAGE_ID, "releases").await.unwrap();
    tokio::fs::create_dir_all(root.index_dir()).await.unwrap();
    tokio::fs::write(root.index_dir().join("segments"), b"index data")
        .await
        .unwrap();

    trash::move_to_trash(&root, PATH).await.unwrap();
    trash::purge(&root).await.unwrap();

    assert_eq!(
        tokio::fs::read(root.index_dir().join("segments"))
            .await
            .unwrap(),
        b"index data"
    );
}
