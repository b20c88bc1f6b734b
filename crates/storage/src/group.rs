//! Group repository fan-out.
//!
//! A group resolves a request against its ordered member list, depth-first,
//! returning the first member that yields an existing artifact. Members may
//! themselves be groups; a visited set keyed by repository identity rejects
//! membership cycles. Remote fetch failures of one member do not fail the
//! group, the next candidate is tried.

use crate::error::{StorageError, StorageResult};
use crate::paths::{RepositoryKey, RepositoryPath};
use crate::resolver::PathResolver;
use depot_core::{GroupMember, Repository};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Resolve `relative` through the members of a group, first match wins.
pub(crate) async fn resolve(
    resolver: &PathResolver,
    storage_id: &str,
    group: &Repository,
    members: &[GroupMember],
    relative: &str,
    visited: &mut BTreeSet<RepositoryKey>,
) -> StorageResult<Option<RepositoryPath>> {
    let key = RepositoryKey::new(storage_id, &group.id);
    if !visited.insert(key.clone()) {
        return Err(StorageError::CyclicGroupDefinition(key.to_string()));
    }

    for member in members {
        let (member_storage, member_repository) = resolver
            .config()
            .member(storage_id, member)
            .ok_or_else(|| StorageError::UnknownRepository {
                storage_id: member.storage_id.clone().unwrap_or_else(|| storage_id.to_string()),
                repository_id: member.repository_id.clone(),
            })?;

        let member_storage_id = member_storage.id.clone();
        match resolver
            .resolve_repository(&member_storage_id, member_repository, relative, visited)
            .await
        {
            Ok(Some(path)) => {
                debug!(group = %key, member = %path.repository_key(), "group member satisfied request");
                visited.remove(&key);
                return Ok(Some(path));
            }
            Ok(None) => {}
            // A failing remote is not fatal to the group; try the next
            // candidate in order.
            Err(e @ StorageError::RemoteFetch { .. }) => {
                warn!(group = %key, member = %member.repository_id, error = %e,
                    "group member failed, trying next");
            }
            Err(e) => {
                visited.remove(&key);
                return Err(e);
            }
        }
    }

    visited.remove(&key);
    Ok(None)
}

/// Aggregate member listings, de-duplicated by relative path; the first
/// member in configured order wins.
pub(crate) async fn browse(
    resolver: &PathResolver,
    storage_id: &str,
    group: &Repository,
    members: &[GroupMember],
    prefix: &str,
    visited: &mut BTreeSet<RepositoryKey>,
) -> StorageResult<Vec<String>> {
    let key = RepositoryKey::new(storage_id, &group.id);
    if !visited.insert(key.clone()) {
        return Err(StorageError::CyclicGroupDefinition(key.to_string()));
    }

    let mut seen = BTreeSet::new();
    let mut results = Vec::new();
    for member in members {
        let (member_storage, member_repository) = resolver
            .config()
            .member(storage_id, member)
            .ok_or_else(|| StorageError::UnknownRepository {
                storage_id: member.storage_id.clone().unwrap_or_else(|| storage_id.to_string()),
                repository_id: member.repository_id.clone(),
            })?;

        let member_storage_id = member_storage.id.clone();
        let listing = resolver
            .browse_repository(&member_storage_id, member_repository, prefix, visited)
            .await?;
        for path in listing {
            if seen.insert(path.clone()) {
                results.push(path);
            }
        }
    }

    visited.remove(&key);
    results.sort();
    Ok(results)
}
