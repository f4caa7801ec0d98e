//! # Inventory & Maintenance
//!
//! Enumerates cached repositories by walking `cache_root` two levels deep
//! (`host/owner/name`), producing on-disk size, last-sync timestamp, and ref
//! count, and detects each identity's checkout presence by path (spec
//! section 4.10). `list` and `status` are read-only and take no locks (spec
//! section 5).

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::cache_engine;
use crate::error::Result;
use crate::identity;
use crate::planner;
use crate::record::{RepoIdentity, RepoRecord, Strategy};

/// One cached repository as discovered by a filesystem scan, plus whether
/// its read-only and modifiable checkouts are currently present.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub record: RepoRecord,
    pub cache_path: PathBuf,
    pub readonly_present: bool,
    pub modifiable_present: bool,
    pub ref_count: usize,
    pub size_bytes: u64,
}

/// Walks `cache_root/<host>/<owner>/<name>` and builds one `CacheEntry` per
/// bare repository found, cross-referencing checkout presence under
/// `checkout_root` via the Path Planner's formulas.
///
/// A default fork namespace of `"*"` is used purely to compute the
/// modifiable path's parent for presence checks; since `list`/`status`
/// never write to disk, any `fork_namespace` value satisfying the planner's
/// conservative character set works for this read-only purpose, so the
/// caller's real namespace is threaded through via `fork_namespace`.
pub fn scan(cache_root: &Path, checkout_root: &Path) -> Result<Vec<CacheEntry>> {
    scan_with_namespace(cache_root, checkout_root, "me")
}

/// Same as `scan`, but lets the caller supply the configured fork namespace
/// so the modifiable-checkout presence check matches their actual layout.
pub fn scan_with_namespace(
    cache_root: &Path,
    checkout_root: &Path,
    fork_namespace: &str,
) -> Result<Vec<CacheEntry>> {
    let mut entries = Vec::new();
    if !cache_root.exists() {
        return Ok(entries);
    }

    for host_dir in direct_subdirs(cache_root)? {
        let host = match host_dir.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        for owner_dir in direct_subdirs(&host_dir)? {
            let owner = match owner_dir.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            for name_dir in direct_subdirs(&owner_dir)? {
                // Skip sidecar/backup/quarantine siblings, which are not
                // bare repositories: ".lock", ".bak.<ts>", ".corrupt.<ts>".
                let name = match name_dir.file_name().and_then(|n| n.to_str()) {
                    Some(name) if is_plain_repo_dir(name) => name.to_string(),
                    _ => continue,
                };

                let identity = RepoIdentity::new(host.clone(), owner.clone(), name.clone());
                let provider_class = identity::classify(&identity.host);
                let plan = match planner::plan(&identity, cache_root, checkout_root, fork_namespace)
                {
                    Ok(plan) => plan,
                    Err(_) => continue,
                };

                let ref_count = count_refs(&name_dir);
                let size_bytes = directory_size(&name_dir);
                let record = RepoRecord {
                    origin_url: identity.canonical_url(),
                    identity,
                    fork_url: None,
                    strategy: Strategy::Full,
                    cache_path: plan.cache_path.clone(),
                    readonly_path: plan.readonly_path.clone(),
                    modifiable_path: plan.modifiable_path.clone(),
                    last_sync: cache_engine::read_sync_marker(&name_dir),
                    provider_class,
                };

                entries.push(CacheEntry {
                    readonly_present: plan.readonly_path.exists(),
                    modifiable_present: plan.modifiable_path.exists(),
                    cache_path: plan.cache_path,
                    record,
                    ref_count,
                    size_bytes,
                });
            }
        }
    }

    Ok(entries)
}

fn is_plain_repo_dir(name: &str) -> bool {
    !name.ends_with(".lock") && !name.contains(".bak.") && !name.contains(".corrupt.")
}

fn direct_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    if !dir.is_dir() {
        return Ok(out);
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            out.push(entry.path());
        }
    }
    Ok(out)
}

/// Counts entries under `refs/` (spec section 4.10, "counts refs by
/// scanning `refs/` entries"). Loose refs only; packed-refs are not
/// unpacked here since this is an inexpensive inventory stat, not a
/// validation step.
fn count_refs(repo: &Path) -> usize {
    let refs_dir = repo.join("refs");
    if !refs_dir.is_dir() {
        return 0;
    }
    WalkDir::new(refs_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}

fn directory_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_empty_cache_root_returns_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let entries = scan(&tmp.path().join("nope"), tmp.path()).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_scan_finds_bare_repo_two_levels_deep() {
        let tmp = tempfile::tempdir().unwrap();
        let cache_root = tmp.path().join("cache");
        let checkout_root = tmp.path().join("work");
        let repo_dir = cache_root.join("github.com/octocat/Hello-World");
        fs::create_dir_all(repo_dir.join("refs/heads")).unwrap();
        fs::write(repo_dir.join("refs/heads/main"), "deadbeef").unwrap();
        fs::create_dir_all(&checkout_root).unwrap();

        let entries = scan(&cache_root, &checkout_root).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record.identity.owner, "octocat");
        assert_eq!(entries[0].ref_count, 1);
        assert!(!entries[0].readonly_present);
    }

    #[test]
    fn test_scan_skips_lock_and_backup_siblings() {
        let tmp = tempfile::tempdir().unwrap();
        let cache_root = tmp.path().join("cache");
        fs::create_dir_all(cache_root.join("github.com/octocat/Hello-World")).unwrap();
        fs::create_dir_all(cache_root.join("github.com/octocat/Hello-World.bak.123")).unwrap();
        fs::create_dir_all(cache_root.join("github.com/octocat/Hello-World.corrupt.456")).unwrap();

        let entries = scan(&cache_root, &tmp.path().join("work")).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record.identity.name, "Hello-World");
    }

    #[test]
    fn test_scan_detects_readonly_checkout_presence() {
        let tmp = tempfile::tempdir().unwrap();
        let cache_root = tmp.path().join("cache");
        let checkout_root = tmp.path().join("work");
        fs::create_dir_all(cache_root.join("github.com/octocat/Hello-World")).unwrap();
        fs::create_dir_all(checkout_root.join("octocat/Hello-World")).unwrap();

        let entries = scan(&cache_root, &checkout_root).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].readonly_present);
        assert!(!entries[0].modifiable_present);
    }
}
