//! # Cache Engine
//!
//! Creates or updates the bare cache atomically under the cache lock,
//! validates integrity, and coordinates backup/restore on failure (spec
//! section 4.5). `cache_path` is, at every observable moment, either
//! missing, the prior valid cache, or the new valid cache — never
//! half-populated.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use fs2::free_space;
use log::{info, warn};

use crate::defaults::{MIN_FREE_MB, SYNC_MARKER_FILE};
use crate::error::{Error, Result};
use crate::runner::GitOperations;

/// Runs the six-step create-or-update protocol against `cache_path`.
///
/// The cache lock (spec section 4.5 steps 1 and 6) is acquired and released
/// by the caller around this call — the Orchestrator's pipeline (spec
/// section 2) already holds it for the full `clone` request, and locking is
/// not reentrant (spec section 4.3), so this function must not acquire it
/// again.
pub fn ensure_cache(git: &dyn GitOperations, origin_url: &str, cache_path: &Path) -> Result<()> {
    if cache_path.exists() {
        if git.is_bare_valid(cache_path) {
            info!("cache at {} is valid, fetching updates", cache_path.display());
            git.fetch_all(cache_path)?;
            write_sync_marker(cache_path)?;
            return Ok(());
        }
        warn!("cache at {} failed validation, quarantining", cache_path.display());
        quarantine_corrupt(cache_path)?;
    }

    create_fresh(git, origin_url, cache_path)?;
    write_sync_marker(cache_path)?;
    Ok(())
}

fn create_fresh(git: &dyn GitOperations, origin_url: &str, cache_path: &Path) -> Result<()> {
    check_free_space(cache_path)?;

    let parent = cache_path
        .parent()
        .ok_or_else(|| Error::RepoCorrupt {
            path: cache_path.display().to_string(),
            message: "cache path has no parent directory".to_string(),
        })?;
    fs::create_dir_all(parent)?;
    set_dir_mode(parent);

    let backup_path = backup_path_for(cache_path);
    let had_backup = cache_path.exists();
    if had_backup {
        fs::rename(cache_path, &backup_path)?;
    }

    let tmp_path = sibling_tmp_path(cache_path);
    if tmp_path.exists() {
        fs::remove_dir_all(&tmp_path)?;
    }

    match git.clone_bare(origin_url, &tmp_path) {
        Ok(()) => {
            if let Err(e) = fs::rename(&tmp_path, cache_path) {
                let _ = fs::remove_dir_all(&tmp_path);
                restore_backup_if_present(&backup_path, cache_path, had_backup);
                return Err(Error::Io(e));
            }
            if !git.is_bare_valid(cache_path) {
                restore_backup_if_present(&backup_path, cache_path, had_backup);
                return Err(Error::RepoCorrupt {
                    path: cache_path.display().to_string(),
                    message: "freshly cloned cache failed post-clone validation".to_string(),
                });
            }
            if had_backup {
                fs::remove_dir_all(&backup_path).ok();
            }
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_dir_all(&tmp_path);
            restore_backup_if_present(&backup_path, cache_path, had_backup);
            Err(e)
        }
    }
}

fn restore_backup_if_present(backup_path: &Path, cache_path: &Path, had_backup: bool) {
    if had_backup && backup_path.exists() {
        let _ = fs::rename(backup_path, cache_path);
    }
}

fn check_free_space(cache_path: &Path) -> Result<()> {
    let mut probe = cache_path.to_path_buf();
    while !probe.exists() {
        match probe.parent() {
            Some(parent) => probe = parent.to_path_buf(),
            None => break,
        }
    }
    let available_bytes = free_space(&probe).unwrap_or(u64::MAX);
    let available_mb = available_bytes / (1024 * 1024);
    if available_mb < MIN_FREE_MB {
        return Err(Error::DiskFull {
            path: probe.display().to_string(),
            available_mb,
            required_mb: MIN_FREE_MB,
        });
    }
    Ok(())
}

#[cfg(unix)]
fn set_dir_mode(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(metadata) = fs::metadata(path) {
        let mut perms = metadata.permissions();
        perms.set_mode(0o755);
        let _ = fs::set_permissions(path, perms);
    }
}

#[cfg(not(unix))]
fn set_dir_mode(_path: &Path) {}

fn quarantine_corrupt(cache_path: &Path) -> Result<()> {
    let quarantine_path = timestamped_sibling(cache_path, "corrupt");
    fs::rename(cache_path, &quarantine_path)?;
    Ok(())
}

fn backup_path_for(cache_path: &Path) -> PathBuf {
    timestamped_sibling(cache_path, "bak")
}

fn sibling_tmp_path(cache_path: &Path) -> PathBuf {
    let mut os_string = cache_path.as_os_str().to_os_string();
    os_string.push(".tmp");
    PathBuf::from(os_string)
}

fn timestamped_sibling(cache_path: &Path, label: &str) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let mut os_string = cache_path.as_os_str().to_os_string();
    os_string.push(format!(".{label}.{ts}"));
    PathBuf::from(os_string)
}

/// Writes the `.gitcache-sync` sidecar with the current time (spec section
/// 4.5 step 5). Exposed so callers outside this module (e.g. the
/// Orchestrator's `sync` fan-out) can record a fresh successful fetch
/// without re-running the full create-or-update protocol.
pub fn write_sync_marker(cache_path: &Path) -> Result<()> {
    let marker_path = cache_path.join(SYNC_MARKER_FILE);
    let timestamp = Utc::now().to_rfc3339();
    fs::write(marker_path, timestamp)?;
    Ok(())
}

/// Reads the `.gitcache-sync` sidecar, if present.
pub fn read_sync_marker(cache_path: &Path) -> Option<chrono::DateTime<Utc>> {
    let marker_path = cache_path.join(SYNC_MARKER_FILE);
    let contents = fs::read_to_string(marker_path).ok()?;
    chrono::DateTime::parse_from_rfc3339(contents.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
