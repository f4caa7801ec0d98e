//! # Path Planner
//!
//! Given a canonical identity and the user's configured roots, computes the
//! three target paths (bare cache, read-only checkout, modifiable checkout)
//! and the cache's lock path (spec section 4.2).

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::record::RepoIdentity;

/// The four paths the planner derives for one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub cache_path: PathBuf,
    pub readonly_path: PathBuf,
    pub modifiable_path: PathBuf,
    pub lock_path: PathBuf,
}

/// Computes the `Plan` for `identity` under `cache_root`/`checkout_root`,
/// nesting the modifiable checkout under `fork_namespace`.
///
/// Refuses to produce a path whose components would escape `cache_root` or
/// `checkout_root` once symlinks in intermediate directories are resolved.
pub fn plan(
    identity: &RepoIdentity,
    cache_root: &Path,
    checkout_root: &Path,
    fork_namespace: &str,
) -> Result<Plan> {
    validate_component(&identity.host)?;
    validate_component(&identity.owner)?;
    validate_component(&identity.name)?;
    validate_component(fork_namespace)?;

    let cache_path = cache_root.join(&identity.host).join(&identity.owner).join(&identity.name);
    let readonly_path = checkout_root.join(&identity.owner).join(&identity.name);
    let modifiable_dir_name = format!("{}-{}", identity.owner, identity.name);
    let modifiable_path = checkout_root.join(fork_namespace).join(modifiable_dir_name);
    let lock_path = with_lock_suffix(&cache_path);

    ensure_within_root(&cache_path, cache_root)?;
    ensure_within_root(&readonly_path, checkout_root)?;
    ensure_within_root(&modifiable_path, checkout_root)?;

    Ok(Plan {
        cache_path,
        readonly_path,
        modifiable_path,
        lock_path,
    })
}

fn with_lock_suffix(cache_path: &Path) -> PathBuf {
    let mut os_string = cache_path.as_os_str().to_os_string();
    os_string.push(".lock");
    PathBuf::from(os_string)
}

/// Restricts path components to a conservative character set: alphanumerics,
/// `-`, `_`, `.`. Rejects empty strings and any embedded path separator.
fn validate_component(component: &str) -> Result<()> {
    if component.is_empty() {
        return Err(Error::UrlInvalid {
            url: component.to_string(),
            message: "empty path component".to_string(),
        });
    }
    let allowed = component
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if !allowed {
        return Err(Error::UrlInvalid {
            url: component.to_string(),
            message: "path component contains characters outside the conservative set".to_string(),
        });
    }
    if component.contains("..") {
        return Err(Error::UrlInvalid {
            url: component.to_string(),
            message: "path component contains '..'".to_string(),
        });
    }
    Ok(())
}

/// Confirms `candidate` does not escape `root` once symlinks along any
/// already-existing prefix of `candidate` are resolved. Non-existent
/// components (the common case for a not-yet-created cache entry) are
/// accepted as-is since there is nothing to resolve yet; existing ancestors
/// are canonicalized and checked for containment.
fn ensure_within_root(candidate: &Path, root: &Path) -> Result<()> {
    if !candidate.starts_with(root) {
        return Err(Error::UrlInvalid {
            url: candidate.display().to_string(),
            message: "path is not lexically under its configured root".to_string(),
        });
    }
    if !root.exists() {
        // Nothing under root exists yet, so there is no symlink to resolve.
        return Ok(());
    }
    let canonical_root = root.canonicalize()?;

    let mut existing_ancestor = candidate;
    while !existing_ancestor.exists() {
        match existing_ancestor.parent() {
            Some(parent) if parent.starts_with(root) => existing_ancestor = parent,
            _ => return Ok(()),
        }
    }
    let canonical_ancestor = existing_ancestor.canonicalize()?;
    if !canonical_ancestor.starts_with(&canonical_root) {
        return Err(Error::UrlInvalid {
            url: candidate.display().to_string(),
            message: "path escapes its configured root via symlink resolution".to_string(),
        });
    }
    Ok(())
}
