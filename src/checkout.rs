//! # Checkout Builder
//!
//! Materializes the read-only and modifiable checkouts as object-sharing
//! clones of the bare cache, under the selected strategy (spec section 4.6).

use std::fs;
use std::path::Path;

use log::info;

use crate::error::{Error, Result};
use crate::record::Strategy;
use crate::runner::GitOperations;

/// An invalid sentinel push URL used to disable push on read-only checkouts.
/// `git` refuses to push to it, which is the point.
const PUSH_DISABLED_SENTINEL: &str = "no-push:read-only-checkout";

/// Builds a checkout at `target` from `cache_path`, wiring its upstream to
/// `origin_url` rather than the cache path, per spec section 4.6 step 3.
///
/// If `read_only` is true, push is disabled on `origin`. Callers are
/// responsible for invoking the Remote Programmer afterward for modifiable
/// checkouts; this function only prepares `origin`.
pub fn build(
    git: &dyn GitOperations,
    cache_path: &Path,
    target: &Path,
    origin_url: &str,
    strategy: &Strategy,
    read_only: bool,
    force: bool,
) -> Result<()> {
    refuse_nonempty_unless_forced(target, force)?;

    git.clone_with_alternate(cache_path, target, strategy)?;
    verify_alternate_is_absolute(cache_path, target)?;

    git.set_remote_url(target, "origin", origin_url)?;

    if read_only {
        git.set_remote_push_url(target, "origin", PUSH_DISABLED_SENTINEL)?;
    }

    info!(
        "checkout built at {} (strategy={strategy}, read_only={read_only})",
        target.display()
    );
    Ok(())
}

fn refuse_nonempty_unless_forced(target: &Path, force: bool) -> Result<()> {
    if !target.exists() {
        return Ok(());
    }
    let is_empty = fs::read_dir(target)?.next().is_none();
    if is_empty {
        return Ok(());
    }
    if !force {
        return Err(Error::RepoCorrupt {
            path: target.display().to_string(),
            message: "target checkout path exists and is non-empty; pass --force to remove it"
                .to_string(),
        });
    }
    fs::remove_dir_all(target)?;
    Ok(())
}

/// Confirms the checkout's alternates file contains an absolute, canonical
/// path to the cache's object directory (spec section 4.6, "never float").
fn verify_alternate_is_absolute(cache_path: &Path, target: &Path) -> Result<()> {
    let alternates_path = target.join(".git").join("objects").join("info").join("alternates");
    if !alternates_path.exists() {
        // `git clone --shared` always writes this file for a local source;
        // its absence indicates the clone did not share objects as expected.
        return Err(Error::RepoCorrupt {
            path: target.display().to_string(),
            message: "checkout has no alternates file; object sharing was not established"
                .to_string(),
        });
    }
    let contents = fs::read_to_string(&alternates_path)?;
    let recorded = contents.lines().next().unwrap_or("").trim();
    if recorded.is_empty() {
        return Err(Error::RepoCorrupt {
            path: target.display().to_string(),
            message: "alternates file is empty".to_string(),
        });
    }
    if !Path::new(recorded).is_absolute() {
        return Err(Error::RepoCorrupt {
            path: target.display().to_string(),
            message: "alternates file does not reference an absolute path".to_string(),
        });
    }
    let expected = cache_path.join("objects");
    if !Path::new(recorded).ends_with(&expected) {
        return Err(Error::RepoCorrupt {
            path: target.display().to_string(),
            message: format!(
                "alternates file points at {recorded}, not the expected cache at {}",
                expected.display()
            ),
        });
    }
    Ok(())
}
