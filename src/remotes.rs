//! # Remote Programmer
//!
//! On the modifiable checkout, programs the fixed remote set `origin`,
//! `mirror-github`, `mirror-local`, `upstream` to the canonical URLs (spec
//! section 4.8). Idempotent: re-running with the same inputs leaves `git
//! config` byte-identical.

use std::path::Path;

use log::info;

use crate::error::Result;
use crate::runner::GitOperations;

/// Inputs the Remote Programmer needs to wire a modifiable checkout.
pub struct RemotePlan<'a> {
    pub upstream_https_url: &'a str,
    pub fork_ssh_url: Option<&'a str>,
    pub local_mirror_ssh_url: Option<&'a str>,
}

/// Programs `repo`'s remotes per the table of spec section 4.8.
///
/// When `fork_ssh_url` is `None` (provider integration disabled or failed),
/// the mirror remotes are omitted and `origin` folds to the upstream URL for
/// both fetch and push.
pub fn program(git: &dyn GitOperations, repo: &Path, plan: &RemotePlan<'_>) -> Result<()> {
    let origin_push = plan.fork_ssh_url.unwrap_or(plan.upstream_https_url);
    set_remote(git, repo, "origin", plan.upstream_https_url, Some(origin_push))?;
    set_remote(git, repo, "upstream", plan.upstream_https_url, Some(plan.upstream_https_url))?;

    if let Some(fork_url) = plan.fork_ssh_url {
        set_remote(git, repo, "mirror-github", fork_url, Some(fork_url))?;
    }
    if let Some(local_url) = plan.local_mirror_ssh_url {
        if plan.fork_ssh_url.is_some() {
            set_remote(git, repo, "mirror-local", local_url, Some(local_url))?;
        }
    }

    info!("remotes programmed on {}", repo.display());
    Ok(())
}

fn set_remote(
    git: &dyn GitOperations,
    repo: &Path,
    name: &str,
    fetch_url: &str,
    push_url: Option<&str>,
) -> Result<()> {
    if git.remote_exists(repo, name)? {
        git.set_remote_url(repo, name, fetch_url)?;
    } else {
        git.add_remote(repo, name, fetch_url)?;
    }
    if let Some(push) = push_url {
        git.set_remote_push_url(repo, name, push)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::mock::{Call, MockGitOperations};
    use std::path::PathBuf;

    fn repo() -> PathBuf {
        PathBuf::from("/checkout/me/octocat-Hello-World")
    }

    #[test]
    fn test_programs_full_remote_set_with_fork() {
        let git = MockGitOperations::new();
        let plan = RemotePlan {
            upstream_https_url: "https://github.com/octocat/Hello-World.git",
            fork_ssh_url: Some("git@github.com:me/Hello-World.git"),
            local_mirror_ssh_url: Some("git@local:me/Hello-World.git"),
        };
        program(&git, &repo(), &plan).unwrap();

        let calls = git.calls.lock().unwrap();
        let added: Vec<&str> = calls
            .iter()
            .filter_map(|c| match c {
                Call::AddRemote { remote, .. } => Some(remote.as_str()),
                _ => None,
            })
            .collect();
        assert!(added.contains(&"origin"));
        assert!(added.contains(&"upstream"));
        assert!(added.contains(&"mirror-github"));
        assert!(added.contains(&"mirror-local"));
    }

    #[test]
    fn test_omits_mirrors_without_fork() {
        let git = MockGitOperations::new();
        let plan = RemotePlan {
            upstream_https_url: "https://github.com/octocat/Hello-World.git",
            fork_ssh_url: None,
            local_mirror_ssh_url: Some("git@local:me/Hello-World.git"),
        };
        program(&git, &repo(), &plan).unwrap();

        let calls = git.calls.lock().unwrap();
        let added: Vec<&str> = calls
            .iter()
            .filter_map(|c| match c {
                Call::AddRemote { remote, .. } => Some(remote.as_str()),
                _ => None,
            })
            .collect();
        assert!(!added.contains(&"mirror-github"));
        assert!(!added.contains(&"mirror-local"));

        let origin_push = calls.iter().find_map(|c| match c {
            Call::SetRemotePushUrl { remote, url, .. } if remote == "origin" => Some(url.clone()),
            _ => None,
        });
        assert_eq!(origin_push.as_deref(), Some(plan.upstream_https_url));
    }

    #[test]
    fn test_idempotent_rerun_updates_rather_than_duplicates() {
        let git = MockGitOperations::new();
        let plan = RemotePlan {
            upstream_https_url: "https://github.com/octocat/Hello-World.git",
            fork_ssh_url: Some("git@github.com:me/Hello-World.git"),
            local_mirror_ssh_url: None,
        };
        program(&git, &repo(), &plan).unwrap();
        program(&git, &repo(), &plan).unwrap();

        let calls = git.calls.lock().unwrap();
        let origin_adds = calls
            .iter()
            .filter(|c| matches!(c, Call::AddRemote { remote, .. } if remote == "origin"))
            .count();
        assert_eq!(origin_adds, 1, "origin should only be added once, then updated in place");
    }
}
