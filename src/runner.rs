//! # Repo Runner
//!
//! Thin typed wrapper that invokes the external `git` binary, capturing exit
//! codes and output, classifying nonzero exits, and retrying transient
//! network failures with capped exponential backoff (spec section 4.4).
//!
//! `git` is always invoked through an argument vector, never a shell string.
//! `RepoRunner` is the sole gateway to the binary; every other module talks
//! to it through the `GitOperations` trait so tests can substitute a fake
//! implementation that records invocations (Design Note "Subprocess
//! coupling"), mirrored after the teacher's `GitOperations`/
//! `DefaultGitOperations` split in `repository.rs`.

use std::path::Path;
use std::process::{Command, Output};
use std::time::{Duration, Instant};

use backoff::{backoff::Backoff, ExponentialBackoffBuilder};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};

use crate::defaults::{GIT_BACKOFF_MAX, GIT_BACKOFF_START, MAX_RETRIES, SPINNER_THRESHOLD};
use crate::error::{Error, Result};

/// Classification of a nonzero git exit, matched against well-known stderr
/// substrings (spec section 4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitFailureKind {
    NetworkTransient,
    PermissionDenied,
    RepoNotFound,
    Other,
}

fn classify_stderr(stderr: &str) -> GitFailureKind {
    if stderr.contains("Could not resolve host")
        || stderr.contains("Connection timed out")
        || stderr.contains("Connection refused")
        || stderr.contains("Could not read from remote repository")
    {
        GitFailureKind::NetworkTransient
    } else if stderr.contains("Authentication failed") || stderr.contains("Permission denied") {
        GitFailureKind::PermissionDenied
    } else if stderr.contains("repository not found") || stderr.contains("not found") {
        GitFailureKind::RepoNotFound
    } else {
        GitFailureKind::Other
    }
}

/// Operations the rest of the crate needs from the `git` binary.
///
/// Kept deliberately small: every call that shells out lives here, so tests
/// can substitute `MockGitOperations` and assert on exactly which commands
/// were issued without touching a real filesystem or network.
pub trait GitOperations: Send + Sync {
    fn clone_bare(&self, url: &str, target: &Path) -> Result<()>;
    fn fetch_all(&self, repo: &Path) -> Result<()>;
    fn clone_with_alternate(
        &self,
        cache_path: &Path,
        target: &Path,
        strategy: &crate::record::Strategy,
    ) -> Result<()>;
    fn set_remote_url(&self, repo: &Path, remote: &str, fetch_url: &str) -> Result<()>;
    fn set_remote_push_url(&self, repo: &Path, remote: &str, push_url: &str) -> Result<()>;
    fn add_remote(&self, repo: &Path, remote: &str, url: &str) -> Result<()>;
    fn remote_exists(&self, repo: &Path, remote: &str) -> Result<bool>;
    fn is_bare_valid(&self, repo: &Path) -> bool;
    fn ref_count(&self, repo: &Path) -> Result<usize>;
    fn update_submodules(&self, repo: &Path) -> Result<()>;
}

/// Production `GitOperations`, invoking the real `git` binary.
pub struct DefaultGitOperations;

impl DefaultGitOperations {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, args: &[&str], cwd: Option<&Path>) -> Result<Output> {
        run_with_retry(args, cwd)
    }
}

impl Default for DefaultGitOperations {
    fn default() -> Self {
        Self::new()
    }
}

impl GitOperations for DefaultGitOperations {
    fn clone_bare(&self, url: &str, target: &Path) -> Result<()> {
        let target_str = target.to_string_lossy().to_string();
        let args = ["clone", "--bare", url, &target_str];
        self.run(&args, None)?;
        Ok(())
    }

    fn fetch_all(&self, repo: &Path) -> Result<()> {
        let args = ["fetch", "origin", "+refs/*:refs/*", "--prune", "--tags"];
        self.run(&args, Some(repo))?;
        Ok(())
    }

    fn clone_with_alternate(
        &self,
        cache_path: &Path,
        target: &Path,
        strategy: &crate::record::Strategy,
    ) -> Result<()> {
        let cache_str = cache_path.to_string_lossy().to_string();
        let target_str = target.to_string_lossy().to_string();
        let mut args: Vec<&str> = vec!["clone", "--shared"];
        let depth_str;
        match strategy {
            crate::record::Strategy::Full => {}
            crate::record::Strategy::Shallow { depth } => {
                depth_str = depth.to_string();
                args.push("--depth");
                args.push(&depth_str);
            }
            crate::record::Strategy::Treeless => {
                args.push("--filter=tree:0");
            }
            crate::record::Strategy::Blobless => {
                args.push("--filter=blob:none");
            }
        }
        args.push(&cache_str);
        args.push(&target_str);
        self.run(&args, None)?;
        Ok(())
    }

    fn set_remote_url(&self, repo: &Path, remote: &str, fetch_url: &str) -> Result<()> {
        let args = ["remote", "set-url", remote, fetch_url];
        self.run(&args, Some(repo))?;
        Ok(())
    }

    fn set_remote_push_url(&self, repo: &Path, remote: &str, push_url: &str) -> Result<()> {
        let args = ["remote", "set-url", "--push", remote, push_url];
        self.run(&args, Some(repo))?;
        Ok(())
    }

    fn add_remote(&self, repo: &Path, remote: &str, url: &str) -> Result<()> {
        let args = ["remote", "add", remote, url];
        self.run(&args, Some(repo))?;
        Ok(())
    }

    fn remote_exists(&self, repo: &Path, remote: &str) -> Result<bool> {
        let args = ["remote"];
        let output = self.run(&args, Some(repo))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().any(|line| line.trim() == remote))
    }

    fn is_bare_valid(&self, repo: &Path) -> bool {
        if !repo.join("HEAD").is_file() {
            return false;
        }
        if !repo.join("objects").is_dir() {
            return false;
        }
        let args = ["show-ref"];
        match self.run(&args, Some(repo)) {
            Ok(output) => output.status.success() || !output.stdout.is_empty(),
            Err(_) => false,
        }
    }

    fn ref_count(&self, repo: &Path) -> Result<usize> {
        let args = ["for-each-ref"];
        let output = self.run(&args, Some(repo))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().filter(|l| !l.trim().is_empty()).count())
    }

    fn update_submodules(&self, repo: &Path) -> Result<()> {
        let args = ["submodule", "update", "--init", "--recursive"];
        self.run(&args, Some(repo))?;
        Ok(())
    }
}

/// Runs `git <args>` with retry-on-`NetworkTransient`, a progress spinner
/// for long-running invocations, and typed error classification.
fn run_with_retry(args: &[&str], cwd: Option<&Path>) -> Result<Output> {
    let mut backoff = ExponentialBackoffBuilder::new()
        .with_initial_interval(GIT_BACKOFF_START)
        .with_max_interval(GIT_BACKOFF_MAX)
        .with_max_elapsed_time(None)
        .build();

    let mut attempt = 0;
    loop {
        attempt += 1;
        let started = Instant::now();
        let spinner = spinner_for(args);

        let mut command = Command::new("git");
        command.args(args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        let output = command.output().map_err(Error::Io)?;

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        let _ = started.elapsed();

        if output.status.success() {
            return Ok(output);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let kind = classify_stderr(&stderr);

        if kind == GitFailureKind::NetworkTransient && attempt < MAX_RETRIES {
            if let Some(wait) = backoff.next_backoff() {
                warn!(
                    "git {:?} failed transiently (attempt {attempt}/{MAX_RETRIES}), retrying in {:?}",
                    args, wait
                );
                std::thread::sleep(wait);
                continue;
            }
        }

        if kind == GitFailureKind::NetworkTransient {
            return Err(Error::NetworkFailed { message: stderr });
        }

        return Err(Error::GitCommand {
            command: format!("git {}", args.join(" ")),
            stderr,
        });
    }
}

fn spinner_for(args: &[&str]) -> Option<ProgressBar> {
    // Only clone/fetch operations are long enough to merit a spinner; the
    // bar is started unconditionally and cleared immediately if the command
    // finishes under the threshold, matching indicatif's steady-tick idiom.
    if !(args.first() == Some(&"clone") || args.first() == Some(&"fetch")) {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("git {}", args.join(" ")));
    pb.enable_steady_tick(Duration::from_millis(100));
    debug!("spinner started for git {:?} (threshold {:?})", args, SPINNER_THRESHOLD);
    Some(pb)
}
