//! # Orchestrator
//!
//! Entry points for `clone`, `status`, `list`, `sync`, `clean`. Each call
//! constructs a short-lived `RequestContext` and sequences the pipeline of
//! spec section 2, applying the compensations of spec section 4.9 on
//! failure.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use rayon::prelude::*;

use crate::cache_engine;
use crate::checkout;
use crate::config::Config;
use crate::defaults::LOCK_ACQUIRE_TIMEOUT;
use crate::error::{Error, Result};
use crate::identity;
use crate::inventory;
use crate::lock;
use crate::planner::{self, Plan};
use crate::provider::{ForkOutcome, ProviderClient};
use crate::record::{ProviderClass, RepoIdentity, RepoRecord, Strategy};
use crate::remotes::{self, RemotePlan};
use crate::runner::GitOperations;

/// A handle the caller can flip to request cooperative cancellation between
/// blocking steps (spec section 5).
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self, stage: &str) -> Result<()> {
        if self.is_canceled() {
            return Err(Error::Canceled {
                stage: stage.to_string(),
            });
        }
        Ok(())
    }
}

/// The per-request context every entry point builds before doing anything
/// else: a `Config` snapshot and a `CancellationToken`, per spec section 9
/// ("Global configuration").
pub struct RequestContext {
    pub config: Config,
    pub cancellation: CancellationToken,
}

impl RequestContext {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cancellation: CancellationToken::new(),
        }
    }
}

/// Options accepted by `clone`, mirroring the CLI flags of spec section 6.
pub struct CloneOptions {
    pub url: String,
    pub strategy: Strategy,
    pub force: bool,
    pub recursive: bool,
    pub org: Option<String>,
    pub private: bool,
    pub fork: bool,
}

/// Explicit stages of the single-`clone` state machine (spec section 4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parsed,
    Locked,
    CacheReady,
    Forked,
    ReadonlyBuilt,
    ModifiableBuilt,
    RemotesProgrammed,
    Done,
}

/// Runs the full `clone` pipeline: URL Parser -> Path Planner -> Lock
/// Manager -> Cache Engine -> Provider Client -> Checkout Builder (x2) ->
/// Remote Programmer -> Lock Manager (release).
///
/// A watchdog thread cancels `ctx.cancellation` if the pipeline runs past
/// `CLONE_TIMEOUT` (spec section 5, "300s default per clone of a single
/// cache"), so a stalled subprocess still terminates at the next stage
/// boundary rather than blocking indefinitely.
pub fn clone(ctx: &RequestContext, git: &dyn GitOperations, opts: &CloneOptions) -> Result<RepoRecord> {
    ctx.cancellation.check("Parsed")?;
    let identity = identity::parse(&opts.url)?;
    let provider_class = identity::classify(&identity.host);

    let plan = planner::plan(
        &identity,
        &ctx.config.cache_root,
        &ctx.config.checkout_root,
        &ctx.config.fork_namespace,
    )?;

    ctx.cancellation.check("Locked")?;
    let lock_handle = lock::acquire(&plan.lock_path, LOCK_ACQUIRE_TIMEOUT)?;

    let watchdog = CloneWatchdog::spawn(ctx.cancellation.clone());
    let result = run_locked_pipeline(ctx, git, opts, &identity, provider_class, &plan);
    watchdog.disarm();

    drop(lock_handle);
    result
}

/// Cancels the clone's `CancellationToken` if it is still running after
/// `CLONE_TIMEOUT`. Disarmed (no-op) once the pipeline finishes on time.
struct CloneWatchdog {
    done: Arc<AtomicBool>,
}

impl CloneWatchdog {
    fn spawn(cancellation: CancellationToken) -> Self {
        let done = Arc::new(AtomicBool::new(false));
        let done_for_thread = Arc::clone(&done);
        std::thread::spawn(move || {
            std::thread::sleep(crate::defaults::CLONE_TIMEOUT);
            if !done_for_thread.load(Ordering::SeqCst) {
                warn!("clone exceeded CLONE_TIMEOUT, requesting cancellation");
                cancellation.cancel();
            }
        });
        Self { done }
    }

    fn disarm(&self) {
        self.done.store(true, Ordering::SeqCst);
    }
}

fn run_locked_pipeline(
    ctx: &RequestContext,
    git: &dyn GitOperations,
    opts: &CloneOptions,
    identity: &RepoIdentity,
    provider_class: ProviderClass,
    plan: &Plan,
) -> Result<RepoRecord> {
    let origin_url = identity.canonical_url();

    ctx.cancellation.check("CacheReady")?;
    cache_engine::ensure_cache(git, &origin_url, &plan.cache_path).map_err(compensate_cache_failure)?;

    let mut fork_url: Option<String> = None;
    if opts.fork && provider_class == ProviderClass::GitHub {
        ctx.cancellation.check("Forked")?;
        match try_fork(ctx, identity, opts) {
            Ok(url) => fork_url = Some(url),
            Err(Error::ProviderAuth { message }) => {
                warn!("fork skipped, provider auth unavailable: {message}");
            }
            Err(e) => return Err(e),
        }
    }

    ctx.cancellation.check("ReadonlyBuilt")?;
    checkout::build(
        git,
        &plan.cache_path,
        &plan.readonly_path,
        &origin_url,
        &opts.strategy,
        true,
        opts.force,
    )
    .map_err(|e| compensate_readonly_failure(e, &plan.readonly_path))?;

    ctx.cancellation.check("ModifiableBuilt")?;
    if let Err(e) = checkout::build(
        git,
        &plan.cache_path,
        &plan.modifiable_path,
        &origin_url,
        &opts.strategy,
        false,
        opts.force,
    ) {
        // The read-only checkout is retained on failure of the modifiable
        // step (spec section 4.9).
        return Err(compensate_modifiable_failure(e, &plan.modifiable_path));
    }

    if opts.recursive {
        git.update_submodules(&plan.modifiable_path)
            .map_err(|e| compensate_modifiable_failure(e, &plan.modifiable_path))?;
    }

    ctx.cancellation.check("RemotesProgrammed")?;
    let remote_plan = RemotePlan {
        upstream_https_url: &origin_url,
        fork_ssh_url: fork_url.as_deref(),
        local_mirror_ssh_url: ctx.config.local_mirror_url.as_deref(),
    };
    remotes::program(git, &plan.modifiable_path, &remote_plan)?;

    info!("clone complete for {}/{}", identity.owner, identity.name);

    Ok(RepoRecord {
        identity: identity.clone(),
        origin_url,
        fork_url,
        strategy: opts.strategy,
        cache_path: plan.cache_path.clone(),
        readonly_path: plan.readonly_path.clone(),
        modifiable_path: plan.modifiable_path.clone(),
        last_sync: cache_engine::read_sync_marker(&plan.cache_path),
        provider_class,
    })
}

fn try_fork(ctx: &RequestContext, identity: &RepoIdentity, opts: &CloneOptions) -> Result<String> {
    let client = ProviderClient::new(ctx.config.github_token.clone())?;
    if ctx.config.github_token.is_none() {
        return Err(Error::ProviderAuth {
            message: "GITHUB_TOKEN not set".to_string(),
        });
    }
    let outcome = client.create_fork(&identity.owner, &identity.name, opts.org.as_deref())?;
    let fork_url = match outcome {
        ForkOutcome::Created { fork_url } => fork_url,
        ForkOutcome::AlreadyExists { fork_url } => fork_url,
    };
    if opts.private {
        let namespace = opts.org.as_deref().unwrap_or(&identity.owner);
        client.set_visibility(namespace, &identity.name, true)?;
    }
    Ok(fork_url)
}

/// Compensation: `CacheReady -> Locked` (restore backup, release lock). The
/// cache engine itself already restores its own backup on a failed create;
/// here we just propagate, since the lock is released by the caller's guard.
fn compensate_cache_failure(e: Error) -> Error {
    warn!("cache stage failed, compensating by leaving lock release to caller: {e}");
    e
}

/// Compensation: `ReadonlyBuilt -> CacheReady` (remove partial read-only dir).
fn compensate_readonly_failure(e: Error, readonly_path: &std::path::Path) -> Error {
    warn!("read-only checkout stage failed: {e}");
    remove_partial_checkout(readonly_path);
    e
}

/// Compensation: `ModifiableBuilt -> ReadonlyBuilt` (remove partial
/// modifiable dir; read-only checkout and cache are retained).
fn compensate_modifiable_failure(e: Error, modifiable_path: &std::path::Path) -> Error {
    warn!("modifiable checkout stage failed, read-only checkout retained: {e}");
    remove_partial_checkout(modifiable_path);
    e
}

/// Best-effort removal of a checkout directory left behind by a failed
/// build step, so no half-populated checkout remains visible under its
/// canonical name (spec section 4.9, invariant P4).
fn remove_partial_checkout(path: &std::path::Path) {
    if !path.exists() {
        return;
    }
    if let Err(e) = std::fs::remove_dir_all(path) {
        warn!("failed to remove partial checkout at {}: {e}", path.display());
    }
}

/// `status`: reports the on-disk state for one identity without taking any
/// lock (spec section 4.9, "`list` and `status` do not take locks").
pub fn status(ctx: &RequestContext, url: &str) -> Result<Option<RepoRecord>> {
    let identity = identity::parse(url)?;
    let provider_class = identity::classify(&identity.host);
    let plan = planner::plan(
        &identity,
        &ctx.config.cache_root,
        &ctx.config.checkout_root,
        &ctx.config.fork_namespace,
    )?;
    if !plan.cache_path.exists() {
        return Ok(None);
    }
    Ok(Some(RepoRecord {
        origin_url: identity.canonical_url(),
        identity,
        fork_url: None,
        strategy: Strategy::Full,
        cache_path: plan.cache_path.clone(),
        readonly_path: plan.readonly_path,
        modifiable_path: plan.modifiable_path,
        last_sync: cache_engine::read_sync_marker(&plan.cache_path),
        provider_class,
    }))
}

/// `list`: enumerates every cached identity via `inventory::scan`.
pub fn list(ctx: &RequestContext) -> Result<Vec<inventory::CacheEntry>> {
    inventory::scan_with_namespace(
        &ctx.config.cache_root,
        &ctx.config.checkout_root,
        &ctx.config.fork_namespace,
    )
}

/// `sync`: re-runs Cache Engine step 4 for every cached identity on a
/// bounded `rayon` pool, skipping identities whose lock is already held.
pub fn sync(
    ctx: &RequestContext,
    git: &(dyn GitOperations + Sync),
    max_parallel: usize,
) -> Result<Vec<(PathBuf, Result<()>)>> {
    let entries = inventory::scan_with_namespace(
        &ctx.config.cache_root,
        &ctx.config.checkout_root,
        &ctx.config.fork_namespace,
    )?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_parallel.max(1))
        .build()
        .map_err(|e| Error::LockPoisoned {
            context: format!("failed to build sync thread pool: {e}"),
        })?;

    let results: Vec<(PathBuf, Result<()>)> = pool.install(|| {
        entries
            .par_iter()
            .map(|entry| {
                let lock_path = lock_path_for(&entry.cache_path);
                let outcome = match lock::acquire(&lock_path, Duration::from_millis(100)) {
                    Ok(handle) => {
                        let r = git.fetch_all(&entry.cache_path);
                        if r.is_ok() {
                            if let Err(e) = cache_engine::write_sync_marker(&entry.cache_path) {
                                warn!(
                                    "failed to update sync marker for {}: {e}",
                                    entry.cache_path.display()
                                );
                            }
                        }
                        drop(handle);
                        r
                    }
                    Err(Error::LockTimeout { path }) => {
                        warn!("skipping {} during sync: lock already held", path);
                        Ok(())
                    }
                    Err(e) => Err(e),
                };
                (entry.cache_path.clone(), outcome)
            })
            .collect()
    });

    Ok(results)
}

fn lock_path_for(cache_path: &std::path::Path) -> PathBuf {
    let mut os_string = cache_path.as_os_str().to_os_string();
    os_string.push(".lock");
    PathBuf::from(os_string)
}

/// `clean`: verifies no checkout alternates-references a target cache
/// before deleting it (spec section 4.9/4.10, invariant P6).
pub fn clean(ctx: &RequestContext, filter: Option<&str>, force: bool) -> Result<Vec<PathBuf>> {
    let entries = inventory::scan_with_namespace(
        &ctx.config.cache_root,
        &ctx.config.checkout_root,
        &ctx.config.fork_namespace,
    )?;
    let mut removed = Vec::new();

    for entry in entries {
        if let Some(f) = filter {
            if !entry.record.identity.owner.eq_ignore_ascii_case(f)
                && !entry.record.identity.name.eq_ignore_ascii_case(f)
            {
                continue;
            }
        }
        let has_checkout = entry.readonly_present || entry.modifiable_present;
        if has_checkout && !force {
            warn!(
                "skipping {}: checkouts still present",
                entry.cache_path.display()
            );
            continue;
        }
        let lock_path = lock_path_for(&entry.cache_path);
        let handle = lock::acquire(&lock_path, LOCK_ACQUIRE_TIMEOUT)?;
        std::fs::remove_dir_all(&entry.cache_path)?;
        drop(handle);
        removed.push(entry.cache_path);
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_token_defaults_to_not_canceled() {
        let token = CancellationToken::new();
        assert!(!token.is_canceled());
        assert!(token.check("x").is_ok());
    }

    #[test]
    fn test_cancellation_token_reports_canceled() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(token.is_canceled());
        assert!(matches!(token.check("x"), Err(Error::Canceled { .. })));
    }

    #[test]
    fn test_clone_watchdog_disarm_before_timeout_leaves_token_uncanceled() {
        let token = CancellationToken::new();
        let watchdog = CloneWatchdog::spawn(token.clone());
        watchdog.disarm();
        std::thread::sleep(Duration::from_millis(20));
        assert!(!token.is_canceled());
    }

    #[test]
    fn test_compensate_readonly_failure_removes_partial_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let readonly_path = tmp.path().join("octocat/Hello-World");
        std::fs::create_dir_all(&readonly_path).unwrap();
        std::fs::write(readonly_path.join("partial"), b"x").unwrap();

        let err = Error::GitCommand {
            command: "git clone".to_string(),
            stderr: "boom".to_string(),
        };
        let _ = compensate_readonly_failure(err, &readonly_path);

        assert!(!readonly_path.exists());
    }

    #[test]
    fn test_compensate_modifiable_failure_removes_partial_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let modifiable_path = tmp.path().join("me/octocat-Hello-World");
        std::fs::create_dir_all(&modifiable_path).unwrap();

        let err = Error::GitCommand {
            command: "git remote".to_string(),
            stderr: "boom".to_string(),
        };
        let _ = compensate_modifiable_failure(err, &modifiable_path);

        assert!(!modifiable_path.exists());
    }

    #[test]
    fn test_compensate_failure_is_noop_when_target_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let missing_path = tmp.path().join("never-created");

        let err = Error::GitCommand {
            command: "git clone".to_string(),
            stderr: "boom".to_string(),
        };
        let _ = compensate_readonly_failure(err, &missing_path);

        assert!(!missing_path.exists());
    }

    /// A `GitOperations` double whose clone operations actually materialize
    /// a minimal checkout on disk (cache dir, alternates file), so the
    /// orchestrator's filesystem-backed validation steps can be exercised
    /// without a real `git` binary.
    struct MaterializingGitOperations(crate::runner::mock::MockGitOperations);

    impl GitOperations for MaterializingGitOperations {
        fn clone_bare(&self, url: &str, target: &std::path::Path) -> Result<()> {
            self.0.clone_bare(url, target)?;
            std::fs::create_dir_all(target)?;
            Ok(())
        }
        fn fetch_all(&self, repo: &std::path::Path) -> Result<()> {
            self.0.fetch_all(repo)
        }
        fn clone_with_alternate(
            &self,
            cache_path: &std::path::Path,
            target: &std::path::Path,
            strategy: &Strategy,
        ) -> Result<()> {
            self.0.clone_with_alternate(cache_path, target, strategy)?;
            let alt_dir = target.join(".git").join("objects").join("info");
            std::fs::create_dir_all(&alt_dir)?;
            std::fs::write(
                alt_dir.join("alternates"),
                cache_path.join("objects").display().to_string(),
            )?;
            Ok(())
        }
        fn set_remote_url(&self, repo: &std::path::Path, remote: &str, fetch_url: &str) -> Result<()> {
            self.0.set_remote_url(repo, remote, fetch_url)
        }
        fn set_remote_push_url(
            &self,
            repo: &std::path::Path,
            remote: &str,
            push_url: &str,
        ) -> Result<()> {
            self.0.set_remote_push_url(repo, remote, push_url)
        }
        fn add_remote(&self, repo: &std::path::Path, remote: &str, url: &str) -> Result<()> {
            self.0.add_remote(repo, remote, url)
        }
        fn remote_exists(&self, repo: &std::path::Path, remote: &str) -> Result<bool> {
            self.0.remote_exists(repo, remote)
        }
        fn is_bare_valid(&self, repo: &std::path::Path) -> bool {
            self.0.is_bare_valid(repo)
        }
        fn ref_count(&self, repo: &std::path::Path) -> Result<usize> {
            self.0.ref_count(repo)
        }
        fn update_submodules(&self, repo: &std::path::Path) -> Result<()> {
            self.0.update_submodules(repo)
        }
    }

    #[test]
    fn test_run_locked_pipeline_recursive_updates_submodules() {
        use crate::runner::mock::Call;

        let tmp = tempfile::tempdir().unwrap();
        let cache_root = tmp.path().join("cache");
        let checkout_root = tmp.path().join("work");

        let identity = RepoIdentity::new(
            "github.com".to_string(),
            "octocat".to_string(),
            "Hello-World".to_string(),
        );
        let plan = planner::plan(&identity, &cache_root, &checkout_root, "me").unwrap();

        let config = Config::from_env(Some(cache_root.clone()), Some(checkout_root.clone()));
        let ctx = RequestContext::new(config);
        let git = MaterializingGitOperations(crate::runner::mock::MockGitOperations::new());
        let opts = CloneOptions {
            url: identity.canonical_url(),
            strategy: Strategy::Full,
            force: false,
            recursive: true,
            org: None,
            private: false,
            fork: false,
        };

        run_locked_pipeline(&ctx, &git, &opts, &identity, ProviderClass::GitHub, &plan).unwrap();

        let calls = git.0.calls.lock().unwrap();
        assert!(calls.iter().any(|c| matches!(c, Call::UpdateSubmodules { repo }
            if repo == &plan.modifiable_path.display().to_string())));
    }

    #[test]
    fn test_clone_with_invalid_url_fails_before_locking() {
        let config = Config::from_env(
            Some(PathBuf::from("/tmp/gitcache-test-cache")),
            Some(PathBuf::from("/tmp/gitcache-test-checkout")),
        );
        let ctx = RequestContext::new(config);
        let git = crate::runner::mock::MockGitOperations::new();
        let opts = CloneOptions {
            url: "not a url".to_string(),
            strategy: Strategy::Full,
            force: false,
            recursive: false,
            org: None,
            private: false,
            fork: false,
        };
        let result = clone(&ctx, &git, &opts);
        assert!(matches!(result, Err(Error::UrlInvalid { .. })));
    }

    #[test]
    fn test_sync_writes_fresh_marker_on_successful_fetch() {
        let tmp = tempfile::tempdir().unwrap();
        let cache_root = tmp.path().join("cache");
        let checkout_root = tmp.path().join("work");
        let cache_path = cache_root.join("github.com/octocat/Hello-World");
        std::fs::create_dir_all(&cache_path).unwrap();
        std::fs::create_dir_all(&checkout_root).unwrap();

        let config = Config::from_env(Some(cache_root.clone()), Some(checkout_root));
        let ctx = RequestContext::new(config);
        let git = crate::runner::mock::MockGitOperations::new();

        let results = sync(&ctx, &git, 1).unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].1.is_ok());
        assert!(cache_engine::read_sync_marker(&cache_path).is_some());
    }
}
