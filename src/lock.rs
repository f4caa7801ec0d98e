//! # Lock Manager
//!
//! Process-safe exclusive locks keyed by path, with stale-holder detection
//! and bounded, jittered-backoff waiting (spec section 4.3).

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use log::{debug, warn};
use rand::Rng;
use sysinfo::{Pid, System};

use crate::defaults::{LOCK_BACKOFF_MAX, LOCK_BACKOFF_MIN, STALE_THRESHOLD};
use crate::error::{Error, Result};

/// A held lock. Dropping the handle removes the lock file, releasing it.
///
/// Not `Clone`: the handle is the sole proof of ownership, and callers must
/// not request the same lock twice (spec section 4.3, "not reentrant").
pub struct LockHandle {
    path: PathBuf,
    released: bool,
}

impl LockHandle {
    /// Releases the lock early. Equivalent to dropping the handle, but lets
    /// callers observe I/O errors from the removal.
    pub fn release(mut self) -> Result<()> {
        self.do_release()
    }

    fn do_release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        // Best-effort: a panic unwinding through here must not abort the
        // process trying to propagate an I/O error.
        let _ = self.do_release();
    }
}

/// Acquires the exclusive lock at `path`, waiting up to `timeout`.
///
/// Algorithm (spec section 4.3):
///   1. Attempt exclusive create. On success, write `pid\nstart_ns\n`, fsync.
///   2. On `EEXIST`, read the file. If malformed or older than
///      `STALE_THRESHOLD` *and* its recorded PID is not alive, remove it and
///      retry from (1). Otherwise sleep with jittered backoff and retry.
///   3. On overall timeout, fail with `LockTimeout`.
pub fn acquire(path: &Path, timeout: Duration) -> Result<LockHandle> {
    let deadline = Instant::now() + timeout;
    let mut rng = rand::thread_rng();

    loop {
        match try_create(path) {
            Ok(()) => {
                return Ok(LockHandle {
                    path: path.to_path_buf(),
                    released: false,
                });
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if is_stale(path) {
                    debug!("removing stale lock at {}", path.display());
                    match fs::remove_file(path) {
                        Ok(()) => continue,
                        Err(e) if e.kind() == ErrorKind::NotFound => continue,
                        Err(e) => return Err(Error::Io(e)),
                    }
                }
                if Instant::now() >= deadline {
                    return Err(Error::LockTimeout {
                        path: path.display().to_string(),
                    });
                }
                let jitter = rng.gen_range(LOCK_BACKOFF_MIN..=LOCK_BACKOFF_MAX);
                std::thread::sleep(jitter);
            }
            Err(e) => return Err(Error::Io(e)),
        }
    }
}

fn try_create(path: &Path) -> std::result::Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let pid = std::process::id();
    let start_ns = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    write!(file, "{pid}\n{start_ns}\n")?;
    file.sync_all()?;
    Ok(())
}

/// Reads `path`'s contents. Returns `None` if malformed (not parseable as
/// `pid\nstart_ns\n`).
fn read_lock_contents(path: &Path) -> Option<(u32, u128)> {
    let mut contents = String::new();
    fs::File::open(path).ok()?.read_to_string(&mut contents).ok()?;
    let mut lines = contents.lines();
    let pid: u32 = lines.next()?.trim().parse().ok()?;
    let start_ns: u128 = lines.next()?.trim().parse().ok()?;
    Some((pid, start_ns))
}

/// A lock is stale when it is malformed, or when it is older than
/// `STALE_THRESHOLD` *and* its recorded PID is no longer running.
fn is_stale(path: &Path) -> bool {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(_) => return false,
    };
    let age = match metadata.modified().and_then(|m| m.elapsed()) {
        Ok(age) => age,
        Err(_) => return false,
    };

    match read_lock_contents(path) {
        None => true,
        Some((pid, _start_ns)) => {
            if age < STALE_THRESHOLD {
                return false;
            }
            !pid_is_alive(pid)
        }
    }
}

fn pid_is_alive(pid: u32) -> bool {
    let mut system = System::new();
    let sysinfo_pid = Pid::from_u32(pid);
    system.refresh_process(sysinfo_pid);
    let alive = system.process(sysinfo_pid).is_some();
    if !alive {
        warn!("lock holder pid {pid} is no longer running; treating lock as stale");
    }
    alive
}
