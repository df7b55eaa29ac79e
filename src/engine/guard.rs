//! Crash cleanup for interrupted migrations.
//!
//! Two halves:
//! - [`CrashGuard`]: scoped registration of the in-flight job's staging and
//!   lock paths. Armed for exactly the locked-to-committed span and disarmed
//!   on every exit path, so a signal arriving later can never delete a
//!   future job's artifacts. The host's signal handler calls
//!   [`cleanup_active`] against whatever is currently armed.
//! - [`remove_stale_artifacts`]: the startup sweep that deletes leftover
//!   marker-suffixed entries from a recorded migration parent, so a crash
//!   mid-migration cannot block future launches or future migrations.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

use super::job::is_marker_name;

static ACTIVE: Mutex<Option<ArtifactPaths>> = Mutex::new(None);

struct ArtifactPaths {
    staging: PathBuf,
    lock: PathBuf,
}

/// RAII registration of the active job's on-disk artifacts.
pub struct CrashGuard {
    _priv: (),
}

impl CrashGuard {
    /// Register `staging` and `lock` for signal-time cleanup. Only one job
    /// is ever in flight; arming replaces any previous registration.
    pub fn arm(staging: &Path, lock: &Path) -> Self {
        let mut active = ACTIVE.lock().unwrap_or_else(|p| p.into_inner());
        *active = Some(ArtifactPaths {
            staging: staging.to_path_buf(),
            lock: lock.to_path_buf(),
        });
        CrashGuard { _priv: () }
    }
}

impl Drop for CrashGuard {
    fn drop(&mut self) {
        let mut active = ACTIVE.lock().unwrap_or_else(|p| p.into_inner());
        *active = None;
    }
}

/// Delete the armed job's artifacts, if any. Called from the signal handler;
/// a best-effort pass, since the startup sweep catches whatever survives.
pub fn cleanup_active() {
    let paths = {
        let mut active = ACTIVE.lock().unwrap_or_else(|p| p.into_inner());
        active.take()
    };
    let Some(paths) = paths else { return };
    if paths.staging.exists() {
        if let Err(e) = fs::remove_dir_all(&paths.staging) {
            warn!(path = %paths.staging.display(), error = %e, "could not remove staging tree");
        }
    }
    match fs::remove_file(&paths.lock) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %paths.lock.display(), error = %e, "could not remove lock file"),
    }
}

/// Delete every entry directly under `parent` whose final segment ends in a
/// marker suffix. Runs at startup, before any new job may begin.
pub fn remove_stale_artifacts(parent: &Path) -> io::Result<()> {
    if !parent.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(parent)? {
        let entry = entry?;
        if !is_marker_name(&entry.file_name()) {
            continue;
        }
        let path = entry.path();
        let removed = if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        match removed {
            Ok(()) => info!(path = %path.display(), "removed stale migration artifact"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
