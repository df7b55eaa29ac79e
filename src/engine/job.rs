//! The unit of work: one attempted relocation of a data directory.

use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::errors::MigrateError;

/// File-name suffix whose presence means "migration in progress or crashed
/// mid-migration".
pub const LOCK_SUFFIX: &str = ".lock";
/// File-name suffix marking a staging copy that has not been promoted.
pub const MIGRATING_SUFFIX: &str = ".migrating";

/// True when the final path segment carries a marker suffix.
///
/// Markers are presence signals, never payload: the sizer and the walker
/// ignore them wherever they appear in a tree, and the startup sweep deletes
/// them. The rule is an exact suffix match on the file name only.
pub fn is_marker_name(name: &OsStr) -> bool {
    let name = name.to_string_lossy();
    name.ends_with(LOCK_SUFFIX) || name.ends_with(MIGRATING_SUFFIX)
}

/// Where one migration stands. Linear, with `Failed` absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Idle,
    Validating,
    Locked,
    Copying,
    Committing,
    Completed,
    Failed,
}

/// One migration attempt. Created per request, dropped when terminal; only
/// the destination tree (on success) or marker artifacts (on crash) outlive it.
#[derive(Debug)]
pub struct MigrationJob {
    /// Current data directory; read-only to the engine.
    pub source: PathBuf,
    /// User-chosen new parent directory.
    pub destination_parent: PathBuf,
    /// Final resting path: the data directory keeps its name.
    pub destination: PathBuf,
    /// Working copy target; exists only while a migration is in flight.
    pub staging: PathBuf,
    /// Marker whose existence is the sole "migration in flight" signal.
    pub lock: PathBuf,
    pub total_bytes: u64,
    pub copied_bytes: u64,
    pub status: JobStatus,
}

impl MigrationJob {
    pub fn new(source: &Path, destination_parent: &Path) -> Result<Self, MigrateError> {
        let name = source
            .file_name()
            .ok_or_else(|| MigrateError::Validation {
                path: source.to_path_buf(),
                reason: "the data directory path has no final component".into(),
            })?;
        let destination = destination_parent.join(name);
        let staging = append_suffix(&destination, MIGRATING_SUFFIX);
        let lock = append_suffix(&destination, LOCK_SUFFIX);
        Ok(Self {
            source: source.to_path_buf(),
            destination_parent: destination_parent.to_path_buf(),
            destination,
            staging,
            lock,
            total_bytes: 0,
            copied_bytes: 0,
            status: JobStatus::Idle,
        })
    }
}

/// Successful result reported back to the host.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationOutcome {
    pub old_path: PathBuf,
    pub new_path: PathBuf,
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}
