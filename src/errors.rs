//! Typed error definitions for store_shift.
//! Provides a small set of well-known failure modes for better logs and tests.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure modes of one migration attempt.
///
/// Every variant is caught at the orchestrator boundary and rendered as a
/// structured failure for the host; none of them is allowed to escape as a
/// panic. Variants carrying a path name the entry the failure was observed
/// on, not necessarily its root cause.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// The chosen destination is unusable as-is. The reason is user-facing.
    #[error("cannot migrate to '{path}': {reason}; please choose another folder")]
    Validation { path: PathBuf, reason: String },

    #[error(
        "insufficient space on the target disk for '{dest}': need {required} bytes, have {available} bytes"
    )]
    InsufficientSpace {
        required: u64,
        available: u64,
        dest: PathBuf,
    },

    #[error("failed to scan '{path}': {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("copy failed at '{path}': {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("destination '{dest}' appeared during the migration; refusing to overwrite it")]
    CommitConflict { dest: PathBuf },

    #[error("could not query free space for '{path}': {source}")]
    VolumeQuery {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not create the migration lock '{path}': {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to persist configuration: {message}")]
    Config { message: String },

    #[error("migration interrupted before commit")]
    Interrupted,
}

impl MigrateError {
    /// Stable machine-readable code for structured logs and JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            MigrateError::Validation { .. } => "validation",
            MigrateError::InsufficientSpace { .. } => "insufficient_space",
            MigrateError::Scan { .. } => "scan",
            MigrateError::Copy { .. } => "copy",
            MigrateError::CommitConflict { .. } => "commit_conflict",
            MigrateError::VolumeQuery { .. } => "volume_query",
            MigrateError::Lock { .. } => "lock",
            MigrateError::Config { .. } => "config",
            MigrateError::Interrupted => "interrupted",
        }
    }
}
