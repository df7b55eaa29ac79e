//! Sequences one migration attempt through its state machine:
//! validate, preflight, lock, copy, atomic commit, config update, cleanup.

use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::errors::MigrateError;

use super::guard::CrashGuard;
use super::job::{JobStatus, MigrationJob, MigrationOutcome};
use super::progress::ProgressAggregator;
use super::sizer::directory_size;
use super::space::{format_bytes, free_bytes};
use super::walker::copy_tree;

/// Relocate the data directory at `settings.storage_path` into
/// `destination_parent`.
///
/// Progress percentages are delivered to `sink`; the terminal `100` is sent
/// only after the staging tree has been atomically promoted. On success the
/// settings are updated and persisted, and the caller receives the old and
/// new paths. The original tree is never mutated or deleted; every failure
/// before the commit leaves it the active storage location.
///
/// Precondition: the host has paused anything writing under the source
/// directory. The copy reads a live tree; concurrent writers would skew the
/// byte accounting and could be half-captured.
pub fn migrate(
    settings: &mut Settings,
    destination_parent: &Path,
    sink: &mut dyn FnMut(u8),
) -> Result<MigrationOutcome, MigrateError> {
    let source = settings.storage_path.clone();
    let mut job = MigrationJob::new(&source, destination_parent)?;
    let outcome = run(settings, &mut job, sink);
    if outcome.is_err() {
        job.status = JobStatus::Failed;
    }
    outcome
}

fn run(
    settings: &mut Settings,
    job: &mut MigrationJob,
    sink: &mut dyn FnMut(u8),
) -> Result<MigrationOutcome, MigrateError> {
    job.status = JobStatus::Validating;
    validate(job)?;

    // Preflight: size the payload, then probe the volume, before any mutation.
    job.total_bytes = directory_size(&job.source)?;
    let available = free_bytes(&job.destination_parent)?;
    if available < job.total_bytes {
        return Err(MigrateError::InsufficientSpace {
            required: job.total_bytes,
            available,
            dest: job.destination_parent.clone(),
        });
    }
    debug!(
        total = %format_bytes(job.total_bytes),
        free = %format_bytes(available),
        "preflight passed"
    );

    let mut progress = ProgressAggregator::new(job.total_bytes, sink);
    progress.begin();

    // Record where artifacts may be left so the next startup can sweep them.
    settings.migrate_parent = Some(job.destination_parent.clone());
    settings.save().map_err(config_err)?;

    write_lock(&job.lock)?;
    job.status = JobStatus::Locked;
    let _guard = CrashGuard::arm(&job.staging, &job.lock);

    job.status = JobStatus::Copying;
    // A failure here intentionally leaves the lock and partial staging tree
    // behind for the startup sweep; the caller gets the original diagnostic
    // immediately instead of an inline retry.
    copy_tree(&job.source, &job.staging, &mut |delta| {
        progress.on_bytes(delta);
    })?;
    job.copied_bytes = progress.copied_bytes();

    job.status = JobStatus::Committing;
    commit(job)?;

    settings.previous_path = Some(job.source.clone());
    settings.storage_path = job.destination.clone();
    settings.save().map_err(config_err)?;

    match fs::remove_file(&job.lock) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %job.lock.display(), error = %e, "could not remove migration lock"),
    }

    job.status = JobStatus::Completed;
    progress.finish();
    info!(
        old = %job.source.display(),
        new = %job.destination.display(),
        bytes = job.copied_bytes,
        "migration committed"
    );
    Ok(MigrationOutcome {
        old_path: job.source.clone(),
        new_path: job.destination.clone(),
    })
}

/// Reject unusable destinations before anything touches the disk. Each
/// rejection carries a reason the user can act on.
fn validate(job: &MigrationJob) -> Result<(), MigrateError> {
    let reject = |path: &Path, reason: &str| {
        Err(MigrateError::Validation {
            path: path.to_path_buf(),
            reason: reason.into(),
        })
    };

    if !job.source.is_dir() {
        return reject(&job.source, "the current data directory does not exist");
    }
    if job.destination.exists() {
        return reject(
            &job.destination,
            "a directory with the data directory's name already exists there",
        );
    }
    if job.lock.exists() || job.staging.exists() {
        return reject(
            &job.destination,
            "an earlier migration to this destination is in progress or was interrupted",
        );
    }

    let parent_real = match fs::canonicalize(&job.destination_parent) {
        Ok(p) if p.is_dir() => p,
        Ok(_) => {
            return reject(&job.destination_parent, "the destination parent is not a directory");
        }
        Err(_) => {
            return reject(&job.destination_parent, "the destination parent is not accessible");
        }
    };
    let dest_real = parent_real.join(job.destination.file_name().unwrap_or_default());

    let src_real = fs::canonicalize(&job.source).unwrap_or_else(|_| job.source.clone());
    if dest_real.starts_with(&src_real) {
        return reject(
            &job.destination,
            "the destination is inside the current data directory",
        );
    }

    if let Ok(exe) = std::env::current_exe()
        && let Some(install_dir) = exe.parent()
    {
        let install_real =
            fs::canonicalize(install_dir).unwrap_or_else(|_| install_dir.to_path_buf());
        if dest_real.starts_with(&install_real) {
            return reject(
                &job.destination,
                "the destination is inside the application's install directory",
            );
        }
    }

    Ok(())
}

/// Create the lock marker. The content is advisory and human-readable;
/// existence alone is the contract. `create_new` makes a concurrent or
/// crashed attempt visible instead of silently adopted.
fn write_lock(path: &Path) -> Result<(), MigrateError> {
    let lock_err = |source| MigrateError::Lock {
        path: path.to_path_buf(),
        source,
    };
    let mut f = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(lock_err)?;
    f.write_all(b"migration in progress\n").map_err(lock_err)?;
    Ok(())
}

/// Promote the staging tree with one atomic rename. Staging lives next to
/// the final destination, so the rename never crosses a volume boundary.
fn commit(job: &MigrationJob) -> Result<(), MigrateError> {
    if job.destination.exists() {
        return Err(MigrateError::CommitConflict {
            dest: job.destination.clone(),
        });
    }
    fs::rename(&job.staging, &job.destination).map_err(|source| MigrateError::Copy {
        path: job.destination.clone(),
        source,
    })?;
    #[cfg(unix)]
    if let Ok(dir) = fs::File::open(&job.destination_parent) {
        // Persist the rename itself; failure here must not undo a success.
        let _ = dir.sync_all();
    }
    Ok(())
}

fn config_err(e: anyhow::Error) -> MigrateError {
    MigrateError::Config {
        message: format!("{e:#}"),
    }
}
