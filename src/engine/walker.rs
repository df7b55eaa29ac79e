//! Sequential tree copy into the staging destination.
//!
//! One file stream at a time: disk contention stays predictable and byte
//! accounting needs no synchronization. Entries are visited in whatever
//! order the filesystem lists them; no ordering is promised to callers.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use super::job::is_marker_name;
use crate::errors::MigrateError;
use crate::shutdown;

const BUF_SIZE: usize = 1024 * 1024;
/// Cadence for byte-delta reporting while a single large file streams.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Recursively mirror `src` into `dst`, reporting byte deltas to `on_bytes`.
///
/// Marker-suffixed entries are skipped wherever they appear. Every file is
/// reported at least once, so trees of many small files still advance the
/// observer. The first I/O error aborts the walk immediately; partial output
/// stays behind under the staging path for the crash-cleanup protocol.
pub fn copy_tree(
    src: &Path,
    dst: &Path,
    on_bytes: &mut dyn FnMut(u64),
) -> Result<(), MigrateError> {
    fs::create_dir_all(dst).map_err(|e| copy_err(dst, e))?;
    let entries = fs::read_dir(src).map_err(|e| copy_err(src, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| copy_err(src, e))?;
        if shutdown::is_requested() {
            // A signal handler is about to (or already did) remove the
            // staging tree; stop before recreating anything inside it.
            return Err(MigrateError::Interrupted);
        }
        let name = entry.file_name();
        if is_marker_name(&name) {
            continue;
        }
        let src_path = entry.path();
        let dst_path = dst.join(&name);
        let ftype = entry.file_type().map_err(|e| copy_err(&src_path, e))?;
        if ftype.is_dir() {
            copy_tree(&src_path, &dst_path, on_bytes)?;
        } else if ftype.is_symlink() {
            copy_link(&src_path, &dst_path, on_bytes)?;
        } else {
            copy_file(&src_path, &dst_path, on_bytes)?;
        }
    }
    Ok(())
}

/// Stream one file, flushing accumulated deltas at the reporting cadence and
/// once more at EOF. The destination is created with `create_new` so a stale
/// staging leftover is surfaced instead of silently clobbered.
fn copy_file(src: &Path, dst: &Path, on_bytes: &mut dyn FnMut(u64)) -> Result<(), MigrateError> {
    let mut reader = File::open(src).map_err(|e| copy_err(src, e))?;
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dst)
        .map_err(|e| copy_err(dst, e))?;

    let mut buf = vec![0u8; BUF_SIZE];
    let mut pending: u64 = 0;
    let mut last_emit = Instant::now();
    loop {
        let n = reader.read(&mut buf).map_err(|e| copy_err(src, e))?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).map_err(|e| copy_err(dst, e))?;
        pending += n as u64;
        if last_emit.elapsed() >= PROGRESS_INTERVAL {
            on_bytes(pending);
            pending = 0;
            last_emit = Instant::now();
        }
    }
    writer.sync_all().map_err(|e| copy_err(dst, e))?;
    on_bytes(pending);
    Ok(())
}

/// Recreate a symlink as a link and account its entry length, matching what
/// the sizer counted for it.
fn copy_link(src: &Path, dst: &Path, on_bytes: &mut dyn FnMut(u64)) -> Result<(), MigrateError> {
    let target = fs::read_link(src).map_err(|e| copy_err(src, e))?;
    #[cfg(unix)]
    std::os::unix::fs::symlink(&target, dst).map_err(|e| copy_err(dst, e))?;
    #[cfg(windows)]
    {
        let links_to_dir = fs::metadata(src).map(|m| m.is_dir()).unwrap_or(false);
        if links_to_dir {
            std::os::windows::fs::symlink_dir(&target, dst).map_err(|e| copy_err(dst, e))?;
        } else {
            std::os::windows::fs::symlink_file(&target, dst).map_err(|e| copy_err(dst, e))?;
        }
    }
    let len = fs::symlink_metadata(src).map(|m| m.len()).unwrap_or(0);
    on_bytes(len);
    Ok(())
}

fn copy_err(path: &Path, source: std::io::Error) -> MigrateError {
    MigrateError::Copy {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn mirrors_tree_and_skips_markers() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a.txt"), b"alpha").unwrap();
        fs::write(src.join("nested/b.txt"), b"beta").unwrap();
        fs::write(src.join("stray.lock"), b"stale").unwrap();
        fs::write(src.join("nested/old.migrating"), b"stale").unwrap();

        let mut copied = 0u64;
        copy_tree(&src, &dst, &mut |d| copied += d).unwrap();

        assert_eq!(fs::read(dst.join("a.txt")).unwrap(), b"alpha");
        assert_eq!(fs::read(dst.join("nested/b.txt")).unwrap(), b"beta");
        assert!(!dst.join("stray.lock").exists());
        assert!(!dst.join("nested/old.migrating").exists());
        assert_eq!(copied, 9);
    }

    #[test]
    fn every_file_reports_at_least_once() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("empty"), b"").unwrap();

        let mut calls = 0u32;
        copy_tree(&src, &dst, &mut |_| calls += 1).unwrap();
        assert!(calls >= 1, "zero-length files must still be reported");
        assert!(dst.join("empty").exists());
    }

    #[test]
    fn empty_source_creates_destination() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir(&src).unwrap();

        copy_tree(&src, &dst, &mut |_| {}).unwrap();
        assert!(dst.is_dir());
    }

    #[test]
    fn missing_source_is_a_copy_error() {
        let dir = tempdir().unwrap();
        let err = copy_tree(&dir.path().join("nope"), &dir.path().join("dst"), &mut |_| {})
            .unwrap_err();
        assert!(matches!(err, MigrateError::Copy { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_recreated_not_followed() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("real.txt"), b"payload").unwrap();
        std::os::unix::fs::symlink("real.txt", src.join("alias")).unwrap();

        copy_tree(&src, &dst, &mut |_| {}).unwrap();
        let copied = dst.join("alias");
        assert!(fs::symlink_metadata(&copied).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&copied).unwrap(), Path::new("real.txt"));
    }
}
