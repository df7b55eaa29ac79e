//! Recursive payload sizing for the preflight space check.

use std::path::Path;
use walkdir::WalkDir;

use super::job::is_marker_name;
use crate::errors::MigrateError;

/// Total payload size of the tree rooted at `root`.
///
/// Depth-first; symbolic links are never followed (a link contributes its own
/// entry length, so cycles cannot occur), and marker-suffixed names are
/// excluded so a stale lock or staging leftover does not inflate the total.
/// Any unreadable entry aborts the whole scan: a partial sum would silently
/// understate the space the copy needs.
pub fn directory_size(root: &Path) -> Result<u64, MigrateError> {
    let mut total: u64 = 0;
    let mut it = WalkDir::new(root).follow_links(false).into_iter();
    while let Some(entry) = it.next() {
        let entry = entry.map_err(scan_err(root))?;
        if entry.depth() > 0 && is_marker_name(entry.file_name()) {
            if entry.file_type().is_dir() {
                it.skip_current_dir();
            }
            continue;
        }
        // With follow_links off, metadata() of a symlink describes the link
        // entry itself, which is exactly the size we want to account.
        let meta = entry.metadata().map_err(scan_err(root))?;
        if meta.is_file() || entry.file_type().is_symlink() {
            total = total.saturating_add(meta.len());
        }
    }
    Ok(total)
}

fn scan_err(root: &Path) -> impl Fn(walkdir::Error) -> MigrateError + '_ {
    move |e: walkdir::Error| {
        let path = e
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.to_path_buf());
        let source = e
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::other("unreadable directory entry"));
        MigrateError::Scan { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn sums_regular_files_and_skips_markers() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.bin"), vec![0u8; 1000]).unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("b.bin"), vec![0u8; 500]).unwrap();
        fs::write(sub.join("stale.lock"), vec![0u8; 9999]).unwrap();

        // A whole stale staging tree must be excluded from enumeration.
        let staging = dir.path().join("old.migrating");
        fs::create_dir(&staging).unwrap();
        fs::write(staging.join("junk.bin"), vec![0u8; 7777]).unwrap();

        assert_eq!(directory_size(dir.path()).unwrap(), 1500);
    }

    #[test]
    fn empty_tree_is_zero() {
        let dir = tempdir().unwrap();
        assert_eq!(directory_size(dir.path()).unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed() {
        let dir = tempdir().unwrap();
        let payload = dir.path().join("payload");
        fs::create_dir(&payload).unwrap();
        fs::write(payload.join("big.bin"), vec![0u8; 4096]).unwrap();
        // Link back to the root: recursing through it would never terminate.
        std::os::unix::fs::symlink(dir.path(), payload.join("loop")).unwrap();

        let total = directory_size(dir.path()).unwrap();
        let link_len = fs::symlink_metadata(payload.join("loop")).unwrap().len();
        assert_eq!(total, 4096 + link_len);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_entry_aborts_the_scan() {
        use std::os::unix::fs::PermissionsExt;
        if unsafe { libc::geteuid() } == 0 {
            // root ignores mode bits; nothing to exercise
            return;
        }
        let dir = tempdir().unwrap();
        let sealed = dir.path().join("sealed");
        fs::create_dir(&sealed).unwrap();
        fs::write(sealed.join("hidden.bin"), b"x").unwrap();
        fs::set_permissions(&sealed, fs::Permissions::from_mode(0o000)).unwrap();

        let result = directory_size(dir.path());
        fs::set_permissions(&sealed, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(matches!(result, Err(MigrateError::Scan { .. })));
    }
}
