//! Free-space probe for the volume containing a path.

use std::path::Path;

use crate::errors::MigrateError;
use crate::platform;

/// Free bytes available on the volume containing `path`.
///
/// `path` must already exist: probe the destination *parent*, never the
/// not-yet-created destination itself.
pub fn free_bytes(path: &Path) -> Result<u64, MigrateError> {
    platform::free_space_bytes(path).map_err(|source| MigrateError::VolumeQuery {
        path: path.to_path_buf(),
        source,
    })
}

/// Human-friendly byte formatting for logs.
pub(crate) fn format_bytes(n: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let f = n as f64;
    if f >= GB {
        format!("{:.1} GiB", f / GB)
    } else if f >= MB {
        format!("{:.1} MiB", f / MB)
    } else if f >= KB {
        format!("{:.1} KiB", f / KB)
    } else {
        format!("{} B", n)
    }
}
