//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/log/storage paths and detects symlinked
//! ancestors for safety.

use anyhow::{Result, anyhow};
use dirs::{config_dir, data_dir, home_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::CONFIG_ENV;
use super::STORAGE_DIR_DEFAULT;

/// Config file location: `STORE_SHIFT_CONFIG` if set, else the
/// OS-appropriate per-user config directory.
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(p) = env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(p));
    }
    let base = config_dir().ok_or_else(|| anyhow!("could not determine a config directory"))?;
    Ok(base.join("store_shift").join("config.xml"))
}

/// OS-appropriate default log file path (data dir).
pub fn default_log_path() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| anyhow!("could not determine a data directory"))?;
    Ok(base.join("store_shift").join("store_shift.log"))
}

/// Default data directory relocated by this tool, under the user's home.
pub fn default_storage_path() -> Result<PathBuf> {
    let home = home_dir().ok_or_else(|| anyhow!("could not determine a home directory"))?;
    Ok(home.join(STORAGE_DIR_DEFAULT))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}
