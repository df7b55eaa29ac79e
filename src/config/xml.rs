//! XML configuration support.
//! - Loads settings from config.xml (quick_xml).
//! - Saves updated settings atomically after a committed migration.
//! - Creates a commented template on first run (unless STORE_SHIFT_CONFIG is set).
//!
//! Notes:
//! - This module only reads/writes the config file; destination validation
//!   happens in the engine.
//! - Unknown XML fields are a hard error to surface misconfigurations early.

use anyhow::{Context, Result, bail};
use quick_xml::de::from_str as from_xml_str;
use quick_xml::se::to_string_with_root;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::CONFIG_ENV;
use super::paths::{default_config_path, default_log_path, path_has_symlink_ancestor};
use super::types::{LogLevel, Settings};
use crate::platform::{set_dir_mode_0700, set_file_mode_0600, write_config_secure};

/// Struct mirroring the XML config for (de)serialization.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    storage_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    previous_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    migrate_parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    log_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    log_file: Option<String>,
}

fn opt_path(field: &Option<String>) -> Option<PathBuf> {
    field.as_deref().and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    })
}

/// Result of the initial configuration load.
pub enum LoadResult {
    /// An existing config file was read.
    Loaded(Settings),
    /// No config existed; a template was written and defaults apply.
    CreatedTemplate(PathBuf, Settings),
}

/// Load the active config file, creating a template (and returning defaults)
/// when none exists yet.
pub fn load_or_init() -> Result<LoadResult> {
    let cfg_path = default_config_path()?;
    if !cfg_path.exists() {
        let settings = Settings::default();
        create_template_config(&cfg_path, &settings)?;
        return Ok(LoadResult::CreatedTemplate(cfg_path, settings));
    }
    let settings = load_settings(&cfg_path)?;
    debug!(path = %cfg_path.display(), "loaded configuration");
    Ok(LoadResult::Loaded(settings))
}

/// Read and parse a config file. Missing fields fall back to defaults;
/// unknown fields are refused.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("read config '{}'", path.display()))?;
    let parsed: XmlSettings = match from_xml_str(&content) {
        Ok(x) => x,
        Err(e) => {
            let msg = e.to_string();
            if msg.contains("unknown field") {
                bail!(
                    "unknown field in store_shift config {}: {}; refusing to start",
                    path.display(),
                    msg
                );
            }
            return Err(e).with_context(|| format!("parse config '{}'", path.display()));
        }
    };

    let mut settings = Settings::default();
    if let Some(p) = opt_path(&parsed.storage_path) {
        settings.storage_path = p;
    }
    settings.previous_path = opt_path(&parsed.previous_path);
    settings.migrate_parent = opt_path(&parsed.migrate_parent);
    if let Some(lvl) = parsed.log_level.as_deref().and_then(LogLevel::parse) {
        settings.log_level = lvl;
    }
    if let Some(f) = opt_path(&parsed.log_file) {
        settings.log_file = Some(f);
    }
    Ok(settings)
}

/// Persist settings to the active config file with an atomic, secure write.
pub fn save_settings(settings: &Settings) -> Result<()> {
    let cfg_path = default_config_path()?;
    let xml = XmlSettings {
        storage_path: Some(settings.storage_path.display().to_string()),
        previous_path: settings
            .previous_path
            .as_ref()
            .map(|p| p.display().to_string()),
        migrate_parent: settings
            .migrate_parent
            .as_ref()
            .map(|p| p.display().to_string()),
        log_level: Some(settings.log_level.to_string()),
        log_file: settings.log_file.as_ref().map(|p| p.display().to_string()),
    };
    let body = to_string_with_root("config", &xml).context("serialize settings")?;
    let content = format!("{body}\n");
    write_config_secure(&cfg_path, content.as_bytes())?;
    let _ = set_file_mode_0600(&cfg_path);
    debug!(path = %cfg_path.display(), "configuration saved");
    Ok(())
}

/// Create the template config file and parent directory (best-effort permissions).
/// Uses secure creation to avoid following attacker-controlled symlinks on Unix.
pub fn create_template_config(path: &Path, settings: &Settings) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!(
            "refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        let _ = set_dir_mode_0700(parent);
    }

    let suggested_log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "/path/to/store_shift.log".into());

    let content = format!(
        "<!--\n  store_shift configuration (XML)\n\n  Fields:\n    storage_path    -> the application's active data directory\n    previous_path   -> where the data lived before the last migration (maintained by the tool)\n    migrate_parent  -> destination parent of the last migration attempt (maintained by the tool)\n    log_level       -> quiet | normal | info | debug\n    log_file        -> path to log file (optional; stdout is always used)\n\n  Notes:\n    - CLI flags override XML values.\n    - previous_path and migrate_parent feed startup cleanup and --reclaim-previous;\n      editing them by hand is rarely useful.\n-->\n<config>\n  <storage_path>{}</storage_path>\n  <log_level>normal</log_level>\n  <log_file>{}</log_file>\n</config>\n",
        settings.storage_path.display(),
        suggested_log
    );

    write_config_secure(path, content.as_bytes())?;
    let _ = set_file_mode_0600(path);

    info!("Created template config at {}", path.display());
    Ok(())
}

/// True when the config location was pinned via the environment. Used by the
/// CLI's --print-config to explain where values come from.
pub fn config_env_override() -> Option<PathBuf> {
    env::var_os(CONFIG_ENV).map(PathBuf::from)
}
