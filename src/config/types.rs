//! Core configuration types.
//! - Settings holds the persisted state the migration engine reads and updates.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::paths;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// More info (like verbose)
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Persisted host state consumed and updated by the migration engine.
#[derive(Debug, Clone)]
pub struct Settings {
    /// The application's active data directory.
    pub storage_path: PathBuf,
    /// Where the data lived before the most recent completed migration;
    /// input to the optional reclamation step, never touched by the engine.
    pub previous_path: Option<PathBuf>,
    /// Destination parent of the most recent migration attempt. The startup
    /// sweep looks here for orphaned lock/staging artifacts after a crash.
    pub migrate_parent: Option<PathBuf>,
    /// Console/file verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_path: paths::default_storage_path()
                .unwrap_or_else(|_| PathBuf::from(super::STORAGE_DIR_DEFAULT)),
            previous_path: None,
            migrate_parent: None,
            log_level: LogLevel::Normal,
            log_file: paths::default_log_path().ok(),
        }
    }
}

impl Settings {
    /// Persist to the active config file (atomic write).
    pub fn save(&self) -> anyhow::Result<()> {
        super::xml::save_settings(self)
    }
}
