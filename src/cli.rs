//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - The positional DEST_PARENT is the only required input for a migration.
//! - --debug is a shorthand for --log-level debug.

use clap::{Parser, ValueHint};
use std::path::PathBuf;

use store_shift::config::{LogLevel, Settings};

/// CLI wrapper for the store_shift library.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Relocate an application's data directory with crash-safe staging"
)]
pub struct Args {
    /// Destination parent directory. The data directory keeps its name and
    /// is created inside this folder.
    #[arg(value_name = "DEST_PARENT", value_hint = ValueHint::DirPath)]
    pub destination_parent: Option<PathBuf>,

    /// Override the configured data directory to relocate.
    #[arg(
        long,
        short = 's',
        value_name = "PATH",
        value_hint = ValueHint::DirPath,
        help = "Data directory to relocate (overrides the configured storage_path)"
    )]
    pub source: Option<PathBuf>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(
        short = 'd',
        long,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Print where store_shift will look for the config file, then exit.
    #[arg(
        long,
        help = "Print the config file location used by store_shift and exit"
    )]
    pub print_config: bool,

    /// Run the stale-artifact sweep for a crashed migration and exit.
    #[arg(long, help = "Remove leftover lock/staging artifacts and exit")]
    pub cleanup_only: bool,

    /// Delete the data directory left behind at the previous location.
    #[arg(
        long,
        help = "Delete the data left at the previous location after a completed migration, then exit"
    )]
    pub reclaim_previous: bool,

    /// Emit progress events and the final result as JSON lines.
    #[arg(long, help = "Emit progress events and the final result as JSON")]
    pub json: bool,
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to loaded Settings (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(src) = &self.source {
            settings.storage_path = src.clone();
        }
        if let Some(level) = self.effective_log_level() {
            settings.log_level = level;
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
