//! Config module (modularized).
//! Provides configuration types, default paths, XML load/save, and the
//! first-run template. Re-exports form the public configuration API.

pub mod paths;
pub mod types;
pub mod xml;

pub use paths::{
    default_config_path, default_log_path, default_storage_path, path_has_symlink_ancestor,
};
pub use types::{LogLevel, Settings};
pub use xml::{
    LoadResult, config_env_override, create_template_config, load_or_init, load_settings,
    save_settings,
};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "STORE_SHIFT_CONFIG";

/// Name of the data directory created under the user's home on first run.
pub const STORAGE_DIR_DEFAULT: &str = ".store_shift";
