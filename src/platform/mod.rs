//! Platform-specific helpers.
//! Hides OS differences (Unix/Windows) behind a uniform API so the rest of
//! the codebase can remain platform-agnostic: free-space probing, secure
//! config writes, and log file handling.

#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod windows;

#[cfg(unix)]
pub use unix::{
    free_space_bytes, open_log_file_secure_append, set_dir_mode_0700, set_file_mode_0600,
    write_config_secure,
};

#[cfg(not(unix))]
pub use windows::{
    free_space_bytes, open_log_file_secure_append, set_dir_mode_0700, set_file_mode_0600,
    write_config_secure,
};
