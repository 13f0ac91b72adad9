//! Config module (modularized).
//! Provides configuration types, default paths, XML loading, and validation.

pub mod paths;
pub mod types;
mod validate;
pub mod xml;

pub use paths::{config_path, default_log_path, path_has_symlink_ancestor};
pub use types::{Config, LogLevel, WatchedDir};
pub use validate::ensure_organize_root;
pub use xml::{
    LoadResult, WatchEdit, create_template_config, load_config_from_path, load_or_init,
    set_watch_entry,
};

/// Defaults shared across submodules.
pub const DEFAULT_QUIET_PERIOD_MS: u64 = 2_000;
pub const DEFAULT_MAX_PENDING_SECS: u64 = 300;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 500;
