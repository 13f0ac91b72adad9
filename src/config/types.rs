//! Core configuration types.
//! - Config holds runtime settings with sensible defaults.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::classify::RuleTable;

use super::paths;
use super::{DEFAULT_MAX_PENDING_SECS, DEFAULT_QUIET_PERIOD_MS, DEFAULT_TICK_INTERVAL_MS};

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

/// One watched-directory entry as persisted in the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedDir {
    pub path: PathBuf,
    pub enabled: bool,
}

/// Runtime configuration used by the organizer and the watch engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Classification rules plus the default bucket.
    pub rules: RuleTable,
    /// Directories the watch engine should observe.
    pub watch_dirs: Vec<WatchedDir>,
    /// How long a file must be quiet (no events, no size change) to count
    /// as fully written.
    pub quiet_period: Duration,
    /// Upper bound on how long a file may sit in the pending set.
    pub max_pending: Duration,
    /// Dispatch loop tick interval; also bounds shutdown latency.
    pub tick_interval: Duration,
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rules: RuleTable::default(),
            watch_dirs: Vec::new(),
            quiet_period: Duration::from_millis(DEFAULT_QUIET_PERIOD_MS),
            max_pending: Duration::from_secs(DEFAULT_MAX_PENDING_SECS),
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            log_level: LogLevel::Normal,
            // paths::default_log_path() returns Result<PathBuf>; store Some(path) on success.
            log_file: paths::default_log_path().ok(),
        }
    }
}
