//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/log paths and detects symlinked ancestors for safety.

use anyhow::{Context, Result};
use dirs::{config_dir, data_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Config file path in effect: FILEDOG_CONFIG if set, else the
/// OS-appropriate default under the user's config directory.
pub fn config_path() -> Result<PathBuf> {
    if let Some(p) = env::var_os("FILEDOG_CONFIG") {
        return Ok(PathBuf::from(p));
    }
    let mut base = config_dir()
        .or_else(|| {
            env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
        .context("cannot determine a config directory for this platform")?;
    base.push("filedog");
    base.push("config.xml");
    Ok(base)
}

/// OS-appropriate default log file path (data dir).
pub fn default_log_path() -> Result<PathBuf> {
    let mut base = data_dir()
        .or_else(|| {
            env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".local").join("share"))
        })
        .context("cannot determine a data directory for this platform")?;
    base.push("filedog");
    // ensure dir exists (best-effort)
    let _ = fs::create_dir_all(&base);
    base.push("filedog.log");
    Ok(base)
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
