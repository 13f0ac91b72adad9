//! Config validation logic.
//! Verifies that a directory handed to the organizer exists, is a directory,
//! and is readable before any per-file work starts.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;
use tracing::{debug, error};

/// Ensure `root` is an existing, readable directory; emit clear errors with
/// path context. Per-file problems are handled later, per file — this gate
/// only rejects roots the whole run cannot use.
pub fn ensure_organize_root(root: &Path) -> Result<()> {
    ensure_dir_exists_and_is_dir(root)?;
    ensure_readable(root)?;
    Ok(())
}

fn ensure_dir_exists_and_is_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        error!("directory does not exist: {}", path.display());
        bail!("directory does not exist: {}", path.display());
    }
    if !path.is_dir() {
        error!("path is not a directory: {}", path.display());
        bail!("path is not a directory: {}", path.display());
    }
    Ok(())
}

fn ensure_readable(path: &Path) -> Result<()> {
    fs::read_dir(path).with_context(|| {
        format!(
            "Cannot read directory '{}'; check permissions",
            path.display()
        )
    })?;
    debug!("directory readable: {}", path.display());
    Ok(())
}
