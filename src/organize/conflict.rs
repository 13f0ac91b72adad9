//! Duplicate-name resolution.
//!
//! Policy: return the requested name if it is free, otherwise append " (n)"
//! before the extension for n = 1, 2, 3, ... until an unoccupied path is
//! found.
//!
//! Notes:
//! - This only decides the name based on current filesystem state. The move
//!   primitive re-checks at move time (destination claim), and the organizer
//!   loops back here when it loses that race.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::trace;

use crate::errors::FiledogError;

/// Bound on suffix attempts; exhausting it is a fatal-for-that-file error.
pub(crate) const MAX_SUFFIX_ATTEMPTS: u32 = 1_000;

/// Compute a collision-free destination for `name` inside `dst_dir`.
///
/// Examples:
/// - "photo.jpg" -> "photo (1).jpg", "photo (2).jpg", ...
/// - ".env" -> ".env (1)"
/// - "archive.tar.gz" -> "archive.tar (1).gz"
pub fn resolve_destination(dst_dir: &Path, name: &OsStr) -> Result<PathBuf, FiledogError> {
    let candidate = dst_dir.join(name);
    if !candidate.exists() {
        return Ok(candidate);
    }

    // Extract stem and extension, preserving non-UTF8 via OsString.
    let base = Path::new(name);
    let stem: OsString = base
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| name.to_os_string());
    let ext: Option<OsString> = base.extension().map(|e| e.to_os_string());

    for n in 1..=MAX_SUFFIX_ATTEMPTS {
        let mut new_name = OsString::new();
        new_name.push(&stem);
        new_name.push(format!(" ({n})"));
        if let Some(e) = &ext {
            new_name.push(".");
            new_name.push(e);
        }
        let candidate = dst_dir.join(&new_name);
        if !candidate.exists() {
            return Ok(candidate);
        }
        if n == 3 {
            trace!(name = ?name, dir = %dst_dir.display(), "multiple collisions, continuing to search for a free suffix");
        }
    }

    Err(FiledogError::DestinationConflict {
        dir: dst_dir.to_path_buf(),
        name: name.to_string_lossy().into_owned(),
        attempts: MAX_SUFFIX_ATTEMPTS,
    })
}
