//! Race-safe move primitive.
//!
//! The destination is claimed first with a create_new open: only one worker
//! can create a given path, so two movers aiming at the same name cannot
//! both succeed. The source is then renamed over the claim (atomic on the
//! same filesystem); cross-device renames fall back to copying into a
//! hidden staging file beside the destination and renaming that into place.
//!
//! A concurrent mover that took the same source first surfaces here as
//! NotFound on the rename — reported as `SourceGone`, not an error.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Name prefix for transient claim/staging artifacts. Event routing and
/// enumeration ignore anything carrying it.
pub(crate) const STAGING_PREFIX: &str = ".filedog.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MoveStatus {
    /// The source now lives at the destination.
    Moved,
    /// Someone occupied the destination between resolution and claim;
    /// caller should resolve a fresh name and retry.
    DestinationTaken,
    /// The source vanished first (another worker won); nothing to do.
    SourceGone,
}

/// Move `src` to `dest`, claiming `dest` first. `dest`'s parent must exist.
pub(crate) fn try_move(src: &Path, dest: &Path) -> io::Result<MoveStatus> {
    match OpenOptions::new().write(true).create_new(true).open(dest) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            debug!(dest = %dest.display(), "destination taken since resolution; retrying");
            return Ok(MoveStatus::DestinationTaken);
        }
        Err(e) => return Err(e),
    }

    // Rename over our zero-byte claim; atomic within one filesystem.
    match fs::rename(src, dest) {
        Ok(()) => {
            #[cfg(unix)]
            if let Some(parent) = dest.parent() {
                // Persist the rename; a failed fsync must not fail the move.
                let _ = fsync_dir(parent);
            }
            info!(src = %src.display(), dest = %dest.display(), "moved file");
            Ok(MoveStatus::Moved)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let _ = fs::remove_file(dest);
            Ok(MoveStatus::SourceGone)
        }
        Err(e) => {
            #[cfg(unix)]
            let hint: &str = match e.raw_os_error() {
                Some(code) if code == libc::EXDEV => "cross-filesystem; copying instead",
                Some(code) if code == libc::EACCES || code == libc::EPERM => {
                    "permission denied; check destination perms"
                }
                _ => "falling back to copy",
            };
            #[cfg(not(unix))]
            let hint: &str = match e.kind() {
                io::ErrorKind::PermissionDenied => "permission denied; check destination perms",
                _ => "falling back to copy",
            };
            warn!(error = %e, hint, "atomic rename failed, using staged copy");

            match copy_via_staging(src, dest) {
                Ok(()) => Ok(MoveStatus::Moved),
                Err(copy_err) if copy_err.kind() == io::ErrorKind::NotFound => {
                    let _ = fs::remove_file(dest);
                    Ok(MoveStatus::SourceGone)
                }
                Err(copy_err) => {
                    let _ = fs::remove_file(dest);
                    Err(copy_err)
                }
            }
        }
    }
}

/// Copy `src` to a hidden staging name beside `dest`, rename it over the
/// claim, then remove the source. Cleans up the staging file on failure.
fn copy_via_staging(src: &Path, dest: &Path) -> io::Result<()> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let staging = parent.join(format!("{}{}.{}.part", STAGING_PREFIX, std::process::id(), nanos));

    if let Err(e) = fs::copy(src, &staging) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }
    if let Err(e) = fs::rename(&staging, dest) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }
    fs::remove_file(src)?;
    info!(src = %src.display(), dest = %dest.display(), "copied across filesystems and removed source");
    Ok(())
}

#[cfg(unix)]
fn fsync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}
