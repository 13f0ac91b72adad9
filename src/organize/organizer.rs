//! Batch and single-file organization.
//!
//! Enumerates the immediate files of a directory (subdirectories are left
//! alone, so bucket folders are never re-organized), classifies each file,
//! resolves a collision-free destination, and moves it. One bad file never
//! aborts the rest of the batch.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::classify::Classifier;
use crate::config::ensure_organize_root;
use crate::errors::FiledogError;

use super::conflict::resolve_destination;
use super::move_file::{MoveStatus, STAGING_PREFIX, try_move};
use super::report::{FileRecord, Outcome, OrganizeReport};

/// How many times a lost destination claim is re-resolved before the file
/// is recorded as a conflict failure.
const MAX_CLAIM_RETRIES: u32 = 8;

/// Moves files into bucket folders chosen by the classifier.
pub struct Organizer {
    classifier: Arc<Classifier>,
}

impl Organizer {
    pub fn new(classifier: Arc<Classifier>) -> Self {
        Self { classifier }
    }

    /// Organize every immediate file of `root` into `root/<bucket>/`.
    ///
    /// Dry runs compute identical classifications and resolved destinations
    /// but leave the filesystem untouched. Only an unusable `root` is a hard
    /// error; everything else is recorded per file.
    pub fn organize(&self, root: &Path, dry_run: bool) -> Result<OrganizeReport> {
        ensure_organize_root(root)?;
        let mut report = OrganizeReport::new(dry_run);

        for entry in fs::read_dir(root)? {
            if crate::shutdown::is_requested() {
                let err = FiledogError::Interrupted;
                warn!(code = err.code(), dir = %root.display(), "interrupted; stopping enumeration early");
                break;
            }
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(dir = %root.display(), error = %e, "unreadable directory entry; skipping");
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(e) => {
                    let err = FiledogError::SourceUnreadable {
                        path: path.clone(),
                        source: e,
                    };
                    warn!(code = err.code(), path = %path.display(), "cannot stat entry");
                    report.push(failed_record(&path, &err));
                    continue;
                }
            };
            // Subdirectories (our own buckets included) and symlinks stay put.
            if !file_type.is_file() {
                continue;
            }
            if is_internal_name(&path) {
                continue;
            }
            report.push(self.organize_one(root, &path, dry_run));
        }

        info!(
            dir = %root.display(),
            moved = report.moved(),
            skipped = report.skipped(),
            failed = report.failed(),
            dry_run,
            "organize complete"
        );
        Ok(report)
    }

    /// Single-file variant used by the watch engine once a file is stable.
    ///
    /// Files already sitting inside a known bucket folder are skipped, which
    /// keeps the recursive watcher from chasing its own moves.
    pub fn organize_file(&self, path: &Path, dry_run: bool) -> FileRecord {
        let Some(root) = path.parent() else {
            let err = FiledogError::SourceUnreadable {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"),
            };
            return failed_record(path, &err);
        };

        if let Some(parent_name) = root.file_name().and_then(|n| n.to_str())
            && self.classifier.is_bucket(parent_name)
        {
            debug!(path = %path.display(), "already inside a bucket folder; skipping");
            return FileRecord {
                source: path.to_path_buf(),
                dest: None,
                bucket: Some(parent_name.to_string()),
                outcome: Outcome::SkippedInBucket,
                warned: false,
            };
        }

        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_file() => self.organize_one(root, path, dry_run),
            Ok(_) => {
                debug!(path = %path.display(), "not a regular file; skipping");
                FileRecord {
                    source: path.to_path_buf(),
                    dest: None,
                    bucket: None,
                    outcome: Outcome::SkippedInBucket,
                    warned: false,
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "file disappeared before organize");
                FileRecord {
                    source: path.to_path_buf(),
                    dest: None,
                    bucket: None,
                    outcome: Outcome::SkippedAlreadyMoved,
                    warned: false,
                }
            }
            Err(e) => {
                let err = FiledogError::SourceUnreadable {
                    path: path.to_path_buf(),
                    source: e,
                };
                warn!(code = err.code(), path = %path.display(), "cannot stat file");
                failed_record(path, &err)
            }
        }
    }

    fn organize_one(&self, root: &Path, path: &Path, dry_run: bool) -> FileRecord {
        let classification = self.classifier.classify(path);
        let bucket_dir = root.join(&classification.bucket);

        let Some(name) = path.file_name() else {
            let err = FiledogError::SourceUnreadable {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            };
            return failed_record(path, &err);
        };

        if dry_run {
            return match resolve_destination(&bucket_dir, name) {
                Ok(dest) => {
                    info!(src = %path.display(), dest = %dest.display(), "dry-run: would move file");
                    FileRecord {
                        source: path.to_path_buf(),
                        dest: Some(dest),
                        bucket: Some(classification.bucket),
                        outcome: Outcome::Moved,
                        warned: classification.warned,
                    }
                }
                Err(err) => {
                    warn!(code = err.code(), path = %path.display(), "dry-run: no free destination name");
                    failed_record(path, &err)
                }
            };
        }

        if let Err(e) = fs::create_dir_all(&bucket_dir) {
            let err = FiledogError::MoveFailed {
                src: path.to_path_buf(),
                dest: bucket_dir.clone(),
                source: e,
            };
            warn!(code = err.code(), path = %path.display(), "cannot create bucket directory");
            return failed_record(path, &err);
        }

        for _ in 0..MAX_CLAIM_RETRIES {
            let dest = match resolve_destination(&bucket_dir, name) {
                Ok(d) => d,
                Err(err) => {
                    warn!(code = err.code(), path = %path.display(), "no free destination name");
                    return failed_record(path, &err);
                }
            };

            match try_move(path, &dest) {
                Ok(MoveStatus::Moved) => {
                    return FileRecord {
                        source: path.to_path_buf(),
                        dest: Some(dest),
                        bucket: Some(classification.bucket),
                        outcome: Outcome::Moved,
                        warned: classification.warned,
                    };
                }
                // Late collision: loop back into the resolver.
                Ok(MoveStatus::DestinationTaken) => continue,
                Ok(MoveStatus::SourceGone) => {
                    let err = FiledogError::AlreadyMoved(path.to_path_buf());
                    debug!(code = err.code(), path = %path.display(), "source already moved by another worker");
                    return FileRecord {
                        source: path.to_path_buf(),
                        dest: None,
                        bucket: Some(classification.bucket),
                        outcome: Outcome::SkippedAlreadyMoved,
                        warned: classification.warned,
                    };
                }
                Err(e) => {
                    let err = FiledogError::MoveFailed {
                        src: path.to_path_buf(),
                        dest,
                        source: e,
                    };
                    warn!(code = err.code(), path = %path.display(), error = %err, "move failed");
                    return failed_record(path, &err);
                }
            }
        }

        let err = FiledogError::DestinationConflict {
            dir: bucket_dir,
            name: name.to_string_lossy().into_owned(),
            attempts: MAX_CLAIM_RETRIES,
        };
        warn!(code = err.code(), path = %path.display(), "kept losing destination claims");
        failed_record(path, &err)
    }
}

fn failed_record(path: &Path, err: &FiledogError) -> FileRecord {
    FileRecord {
        source: path.to_path_buf(),
        dest: None,
        bucket: None,
        outcome: Outcome::Failed(err.to_string()),
        warned: false,
    }
}

fn is_internal_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(STAGING_PREFIX))
}
