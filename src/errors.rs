//! Typed error definitions for filedog.
//! Provides a small set of well-known failure modes for better logs and tests.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FiledogError {
    #[error("Cannot read source {path}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No free name for '{name}' in {dir} after {attempts} attempts")]
    DestinationConflict {
        dir: PathBuf,
        name: String,
        attempts: u32,
    },

    #[error("Failed to move {src} to {dest}")]
    MoveFailed {
        src: PathBuf,
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source already moved by another worker: {0}")]
    AlreadyMoved(PathBuf),

    #[error("File never quiesced while pending: {0}")]
    StabilityTimeout(PathBuf),

    #[error("Failed to watch directory {0}")]
    WatchFailed(PathBuf),

    #[error("Operation interrupted by user")]
    Interrupted,
}

impl FiledogError {
    /// Stable identifier for structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SourceUnreadable { .. } => "source_unreadable",
            Self::DestinationConflict { .. } => "destination_conflict",
            Self::MoveFailed { .. } => "move_failed",
            Self::AlreadyMoved(_) => "already_moved",
            Self::StabilityTimeout(_) => "stability_timeout",
            Self::WatchFailed(_) => "watch_failed",
            Self::Interrupted => "interrupted",
        }
    }
}
