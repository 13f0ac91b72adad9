//! Write-quiescence detection.
//!
//! Filesystem writes are bursty: a download emits many modification events
//! in quick succession, then goes quiet. The gate keeps one deadline entry
//! per path, re-armed on every event, and declares a file stable only after
//! a quiet period with no events AND no size change — event gaps alone
//! misjudge slow transfers with uneven pacing, size alone never finishes a
//! file written in one syscall. Paths that never quiesce are expired after
//! a bound and dropped with a warning; a later event makes them eligible
//! again.
//!
//! Callers pass `now` explicitly so tests can fabricate timelines.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug)]
struct PendingFile {
    first_seen: Instant,
    last_event: Instant,
    last_size: Option<u64>,
    last_size_change: Instant,
}

/// Paths that left the pending set in one poll pass.
#[derive(Debug, Default)]
pub struct Sweep {
    /// Quiet long enough; ready for the organizer.
    pub stable: Vec<PathBuf>,
    /// Never quiesced within the bound; dropped.
    pub expired: Vec<PathBuf>,
}

/// Tracks not-yet-stable files between filesystem events and poll passes.
#[derive(Debug)]
pub struct StabilityGate {
    pending: HashMap<PathBuf, PendingFile>,
    quiet_period: Duration,
    max_pending: Duration,
}

impl StabilityGate {
    pub fn new(quiet_period: Duration, max_pending: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            quiet_period,
            max_pending,
        }
    }

    /// Record a creation/modification event for `path`, re-arming its
    /// deadline. Cheap: one stat, no blocking.
    pub fn observe(&mut self, path: &Path, now: Instant) {
        let size = fs::metadata(path).ok().map(|m| m.len());
        let entry = self
            .pending
            .entry(path.to_path_buf())
            .or_insert_with(|| PendingFile {
                first_seen: now,
                last_event: now,
                last_size: size,
                last_size_change: now,
            });
        entry.last_event = now;
        if entry.last_size != size {
            entry.last_size = size;
            entry.last_size_change = now;
        }
    }

    /// Sweep the pending set: collect paths that became stable or expired,
    /// removing them. Vanished files are silently forgotten.
    pub fn poll(&mut self, now: Instant) -> Sweep {
        let quiet_period = self.quiet_period;
        let max_pending = self.max_pending;
        let mut sweep = Sweep::default();

        self.pending.retain(|path, entry| {
            match fs::metadata(path) {
                Ok(meta) => {
                    let size = Some(meta.len());
                    if entry.last_size != size {
                        entry.last_size = size;
                        entry.last_size_change = now;
                    }
                }
                Err(_) => {
                    debug!(path = %path.display(), "pending file vanished; forgetting it");
                    return false;
                }
            }

            let quiet_since = entry.last_event.max(entry.last_size_change);
            if now.saturating_duration_since(quiet_since) >= quiet_period {
                sweep.stable.push(path.clone());
                return false;
            }
            if now.saturating_duration_since(entry.first_seen) >= max_pending {
                debug!(path = %path.display(), "pending window exhausted");
                sweep.expired.push(path.clone());
                return false;
            }
            true
        });

        sweep.stable.sort();
        sweep.expired.sort();
        sweep
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop pending entries under `dir` (used when a watch is removed).
    pub fn forget_under(&mut self, dir: &Path) {
        self.pending.retain(|path, _| !path.starts_with(dir));
    }
}
