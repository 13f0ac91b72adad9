//! The watch engine: subscribes to filesystem notifications for every
//! enabled directory, debounces bursts through the stability gate, and
//! hands stable files to the organizer.
//!
//! Producer/consumer shape: the notify backend pushes raw event paths into
//! a channel (non-blocking), and a single dispatch thread drains it with a
//! bounded `recv_timeout`. Each tick it reconciles the registry (directories
//! added, removed, or toggled while running), sweeps the gate, and organizes
//! whatever came out stable. Shutdown is cooperative: the stop flag is
//! checked once per tick, so stop latency is bounded by the tick interval,
//! and an in-flight organize always completes — moves are never interrupted
//! mid-flight.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::errors::FiledogError;
use crate::organize::{Organizer, Outcome, STAGING_PREFIX};

use super::registry::{WatchRegistry, WatchSubscription};
use super::stability::StabilityGate;

/// Timing knobs for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub quiet_period: Duration,
    pub max_pending: Duration,
    pub tick_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            quiet_period: Duration::from_secs(2),
            max_pending: Duration::from_secs(300),
            tick_interval: Duration::from_millis(500),
        }
    }
}

impl From<&Config> for EngineConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            quiet_period: cfg.quiet_period,
            max_pending: cfg.max_pending,
            tick_interval: cfg.tick_interval,
        }
    }
}

/// Snapshot returned by `status()`.
#[derive(Debug, Clone)]
pub struct WatchStatus {
    pub running: bool,
    pub directories: Vec<WatchSubscription>,
}

/// One independent watch-and-organize engine. Constructor-supplied
/// configuration, explicit shutdown; multiple instances coexist in tests.
pub struct WatchEngine {
    registry: Arc<WatchRegistry>,
    organizer: Arc<Organizer>,
    cfg: EngineConfig,
    stop: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WatchEngine {
    pub fn new(registry: Arc<WatchRegistry>, organizer: Arc<Organizer>, cfg: EngineConfig) -> Self {
        Self {
            registry,
            organizer,
            cfg,
            stop: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    /// Spawn the dispatch loop. Idempotent: returns Ok(false) when the
    /// engine is already running.
    pub fn start(&self) -> Result<bool> {
        let mut slot = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("watch engine already running");
            return Ok(false);
        }
        // Reap a loop that exited on its own.
        if let Some(handle) = slot.take() {
            let _ = handle.join();
        }

        self.stop.store(false, Ordering::Relaxed);

        let (tx, rx) = crossbeam_channel::unbounded::<PathBuf>();
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        for path in event.paths {
                            // Enqueue and return; never block the backend.
                            let _ = tx.send(path);
                        }
                    }
                }
                Err(e) => error!(error = %e, "filesystem watch error"),
            },
            notify::Config::default(),
        )
        .context("create filesystem watcher")?;

        let registry = Arc::clone(&self.registry);
        let organizer = Arc::clone(&self.organizer);
        let stop = Arc::clone(&self.stop);
        let cfg = self.cfg.clone();
        let handle = std::thread::Builder::new()
            .name("filedog-watch".into())
            .spawn(move || dispatch_loop(watcher, rx, registry, organizer, cfg, stop))
            .context("spawn watch dispatch thread")?;

        *slot = Some(handle);
        info!("watch engine started");
        Ok(true)
    }

    /// Signal the dispatch loop to finish its current tick and exit, then
    /// join it. Latency is bounded by the tick interval.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("watch dispatch thread panicked");
            }
            info!("watch engine stopped");
        }
    }

    pub fn status(&self) -> WatchStatus {
        let running = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished());
        WatchStatus {
            running,
            directories: self.registry.list(),
        }
    }
}

impl Drop for WatchEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn dispatch_loop(
    mut watcher: RecommendedWatcher,
    rx: Receiver<PathBuf>,
    registry: Arc<WatchRegistry>,
    organizer: Arc<Organizer>,
    cfg: EngineConfig,
    stop: Arc<AtomicBool>,
) {
    let mut gate = StabilityGate::new(cfg.quiet_period, cfg.max_pending);
    let mut active: HashSet<PathBuf> = HashSet::new();
    reconcile(&mut watcher, &registry, &mut active, &mut gate);
    let mut next_tick = Instant::now() + cfg.tick_interval;

    while !stop.load(Ordering::Relaxed) {
        let now = Instant::now();

        // The tick runs on its own deadline so a continuous event stream
        // cannot starve the stability sweep.
        if now >= next_tick {
            reconcile(&mut watcher, &registry, &mut active, &mut gate);

            let sweep = gate.poll(now);
            for path in sweep.stable {
                let record = organizer.organize_file(&path, false);
                match &record.outcome {
                    Outcome::Moved => {
                        debug!(src = %path.display(), "organized stable file");
                    }
                    Outcome::SkippedInBucket | Outcome::SkippedAlreadyMoved => {}
                    Outcome::Failed(reason) => {
                        warn!(src = %path.display(), reason, "failed to organize stable file");
                    }
                }
            }
            for path in sweep.expired {
                let err = FiledogError::StabilityTimeout(path.clone());
                warn!(code = err.code(), path = %path.display(), "dropping never-quiet file");
            }

            next_tick = now + cfg.tick_interval;
            continue;
        }

        match rx.recv_timeout(next_tick - now) {
            Ok(path) => route_event(&mut gate, &path),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    for dir in active.drain() {
        let _ = watcher.unwatch(&dir);
    }
    debug!("watch dispatch loop exited");
}

/// Feed one raw event path into the gate, filtering noise: directories,
/// symlinks, and our own transient staging names.
fn route_event(gate: &mut StabilityGate, path: &Path) {
    let internal = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(STAGING_PREFIX));
    if internal {
        return;
    }
    if let Ok(meta) = fs::symlink_metadata(path)
        && meta.is_file()
    {
        gate.observe(path, Instant::now());
    }
}

/// Bring the set of live notify subscriptions in line with the registry.
/// Runs once per tick, so add/remove/enable/disable take effect while the
/// engine is running without any extra signaling.
fn reconcile(
    watcher: &mut RecommendedWatcher,
    registry: &WatchRegistry,
    active: &mut HashSet<PathBuf>,
    gate: &mut StabilityGate,
) {
    let mut wanted: HashSet<PathBuf> = registry.enabled_dirs().into_iter().collect();

    // A watched directory that disappeared is treated as remove-and-log.
    for dir in wanted.clone() {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "watched directory no longer exists; removing subscription");
            registry.remove(&dir);
            wanted.remove(&dir);
        }
    }

    let stale: Vec<PathBuf> = active.difference(&wanted).cloned().collect();
    for dir in stale {
        if let Err(e) = watcher.unwatch(&dir) {
            debug!(dir = %dir.display(), error = %e, "unwatch failed (already gone?)");
        }
        active.remove(&dir);
        gate.forget_under(&dir);
        info!(dir = %dir.display(), "stopped watching directory");
    }

    let fresh: Vec<PathBuf> = wanted.difference(active).cloned().collect();
    for dir in fresh {
        match watcher.watch(&dir, RecursiveMode::Recursive) {
            Ok(()) => {
                active.insert(dir.clone());
                info!(dir = %dir.display(), "watching directory");
            }
            Err(e) => {
                let err = FiledogError::WatchFailed(dir.clone());
                warn!(code = err.code(), dir = %dir.display(), error = %e, "cannot watch directory; disabling subscription");
                registry.set_enabled(&dir, false);
            }
        }
    }
}
