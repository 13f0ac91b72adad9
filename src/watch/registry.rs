//! Watch subscription registry.
//!
//! Holds the set of directories the engine should observe. Mutations are
//! safe while the dispatch loop is concurrently reading: every access goes
//! through the interior mutex, and the loop only ever takes snapshots.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use crate::config::WatchedDir;

/// One registered directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSubscription {
    pub dir: PathBuf,
    pub enabled: bool,
}

/// Set of active per-directory watch subscriptions.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    inner: Mutex<Vec<WatchSubscription>>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the registry from persisted config entries.
    pub fn from_config(dirs: &[WatchedDir]) -> Self {
        let registry = Self::new();
        for d in dirs {
            let added = registry.add(&d.path);
            if added && !d.enabled {
                registry.set_enabled(&d.path, false);
            }
        }
        registry
    }

    /// Register a directory (enabled). Idempotent: returns false when the
    /// directory is already registered.
    pub fn add(&self, dir: impl AsRef<Path>) -> bool {
        let dir = normalize(dir.as_ref());
        let mut inner = self.lock();
        if inner.iter().any(|s| s.dir == dir) {
            debug!(dir = %dir.display(), "directory already registered");
            return false;
        }
        inner.push(WatchSubscription { dir, enabled: true });
        true
    }

    /// Remove a directory. Returns false when it was not registered.
    pub fn remove(&self, dir: &Path) -> bool {
        let dir = normalize(dir);
        let mut inner = self.lock();
        let before = inner.len();
        inner.retain(|s| s.dir != dir);
        inner.len() != before
    }

    /// Toggle a directory without unregistering it. Returns false when the
    /// directory is not registered.
    pub fn set_enabled(&self, dir: &Path, enabled: bool) -> bool {
        let dir = normalize(dir);
        let mut inner = self.lock();
        match inner.iter_mut().find(|s| s.dir == dir) {
            Some(sub) => {
                sub.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn list(&self) -> Vec<WatchSubscription> {
        self.lock().clone()
    }

    /// Snapshot of enabled directories, for the dispatch loop's reconcile
    /// pass.
    pub fn enabled_dirs(&self) -> Vec<PathBuf> {
        self.lock()
            .iter()
            .filter(|s| s.enabled)
            .map(|s| s.dir.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<WatchSubscription>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn normalize(dir: &Path) -> PathBuf {
    fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn add_is_idempotent() {
        let td = tempdir().unwrap();
        let registry = WatchRegistry::new();
        assert!(registry.add(td.path()));
        assert!(!registry.add(td.path()));
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn remove_unknown_is_false() {
        let td = tempdir().unwrap();
        let registry = WatchRegistry::new();
        assert!(!registry.remove(td.path()));
    }

    #[test]
    fn disabled_dirs_stay_registered_but_inert() {
        let td = tempdir().unwrap();
        let registry = WatchRegistry::new();
        registry.add(td.path());
        assert!(registry.set_enabled(td.path(), false));

        assert_eq!(registry.list().len(), 1);
        assert!(registry.enabled_dirs().is_empty());

        registry.set_enabled(td.path(), true);
        assert_eq!(registry.enabled_dirs().len(), 1);
    }

    #[test]
    fn from_config_preserves_enabled_flags() {
        let td = tempdir().unwrap();
        let a = td.path().join("a");
        let b = td.path().join("b");
        std::fs::create_dir(&a).unwrap();
        std::fs::create_dir(&b).unwrap();

        let registry = WatchRegistry::from_config(&[
            WatchedDir {
                path: a.clone(),
                enabled: true,
            },
            WatchedDir {
                path: b.clone(),
                enabled: false,
            },
        ]);
        assert_eq!(registry.list().len(), 2);
        assert_eq!(registry.enabled_dirs().len(), 1);
    }
}
