//! Per-resource mutual exclusion.
//!
//! Each on-disk path gets one mutex, created on first use and kept for the
//! lifetime of the registry. The registry lock is only held to look up or
//! insert an entry, never while a resource lock is waited on or held.

use crate::debug;
use parking_lot::{ArcMutexGuard, Mutex, RawMutex, RwLock};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Held while a request works on a resource; dropping it releases the lock.
pub type ResourceGuard = ArcMutexGuard<RawMutex, ()>;

/// Registry of per-path locks, owned by a server instance.
#[derive(Default)]
pub struct LockRegistry {
    locks: RwLock<FxHashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `path` is free and take it.
    pub fn acquire(&self, path: &Path) -> ResourceGuard {
        let lock = self.lock_for(path);
        if let Some(guard) = lock.try_lock_arc() {
            return guard;
        }
        debug!("lock"; "waiting for {}", path.display());
        lock.lock_arc()
    }

    /// Number of distinct paths ever locked.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.locks.read().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.locks.read().is_empty()
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().get(path) {
            return Arc::clone(lock);
        }
        // Another thread may have inserted between the two lookups.
        let mut locks = self.locks.write();
        Arc::clone(locks.entry(path.to_path_buf()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_one_lock_per_path() {
        let registry = LockRegistry::new();
        assert!(registry.is_empty());
        drop(registry.acquire(Path::new("/srv/a")));
        drop(registry.acquire(Path::new("/srv/a")));
        drop(registry.acquire(Path::new("/srv/b")));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_guard_release_on_drop() {
        let registry = LockRegistry::new();
        let guard = registry.acquire(Path::new("/srv/a"));
        assert!(registry.lock_for(Path::new("/srv/a")).try_lock().is_none());
        drop(guard);
        assert!(registry.lock_for(Path::new("/srv/a")).try_lock().is_some());
    }

    #[test]
    fn test_distinct_paths_do_not_block() {
        let registry = LockRegistry::new();
        let _a = registry.acquire(Path::new("/srv/a"));
        let _b = registry.acquire(Path::new("/srv/b"));
    }

    #[test]
    fn test_same_path_is_serialized() {
        let registry = Arc::new(LockRegistry::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    let _guard = registry.acquire(Path::new("/srv/shared"));
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(2));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lock_released_on_panic() {
        let registry = Arc::new(LockRegistry::new());
        let worker = Arc::clone(&registry);
        let result = thread::spawn(move || {
            let _guard = worker.acquire(Path::new("/srv/a"));
            panic!("handler failed");
        })
        .join();
        assert!(result.is_err());
        drop(registry.acquire(Path::new("/srv/a")));
    }
}
