//! Per-share mutation locks.
//!
//! Aggregate metadata (`size`/`count`) is maintained with a read-modify-write
//! cycle over the live item set; two concurrent item mutations on the same
//! share would otherwise lose one update. Every mutating backend operation
//! holds the share's lock for the full mutation + recompute sequence.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

/// Registry of per-share-name mutexes.
#[derive(Debug, Clone, Default)]
pub struct ShareLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl ShareLocks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the lock guarding a share's item set and aggregates.
    pub fn for_share(&self, name: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lock entry after a share is deleted.
    pub fn forget(&self, name: &str) {
        self.locks.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_share_same_lock() {
        let locks = ShareLocks::new();
        let a = locks.for_share("demo");
        let b = locks.for_share("demo");
        assert!(Arc::ptr_eq(&a, &b));

        let c = locks.for_share("other");
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn test_lock_serializes_critical_sections() {
        let locks = ShareLocks::new();
        let lock = locks.for_share("demo");

        let guard = lock.lock().await;
        assert!(lock.try_lock().is_err());
        drop(guard);
        assert!(lock.try_lock().is_ok());
    }

    #[test]
    fn test_forget_resets_entry() {
        let locks = ShareLocks::new();
        let a = locks.for_share("demo");
        locks.forget("demo");
        let b = locks.for_share("demo");
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
