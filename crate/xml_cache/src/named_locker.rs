//! Per-name mutual exclusion.
//!
//! A [`NamedLocker`] hands out one mutex per string name so that
//! "construct or fetch" sections keyed by a logical name are serialized
//! without funnelling unrelated names through a single global lock.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use tracing::{debug, trace};

/// The lock object shared by every caller using the same name.
pub type LockHandle = Arc<Mutex<()>>;

/// Table of lazily created, named locks.
///
/// Entries live until [`NamedLocker::release`] is called. Releasing a name
/// while a critical section still holds its lock is a caller error: the next
/// caller receives a fresh lock for that name and is therefore not excluded
/// from the section still running with the old one. The registry does not
/// try to detect this.
#[derive(Debug, Default)]
pub struct NamedLocker {
    locks: RwLock<HashMap<String, LockHandle>>,
}

impl NamedLocker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the lock associated with `name`, creating it if absent.
    ///
    /// Concurrent callers asking for the same name receive the same lock.
    pub fn acquire(&self, name: &str) -> LockHandle {
        // the map holds no invariant that a panicking holder could break
        if let Some(lock) = self
            .locks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Arc::clone(lock);
        }

        let mut locks = self.locks.write().unwrap_or_else(PoisonError::into_inner);
        let lock = locks.entry(name.to_owned()).or_insert_with(|| {
            debug!("NamedLocker: creating lock {name}");
            Arc::new(Mutex::new(()))
        });
        Arc::clone(lock)
    }

    /// Run `body` while holding the lock for `name`.
    ///
    /// The lock is released on every exit path, including when `body`
    /// panics. Whatever `body` returns, value or error, is handed back
    /// unchanged.
    pub fn run_exclusive<R, F>(&self, name: &str, body: F) -> R
    where
        F: FnOnce() -> R,
    {
        let lock = self.acquire(name);
        // a previous holder panicked: the guarded unit value cannot be corrupt
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        trace!("NamedLocker: entered {name}");
        body()
    }

    /// Remove the lock for `name`. Returns whether an entry was present.
    ///
    /// Only safe when no critical section for `name` is in flight.
    pub fn release(&self, name: &str) -> bool {
        let removed = self
            .locks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some();
        if removed {
            debug!("NamedLocker: released lock {name}");
        }
        removed
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.locks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
