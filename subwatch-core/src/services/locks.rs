//! Per-target serialization

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};

type Registry = Arc<StdMutex<HashMap<i64, Arc<Mutex<()>>>>>;

/// Registry of one async mutex per target
///
/// Every operation that reads and then writes a target's scan or schedule state
/// holds that target's guard for the whole read-modify-write. Different targets
/// never contend. An entry lives only while a guard or a waiter holds it, so
/// requests for unknown or deleted targets leave nothing behind.
#[derive(Default)]
pub struct TargetLocks {
    registry: Registry,
}

/// Exclusive access to one target; releases and prunes on drop.
pub struct TargetGuard {
    target_id: i64,
    guard: Option<OwnedMutexGuard<()>>,
    registry: Registry,
}

fn lock_registry(registry: &StdMutex<HashMap<i64, Arc<Mutex<()>>>>) -> MutexGuard<'_, HashMap<i64, Arc<Mutex<()>>>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TargetLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to one target.
    pub async fn acquire(&self, target_id: i64) -> TargetGuard {
        let lock = Arc::clone(lock_registry(&self.registry).entry(target_id).or_default());
        TargetGuard {
            target_id,
            guard: Some(lock.lock_owned().await),
            registry: Arc::clone(&self.registry),
        }
    }

    /// Number of targets with a registered lock.
    #[must_use]
    pub fn len(&self) -> usize {
        lock_registry(&self.registry).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for TargetGuard {
    fn drop(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };
        let lock = Arc::clone(OwnedMutexGuard::mutex(&guard));
        drop(guard);

        // Waiters clone the Arc under the registry lock, so a count of two
        // (registry + `lock`) means nobody else is queued on this target.
        let mut registry = lock_registry(&self.registry);
        if registry
            .get(&self.target_id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &lock) && Arc::strong_count(entry) == 2)
        {
            registry.remove(&self.target_id);
        }
    }
}
