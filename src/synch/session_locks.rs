use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};

// Per-key mutex plus the number of callers holding or waiting on it.
struct Slot {
    mutex: Arc<Mutex<()>>,
    users: usize,
}

/// Keyed async locks: one turn at a time per key, unrelated keys run concurrently.
/// A key's entry is dropped once nobody holds or waits on it.
pub struct SessionLocks<T: Eq + Hash + Clone> {
    slots: Arc<StdMutex<HashMap<T, Slot>>>,
}

pub struct SessionGuard<T: Eq + Hash + Clone> {
    _guard: OwnedMutexGuard<()>,
    _registration: Registration<T>,
}

impl<T: Eq + Hash + Clone> SessionLocks<T> {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    /// Waits for the lock on `key`. The returned guard releases it when dropped.
    pub async fn lock(&self, key: T) -> SessionGuard<T> {
        let mutex = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            let slot = slots.entry(key.clone()).or_insert_with(|| Slot {
                mutex: Arc::new(Mutex::new(())),
                users: 0,
            });
            slot.users += 1;
            slot.mutex.clone()
        };

        // Registered before awaiting, so a cancelled wait still releases its count.
        let registration = Registration {
            key,
            slots: self.slots.clone(),
        };
        let guard = mutex.lock_owned().await;

        SessionGuard {
            _guard: guard,
            _registration: registration,
        }
    }

    /// Number of keys currently held or awaited.
    #[cfg(test)]
    pub(crate) fn active(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl<T: Eq + Hash + Clone> Default for SessionLocks<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct Registration<T: Eq + Hash + Clone> {
    key: T,
    slots: Arc<StdMutex<HashMap<T, Slot>>>,
}

impl<T: Eq + Hash + Clone> Drop for Registration<T> {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = slots.get_mut(&self.key) {
            slot.users -= 1;
            if slot.users == 0 {
                slots.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn same_key_is_serialized() {
        let locks = Arc::new(SessionLocks::new());
        let first = locks.lock("a".to_string()).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("a".to_string()).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(first);
        timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = SessionLocks::new();
        let _a = locks.lock("a".to_string()).await;
        let b = timeout(Duration::from_millis(200), locks.lock("b".to_string())).await;
        assert!(b.is_ok());
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn cancelled_waiter_releases_its_slot() {
        let locks = SessionLocks::new();
        let held = locks.lock(1u32).await;
        let cancelled = timeout(Duration::from_millis(20), locks.lock(1u32)).await;
        assert!(cancelled.is_err());

        drop(held);
        assert_eq!(locks.active(), 0);
    }
}
