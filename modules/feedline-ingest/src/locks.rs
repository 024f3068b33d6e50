// Per-creator serialization of duplicate resolution.
//
// Similarity matching reads a creator's recent records and then writes one.
// Two items of the same creator resolved at once could both miss each other,
// so resolution for a creator holds that creator's lock end to end.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct CreatorLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CreatorLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `creator_id`. Released on drop.
    pub async fn acquire(&self, creator_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(creator_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Forget locks nobody holds or waits on.
    pub async fn prune(&self) {
        let mut locks = self.locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_creator_is_serialized() {
        let locks = Arc::new(CreatorLocks::new());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let (locks, active, peak) = (locks.clone(), active.clone(), peak.clone());
                tokio::spawn(async move {
                    let _guard = locks.acquire("creator-1").await;
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for t in tasks {
            t.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_creators_do_not_block_each_other() {
        let locks = CreatorLocks::new();
        let _a = locks.acquire("creator-a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("creator-b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn prune_drops_idle_locks_only() {
        let locks = CreatorLocks::new();
        let held = locks.acquire("busy").await;
        drop(locks.acquire("idle").await);

        locks.prune().await;
        assert_eq!(locks.len().await, 1);

        drop(held);
        locks.prune().await;
        assert_eq!(locks.len().await, 0);
    }
}
