use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per id. Shop locks cover read-check-write of a shop's
/// schedule; user locks cover the quota count.
#[derive(Debug, Clone, Default)]
pub struct KeyedLocks {
    locks: Arc<Mutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    async fn handle(&self, id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(id).or_default().clone()
    }

    pub async fn lock(&self, id: i64) -> OwnedMutexGuard<()> {
        self.handle(id).await.lock_owned().await
    }

    /// Locks every distinct id in ascending order.
    pub async fn lock_many(&self, ids: &[i64]) -> Vec<OwnedMutexGuard<()>> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.lock(id).await);
        }
        guards
    }
}
