//! Per-learner serialization of read-modify-write sequences.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::types::LearnerId;

/// One async mutex per learner, created on demand.
///
/// Entries hold weak references, so a learner's mutex is dropped once no
/// request is using it; the map is pruned of dead entries on insert.
#[derive(Debug, Default)]
pub struct LearnerLocks {
    locks: Mutex<HashMap<LearnerId, Weak<AsyncMutex<()>>>>,
}

impl LearnerLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn mutex_for(&self, learner_id: &LearnerId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = locks.get(learner_id).and_then(Weak::upgrade) {
            return existing;
        }
        locks.retain(|_, weak| weak.strong_count() > 0);
        let mutex = Arc::new(AsyncMutex::new(()));
        locks.insert(learner_id.clone(), Arc::downgrade(&mutex));
        mutex
    }

    /// Wait for exclusive access to `learner_id`.
    pub async fn lock(&self, learner_id: &LearnerId) -> OwnedMutexGuard<()> {
        self.mutex_for(learner_id).lock_owned().await
    }

    /// Learners with a live mutex.
    #[must_use]
    pub fn active(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.values().filter(|w| w.strong_count() > 0).count()
    }
}
