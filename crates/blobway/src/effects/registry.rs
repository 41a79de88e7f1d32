use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

/// In-flight transfers by task id, for cancellation.
///
/// Task ids are not deduplicated: transfers registered under the same id
/// share one token, so cancelling that id cancels all of them. The entry
/// is dropped when the last of them finishes.
#[derive(Debug, Clone, Default)]
pub struct CancelRegistry {
    inner: Arc<Mutex<HashMap<String, Entry>>>,
}

#[derive(Debug)]
struct Entry {
    token: CancellationToken,
    active: usize,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track a transfer until the returned guard is dropped.
    pub fn register(&self, task_id: &str) -> CancelGuard {
        let mut map = self.lock();
        let entry = map.entry(task_id.to_string()).or_insert_with(|| Entry {
            token: CancellationToken::new(),
            active: 0,
        });
        entry.active += 1;
        CancelGuard {
            registry: self.clone(),
            task_id: task_id.to_string(),
            token: entry.token.clone(),
        }
    }

    /// Cancel every in-flight transfer with `task_id`. Returns `false` if
    /// none is running.
    pub fn cancel(&self, task_id: &str) -> bool {
        match self.lock().get(task_id) {
            Some(entry) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel everything in flight.
    pub fn cancel_all(&self) -> usize {
        let map = self.lock();
        for entry in map.values() {
            entry.token.cancel();
        }
        map.len()
    }

    pub fn is_active(&self, task_id: &str) -> bool {
        self.lock().contains_key(task_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn release(&self, task_id: &str) {
        let mut map = self.lock();
        if let Some(entry) = map.get_mut(task_id) {
            entry.active -= 1;
            if entry.active == 0 {
                map.remove(task_id);
            }
        }
    }
}

/// Registration of one transfer; unregisters on drop.
#[derive(Debug)]
pub struct CancelGuard {
    registry: CancelRegistry,
    task_id: String,
    token: CancellationToken,
}

impl CancelGuard {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.registry.release(&self.task_id);
    }
}
