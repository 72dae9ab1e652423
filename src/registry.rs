//! Worker registry.
//!
//! Maps opaque host-session identities to [`Worker`]s and owns their
//! lifetime. At most one worker exists per identity; inserting a replacement
//! supersedes (and thereby releases) the previous one.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::session::SessionId;
use crate::worker::Worker;

/// Process-wide worker registry.
pub struct Registry {
    workers: Mutex<HashMap<SessionId, Arc<Worker>>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Insert a worker for an identity, returning the superseded one, if any.
    pub fn insert(&self, id: SessionId, worker: Arc<Worker>) -> Option<Arc<Worker>> {
        self.workers.lock().insert(id, worker)
    }

    /// Pure lookup; `None` means the caller falls back to the native path.
    pub fn find(&self, id: SessionId) -> Option<Arc<Worker>> {
        self.workers.lock().get(&id).cloned()
    }

    /// Remove and return the worker for an identity. Idempotent.
    pub fn remove(&self, id: SessionId) -> Option<Arc<Worker>> {
        self.workers.lock().remove(&id)
    }

    /// Number of live workers.
    pub fn len(&self) -> usize {
        self.workers.lock().len()
    }

    /// Check if no workers are registered.
    pub fn is_empty(&self) -> bool {
        self.workers.lock().is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
