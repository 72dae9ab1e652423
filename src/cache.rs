//! Process-wide host capability cache.
//!
//! Maps `host:discriminator` keys to [`HostStatus`] values independently of
//! any single connection. Optionally seeded from and mirrored to a persistent
//! backing store so terminal verdicts survive a process restart.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::status::HostStatus;

/// Persistent backing store for host capability statuses.
///
/// Consulted at cache-miss time and written on every status update. A failing
/// store must degrade silently: `load` returns `None`, `store` is best-effort.
pub trait StatusStore: Send + Sync {
    /// Load the persisted status for a key, if any.
    fn load(&self, key: &str) -> Option<HostStatus>;

    /// Persist a status for a key. Failures are swallowed by implementations.
    fn store(&self, key: &str, status: HostStatus);
}

/// In-memory capability cache with optional persistence.
pub struct HostCache {
    entries: Mutex<HashMap<String, HostStatus>>,
    store: Option<Box<dyn StatusStore>>,
}

impl HostCache {
    /// Create a cache with no persistent backing.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            store: None,
        }
    }

    /// Create a cache mirrored to a persistent store.
    pub fn with_store(store: Box<dyn StatusStore>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            store: Some(store),
        }
    }

    /// Get the status for a key.
    ///
    /// On a miss the persistent store is consulted and the cache seeded; only
    /// terminal verdicts are trusted across restarts, anything else restarts
    /// as `Unknown`.
    pub fn get(&self, key: &str) -> HostStatus {
        let mut entries = self.entries.lock();

        if let Some(status) = entries.get(key) {
            return *status;
        }

        if let Some(store) = &self.store {
            if let Some(seed) = store.load(key).filter(|s| s.is_terminal()) {
                tracing::debug!(key, ?seed, "seeded host status from store");
                entries.insert(key.to_owned(), seed);
                return seed;
            }
        }

        HostStatus::Unknown
    }

    /// Store a status for a key, honoring the sticky-state rule.
    ///
    /// An existing `Supported`/`Unsupported` entry is only replaced by another
    /// terminal value. The effective status is mirrored to the persistent
    /// store.
    pub fn set(&self, key: &str, status: HostStatus) {
        let mut entries = self.entries.lock();

        let merged = match entries.get(key) {
            Some(current) => HostStatus::merge(*current, status),
            None => status,
        };

        if merged != status {
            tracing::debug!(key, kept = ?merged, rejected = ?status, "sticky status kept");
        }

        entries.insert(key.to_owned(), merged);

        if let Some(store) = &self.store {
            store.store(key, merged);
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for HostCache {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON-file-backed status store.
///
/// One flat object mapping cache keys to statuses. The whole file is loaded
/// at open time and rewritten on each update; sizes stay tiny (one entry per
/// distinct remote endpoint).
#[cfg(feature = "persist")]
pub struct FileStatusStore {
    path: std::path::PathBuf,
    state: Mutex<HashMap<String, HostStatus>>,
}

#[cfg(feature = "persist")]
impl FileStatusStore {
    /// Open a store at `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<std::path::PathBuf>) -> Self {
        let path = path.into();
        let state = std::fs::read(&path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();

        Self {
            path,
            state: Mutex::new(state),
        }
    }

    fn flush(&self, state: &HashMap<String, HostStatus>) {
        let json = match serde_json::to_vec_pretty(state) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(%err, "failed to serialize status store");
                return;
            }
        };

        if let Err(err) = std::fs::write(&self.path, json) {
            tracing::warn!(%err, path = %self.path.display(), "failed to write status store");
        }
    }
}

#[cfg(feature = "persist")]
impl StatusStore for FileStatusStore {
    fn load(&self, key: &str) -> Option<HostStatus> {
        self.state.lock().get(key).copied()
    }

    fn store(&self, key: &str, status: HostStatus) {
        let mut state = self.state.lock();
        state.insert(key.to_owned(), status);
        self.flush(&state);
    }
}
