//! Bridge metrics collection.
//!
//! Aggregate counters only; nothing here identifies a host or session.

use std::sync::atomic::{AtomicU64, Ordering};

/// Bridge metrics collector.
#[derive(Default)]
pub struct BridgeMetrics {
    /// Workers created (including replacements)
    workers_created: AtomicU64,
    /// Workers released
    workers_released: AtomicU64,
    /// Operations answered with the native-fallback verdict
    native_fallbacks: AtomicU64,
    /// Handshakes synthesized successfully
    handshakes_completed: AtomicU64,
    /// Hard handshake failures
    handshake_failures: AtomicU64,
    /// Hosts moved into the probing cycle
    probes_started: AtomicU64,
}

impl BridgeMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn worker_created(&self) {
        self.workers_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn worker_released(&self) {
        self.workers_released.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn native_fallback(&self) {
        self.native_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn handshake_completed(&self) {
        self.handshakes_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn handshake_failed(&self) {
        self.handshake_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn probe_started(&self) {
        self.probes_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            workers_created: self.workers_created.load(Ordering::Relaxed),
            workers_released: self.workers_released.load(Ordering::Relaxed),
            native_fallbacks: self.native_fallbacks.load(Ordering::Relaxed),
            handshakes_completed: self.handshakes_completed.load(Ordering::Relaxed),
            handshake_failures: self.handshake_failures.load(Ordering::Relaxed),
            probes_started: self.probes_started.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the bridge counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Workers created (including replacements)
    pub workers_created: u64,
    /// Workers released
    pub workers_released: u64,
    /// Operations answered with the native-fallback verdict
    pub native_fallbacks: u64,
    /// Handshakes synthesized successfully
    pub handshakes_completed: u64,
    /// Hard handshake failures
    pub handshake_failures: u64,
    /// Hosts moved into the probing cycle
    pub probes_started: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = BridgeMetrics::new();
        metrics.worker_created();
        metrics.worker_created();
        metrics.worker_released();
        metrics.native_fallback();
        metrics.handshake_completed();
        metrics.handshake_failed();
        metrics.probe_started();

        let snap = metrics.snapshot();
        assert_eq!(snap.workers_created, 2);
        assert_eq!(snap.workers_released, 1);
        assert_eq!(snap.native_fallbacks, 1);
        assert_eq!(snap.handshakes_completed, 1);
        assert_eq!(snap.handshake_failures, 1);
        assert_eq!(snap.probes_started, 1);
    }
}
