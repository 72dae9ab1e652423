//! Per-session worker state.
//!
//! A [`Worker`] bridges one host session to one alternate-engine handle. It
//! also carries the session-scoped certificate-selection state that the
//! original design kept in process-wide globals: the pinned client
//! certificate awaiting consumption and the "this handshake is
//! alternate-suite" flag read by the client-certificate enumeration hook.

use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use parking_lot::{Mutex, MutexGuard};

use crate::engine::EngineHandle;
use crate::status::HostStatus;

/// Per-session record owned by the registry.
pub struct Worker {
    handle: Mutex<Box<dyn EngineHandle>>,
    cache_key: String,
    status: Mutex<HostStatus>,
    pinned_cert: Mutex<Option<Bytes>>,
    alternate_handshake: AtomicBool,
}

impl Worker {
    /// Bundle an opened engine handle with its resolved capability status.
    pub fn new(handle: Box<dyn EngineHandle>, cache_key: String, status: HostStatus) -> Self {
        Self {
            handle: Mutex::new(handle),
            cache_key,
            status: Mutex::new(status),
            pinned_cert: Mutex::new(None),
            alternate_handshake: AtomicBool::new(false),
        }
    }

    /// Exclusive access to the engine handle.
    pub fn handle(&self) -> MutexGuard<'_, Box<dyn EngineHandle>> {
        self.handle.lock()
    }

    /// The capability-cache key this worker resolves against.
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    /// Capability status snapshot for this session.
    pub fn status(&self) -> HostStatus {
        *self.status.lock()
    }

    /// Update the session-local status snapshot.
    pub fn set_status(&self, status: HostStatus) {
        *self.status.lock() = status;
    }

    /// Pin a just-selected client certificate for the next engine step.
    ///
    /// A pin already awaiting consumption wins over later ones, matching the
    /// first-write semantics of the hook contract.
    pub fn pin_client_cert(&self, der: Bytes) {
        let mut pinned = self.pinned_cert.lock();
        if pinned.is_none() {
            *pinned = Some(der);
        }
    }

    /// Consume the pinned certificate, clearing it.
    pub fn take_pinned_cert(&self) -> Option<Bytes> {
        self.pinned_cert.lock().take()
    }

    /// Flag the in-flight handshake as alternate-suite for the duration of
    /// certificate selection.
    pub fn set_alternate_handshake(&self, active: bool) {
        self.alternate_handshake.store(active, Ordering::SeqCst);
    }

    /// Whether the in-flight handshake is alternate-suite.
    pub fn alternate_handshake(&self) -> bool {
        self.alternate_handshake.load(Ordering::SeqCst)
    }
}
