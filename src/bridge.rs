//! Bridge facade: the entry points the host TLS stack drives.
//!
//! Registration, I/O forwarding, teardown, suite classification and the
//! verification hook live here; the handshake emulation itself is in
//! [`crate::handshake`]. Every operation resolves the session's worker first
//! and answers [`Verdict::Native`] when the session is not (or not yet)
//! bridged, leaving the host session untouched on that path.

use std::sync::Arc;

use bytes::Bytes;

use crate::cache::{HostCache, StatusStore};
use crate::certs::{self, CertStore};
use crate::engine::{EngineState, GostEngine, VerifyOutcome};
use crate::error::{Error, Result};
use crate::metrics::BridgeMetrics;
use crate::registry::Registry;
use crate::session::{HostCapabilities, HostSession, SessionId, WaitState};
use crate::status::{cache_key, HostStatus};
use crate::worker::Worker;
use crate::{BridgeConfig, TLS_GOST_CIPHER_2001, TLS_GOST_CIPHER_2012};

/// Verification code meaning the engine trusts the peer chain.
pub const VERIFY_TRUSTED: u32 = 1;

/// Sentinel verification code for an outright trust failure.
pub const CRITICAL_TRUST_ERROR: u32 = 0x800B_0105;

/// Answer of a bridged operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The session is not on the alternate path; the host stack proceeds
    /// natively. No session state was touched.
    Native,
    /// The alternate engine handled the operation; the payload is the
    /// engine's raw result code.
    Alternate(i32),
}

impl Verdict {
    /// Whether the alternate engine handled the operation.
    pub fn used_alternate(self) -> bool {
        matches!(self, Verdict::Alternate(_))
    }

    /// The result code the host stack should surface.
    pub fn code(self) -> i32 {
        match self {
            Verdict::Native => 1,
            Verdict::Alternate(code) => code,
        }
    }
}

/// The interception core bridging a host TLS stack to the alternate engine.
pub struct Bridge {
    pub(crate) engine: Box<dyn GostEngine>,
    pub(crate) cache: HostCache,
    pub(crate) registry: Registry,
    pub(crate) config: BridgeConfig,
    pub(crate) metrics: BridgeMetrics,
}

impl Bridge {
    /// Initialize the bridge without persistence.
    ///
    /// Fails if the alternate engine cannot be probed or the host stack does
    /// not recognize the GOST cipher identifiers; callers treat that as
    /// "bridge unavailable" once, at startup.
    pub fn new(
        engine: Box<dyn GostEngine>,
        caps: &dyn HostCapabilities,
        config: BridgeConfig,
    ) -> Result<Self> {
        Self::build(engine, caps, config, HostCache::new())
    }

    /// Initialize the bridge with a persistent capability store.
    pub fn with_store(
        engine: Box<dyn GostEngine>,
        caps: &dyn HostCapabilities,
        config: BridgeConfig,
        store: Box<dyn StatusStore>,
    ) -> Result<Self> {
        Self::build(engine, caps, config, HostCache::with_store(store))
    }

    fn build(
        engine: Box<dyn GostEngine>,
        caps: &dyn HostCapabilities,
        config: BridgeConfig,
        cache: HostCache,
    ) -> Result<Self> {
        // probe-open one handle to confirm the engine is actually present
        drop(engine.open()?);

        for suite in [TLS_GOST_CIPHER_2001, TLS_GOST_CIPHER_2012] {
            if !caps.has_cipher(suite) {
                return Err(Error::MissingCipher(suite));
            }
        }

        Ok(Self {
            engine,
            cache,
            registry: Registry::new(),
            config,
            metrics: BridgeMetrics::new(),
        })
    }

    /// Register (or replace) the worker for a session, signaling intent to
    /// attempt the alternate path.
    ///
    /// Opens an engine handle, configures hostname/cache-tag/ALPN on it,
    /// resolves the host capability status for the computed cache key, and
    /// inserts the worker. A prior worker for the same identity is
    /// superseded and released.
    pub fn register(
        &self,
        id: SessionId,
        session: &dyn HostSession,
        discriminator: Option<&str>,
    ) -> Result<()> {
        let mut handle = self.engine.open()?;

        let hostname = session.hostname();
        if let Some(hostname) = hostname.as_deref() {
            handle.set_hostname(hostname);
        }
        if let Some(discriminator) = discriminator {
            handle.set_cache_tag(discriminator);
        }
        if let Some(offer) = session.alpn_offer() {
            if !offer.is_empty() {
                handle.set_alpn_offer(&offer);
            }
        }

        let key = cache_key(hostname.as_deref(), discriminator);
        let status = self.cache.get(&key);
        tracing::debug!(id, key = %key, ?status, "registering worker");

        let worker = Arc::new(Worker::new(handle, key, status));
        if let Some(old) = self.registry.insert(id, worker) {
            tracing::debug!(id, key = old.cache_key(), "superseded existing worker");
        }
        self.metrics.worker_created();
        Ok(())
    }

    /// Forward a read to the alternate engine, if this session is confirmed
    /// to use the alternate suite.
    pub fn read(&self, id: SessionId, session: &mut dyn HostSession, buf: &mut [u8]) -> Verdict {
        let Some(worker) = self.find_supported(id) else {
            return Verdict::Native;
        };

        let mut handle = worker.handle();
        let ret = handle.read(buf);
        let state = handle.state();
        drop(handle);

        session.set_wait_state(map_wait_state(state));
        Verdict::Alternate(ret)
    }

    /// Forward a write to the alternate engine, if this session is confirmed
    /// to use the alternate suite.
    pub fn write(&self, id: SessionId, session: &mut dyn HostSession, buf: &[u8]) -> Verdict {
        let Some(worker) = self.find_supported(id) else {
            return Verdict::Native;
        };

        let mut handle = worker.handle();
        let ret = handle.write(buf);
        let state = handle.state();
        drop(handle);

        session.set_wait_state(map_wait_state(state));
        Verdict::Alternate(ret)
    }

    /// Release the worker for a session. Idempotent.
    ///
    /// A worker torn down while its host is mid-probe advances the probing
    /// slot, wrapping to `Unknown` at the window's end so the host is
    /// re-evaluated instead of blacklisted.
    pub fn free(&self, id: SessionId) {
        let Some(worker) = self.registry.remove(id) else {
            return;
        };

        let status = worker.status();
        if status.is_probing() {
            let next = status.advance_probe();
            tracing::debug!(id, key = worker.cache_key(), ?status, ?next, "probe advanced");
            self.cache.set(worker.cache_key(), next);
        }
        self.metrics.worker_released();
    }

    /// Check whether the host's own handshake just negotiated a GOST suite,
    /// which only the alternate engine can run.
    ///
    /// When it did, raises the host's protocol-error marker and moves the
    /// host into the probing cycle so the retry goes through the engine.
    pub fn alternate_suite_required(&self, id: SessionId, session: &mut dyn HostSession) -> bool {
        let Some(worker) = self.registry.find(id) else {
            return false;
        };

        let required = matches!(
            session.negotiated_suite(),
            Some(TLS_GOST_CIPHER_2001 | TLS_GOST_CIPHER_2012)
        );
        if required {
            tracing::debug!(id, key = worker.cache_key(), "alternate suite required, probing");
            session.raise_alternate_required();
            self.cache.set(worker.cache_key(), HostStatus::Probing(0));
            self.metrics.probe_started();
        }
        required
    }

    /// Map the engine's verification outcome for a bridged session.
    ///
    /// Returns 0 for sessions not on the alternate path (the host verifies
    /// natively), [`VERIFY_TRUSTED`] on success, [`CRITICAL_TRUST_ERROR`]
    /// for an outright failure, and the raw engine code otherwise.
    pub fn verify_result(&self, id: SessionId) -> u32 {
        let Some(worker) = self.find_supported(id) else {
            return 0;
        };

        let outcome = worker.handle().verify_peer();
        match outcome {
            VerifyOutcome::Trusted => VERIFY_TRUSTED,
            VerifyOutcome::Untrusted => CRITICAL_TRUST_ERROR,
            VerifyOutcome::Other(code) => code,
        }
    }

    /// Pin a just-selected client certificate for consumption by the next
    /// certificate-selection step of this session.
    pub fn pin_client_cert(&self, id: SessionId, der: &[u8]) {
        match self.registry.find(id) {
            Some(worker) => worker.pin_client_cert(Bytes::copy_from_slice(der)),
            None => tracing::debug!(id, "dropped pinned certificate for unknown session"),
        }
    }

    /// Enumerate client certificates for the in-flight handshake.
    ///
    /// Returns `None` unless this session's handshake is currently flagged
    /// alternate-suite (the host then enumerates natively); otherwise the
    /// platform store filtered per the client-auth rules, possibly empty.
    pub fn client_cert_candidates(
        &self,
        id: SessionId,
        store: &dyn CertStore,
        now_unix: i64,
    ) -> Option<Vec<Bytes>> {
        let worker = self.registry.find(id)?;
        if !worker.alternate_handshake() {
            return None;
        }
        Some(certs::eligible_client_certs(store, now_unix))
    }

    /// Number of live workers.
    pub fn active_workers(&self) -> usize {
        self.registry.len()
    }

    /// The process-wide host capability cache.
    pub fn cache(&self) -> &HostCache {
        &self.cache
    }

    /// Bridge counters.
    pub fn metrics(&self) -> &BridgeMetrics {
        &self.metrics
    }

    /// Worker lookup requiring confirmed alternate-suite status; anything
    /// else is a native fallback.
    fn find_supported(&self, id: SessionId) -> Option<Arc<Worker>> {
        let worker = self
            .registry
            .find(id)
            .filter(|w| w.status() == HostStatus::Supported);
        if worker.is_none() {
            self.metrics.native_fallback();
        }
        worker
    }
}

/// Map engine pending-operation flags to the host's wait-state signaling.
pub(crate) fn map_wait_state(state: EngineState) -> WaitState {
    if state.contains(EngineState::ERROR) {
        WaitState::Idle
    } else if state.contains(EngineState::SENT_SHUTDOWN)
        && state.contains(EngineState::RECEIVED_SHUTDOWN)
    {
        WaitState::Idle
    } else if state.contains(EngineState::X509_LOOKUP) {
        WaitState::X509Lookup
    } else if state.contains(EngineState::WRITING) {
        if state.contains(EngineState::LAST_PROC_WRITE) {
            WaitState::Writing
        } else if state.contains(EngineState::READING) {
            WaitState::Reading
        } else {
            WaitState::Writing
        }
    } else if state.contains(EngineState::READING) {
        WaitState::Reading
    } else {
        WaitState::Idle
    }
}
