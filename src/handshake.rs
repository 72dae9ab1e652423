//! Handshake emulation.
//!
//! The alternate engine performs the real protocol run; the host stack only
//! ever sees the outcome. After the engine reports completion, the session is
//! synthesized: negotiated ALPN, version, cipher suite and peer chain are
//! installed through [`HostSession`] so the connection is indistinguishable
//! from a natively negotiated one. All attributes are gathered before the
//! first install so a failed gather leaves the session untouched.

use crate::bridge::{map_wait_state, Bridge, Verdict};
use crate::certs;
use crate::engine::{EngineState, ENGINE_DONE};
use crate::error::{Error, Result};
use crate::session::{HostSession, SessionId, TlsVersion, WaitState};
use crate::status::HostStatus;
use crate::worker::Worker;

/// Outcome of one certificate-selection round.
enum CertSelect {
    /// A certificate was installed (or none is needed); resume the handshake.
    Continue,
    /// The host callback wants to be asked again later.
    Retry,
    /// The host callback refused to provide a certificate.
    Declined,
}

impl Bridge {
    /// Drive the alternate handshake for a session.
    ///
    /// Returns [`Verdict::Native`] while the host's capability status is
    /// `Unknown` or `Unsupported`; the host stack then negotiates natively
    /// and [`Bridge::alternate_suite_required`] decides whether to probe.
    /// Otherwise the engine is stepped until it completes, blocks or fails,
    /// and the result is reported in the host's return-code convention.
    pub fn connect(&self, id: SessionId, session: &mut dyn HostSession) -> Verdict {
        let Some(worker) = self.registry.find(id) else {
            self.metrics.native_fallback();
            return Verdict::Native;
        };
        if matches!(
            worker.status(),
            HostStatus::Unknown | HostStatus::Unsupported
        ) {
            self.metrics.native_fallback();
            return Verdict::Native;
        }

        session.begin_connect();

        let mut selection_done = false;
        loop {
            let ret = worker.handle().connect_step();
            if ret == ENGINE_DONE {
                return match self.synthesize(&worker, session) {
                    Ok(()) => {
                        self.metrics.handshake_completed();
                        Verdict::Alternate(1)
                    }
                    Err(err) => {
                        tracing::warn!(id, key = worker.cache_key(), %err, "synthesis failed");
                        self.metrics.handshake_failed();
                        worker.set_alternate_handshake(false);
                        session.set_wait_state(WaitState::Idle);
                        Verdict::Alternate(0)
                    }
                };
            }

            let state = worker.handle().state();
            if state.contains(EngineState::X509_LOOKUP) && !selection_done {
                selection_done = true;
                match self.run_cert_selection(&worker, session) {
                    Ok(CertSelect::Continue) => continue,
                    Ok(CertSelect::Retry) => {
                        // flag stays raised so enumeration during the host's
                        // asynchronous selection still sees this handshake
                        session.set_wait_state(WaitState::X509Lookup);
                        return Verdict::Alternate(ret);
                    }
                    Ok(CertSelect::Declined) => {
                        tracing::debug!(id, key = worker.cache_key(), "client cert declined");
                        self.metrics.handshake_failed();
                        worker.set_alternate_handshake(false);
                        session.set_wait_state(WaitState::Idle);
                        return Verdict::Alternate(0);
                    }
                    Err(err) => {
                        tracing::warn!(id, key = worker.cache_key(), %err, "cert selection failed");
                        self.metrics.handshake_failed();
                        worker.set_alternate_handshake(false);
                        session.set_wait_state(WaitState::Idle);
                        return Verdict::Alternate(0);
                    }
                }
            }

            if state.contains(EngineState::ERROR) {
                tracing::debug!(id, key = worker.cache_key(), code = ret, "handshake step failed");
                self.metrics.handshake_failed();
            }
            session.set_wait_state(map_wait_state(state));
            return Verdict::Alternate(ret);
        }
    }

    /// Make the host session look natively negotiated.
    ///
    /// Gather-then-commit: every attribute is read from the engine first and
    /// validated, and only then written into the session, so an abort cannot
    /// leave a half-synthesized session behind. A session that is already
    /// established is left as is; the engine completing a renegotiation must
    /// not re-allocate host state.
    fn synthesize(&self, worker: &Worker, session: &mut dyn HostSession) -> Result<()> {
        if session.is_established() {
            // renegotiation completion: no re-allocation, but the host state
            // machine still lands terminal
            session.mark_established();
            session.set_wait_state(WaitState::Idle);
            return Ok(());
        }

        let (alpn, cipher, chain) = {
            let handle = worker.handle();
            (handle.selected_alpn(), handle.cipher_info(), handle.peer_certs())
        };

        let cipher = cipher.ok_or_else(|| Error::synthesis("engine reported no cipher"))?;
        if chain.is_empty() {
            return Err(Error::EmptyPeerChain);
        }
        let alpn = alpn.unwrap_or_else(|| self.config.default_alpn.clone());
        let version = TlsVersion::from_engine_protocol(cipher.protocol);

        session.set_wait_state(WaitState::Idle);
        session.install_alpn(alpn.as_bytes())?;
        session.install_session(version, cipher.suite)?;
        session.install_peer_chain(&chain)?;
        session.notify_handshake_done();
        session.mark_established();

        worker.set_alternate_handshake(false);
        worker.set_status(HostStatus::Supported);
        self.cache.set(worker.cache_key(), HostStatus::Supported);
        tracing::debug!(
            key = worker.cache_key(),
            suite = format_args!("0x{:04x}", cipher.suite),
            ?version,
            %alpn,
            "session synthesized"
        );
        Ok(())
    }

    /// Run one certificate-selection round while the engine waits on a
    /// client-certificate decision.
    ///
    /// Populates the peer-issuer list once, flags the handshake so the
    /// host's enumeration hook answers with engine-capable certificates,
    /// then defers to the host's selection callback. A certificate pinned
    /// through [`Bridge::pin_client_cert`] is handed to the engine and the
    /// pin cleared regardless of the callback's verdict.
    fn run_cert_selection(
        &self,
        worker: &Worker,
        session: &mut dyn HostSession,
    ) -> Result<CertSelect> {
        if !session.issuers_installed() {
            let names = certs::issuer_names_checked(worker.handle().issuer_names())?;
            session.install_issuers(&names)?;
        }

        if !session.wants_client_cert() {
            return Ok(CertSelect::Continue);
        }

        worker.set_alternate_handshake(true);
        let decision = session.select_client_cert();

        // a pinned certificate wins over the callback's verdict: it is
        // handed to the engine and the pin cleared even on a decline
        if let Some(der) = worker.take_pinned_cert() {
            worker.set_alternate_handshake(false);
            if !worker.handle().set_client_cert(&der) {
                return Err(Error::Negotiation(0));
            }
            return Ok(CertSelect::Continue);
        }

        if decision < 0 {
            return Ok(CertSelect::Retry);
        }
        worker.set_alternate_handshake(false);
        if decision == 0 {
            return Ok(CertSelect::Declined);
        }
        Ok(CertSelect::Continue)
    }
}
