//! Shared test doubles: scripted engine, recording host session, and a
//! minimal DER certificate builder for classification tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::engine::{CipherInfo, EngineHandle, EngineState, GostEngine, VerifyOutcome, ENGINE_DONE};
use crate::error::{Error, Result};
use crate::session::{HostCapabilities, HostSession, TlsVersion, WaitState};

/// Scripted behavior and recorded calls for one engine handle, shared
/// between the test and the handle the bridge owns.
pub(crate) struct HandleScript {
    // scripted
    pub connect_results: Mutex<VecDeque<i32>>,
    pub state: Mutex<EngineState>,
    pub cipher: Mutex<Option<CipherInfo>>,
    pub alpn: Mutex<Option<String>>,
    pub peer_chain: Mutex<Vec<Bytes>>,
    pub issuers: Mutex<Option<Vec<Bytes>>>,
    pub verify: Mutex<VerifyOutcome>,
    pub read_result: Mutex<i32>,
    pub write_result: Mutex<i32>,
    pub accept_client_cert: Mutex<bool>,
    // recorded
    pub hostname: Mutex<Option<String>>,
    pub cache_tag: Mutex<Option<String>>,
    pub alpn_offer: Mutex<Option<Vec<u8>>>,
    pub client_cert: Mutex<Option<Vec<u8>>>,
    pub reads: Mutex<Vec<usize>>,
    pub writes: Mutex<Vec<Vec<u8>>>,
}

impl Default for HandleScript {
    fn default() -> Self {
        Self {
            connect_results: Mutex::new(VecDeque::new()),
            state: Mutex::new(EngineState::default()),
            cipher: Mutex::new(None),
            alpn: Mutex::new(None),
            peer_chain: Mutex::new(Vec::new()),
            issuers: Mutex::new(Some(Vec::new())),
            verify: Mutex::new(VerifyOutcome::Trusted),
            read_result: Mutex::new(0),
            write_result: Mutex::new(0),
            accept_client_cert: Mutex::new(true),
            hostname: Mutex::new(None),
            cache_tag: Mutex::new(None),
            alpn_offer: Mutex::new(None),
            client_cert: Mutex::new(None),
            reads: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
        }
    }
}

impl HandleScript {
    /// Script a handshake that completes immediately with the given
    /// identifiers and a one-certificate peer chain.
    pub fn successful_handshake(protocol: u32, suite: u16) -> Arc<Self> {
        let script = Arc::new(Self::default());
        *script.cipher.lock() = Some(CipherInfo { protocol, suite });
        *script.peer_chain.lock() = vec![Bytes::from_static(b"peer-cert-der")];
        script
    }
}

/// Engine handle driven by a shared [`HandleScript`].
pub(crate) struct MockHandle(pub Arc<HandleScript>);

impl Default for MockHandle {
    fn default() -> Self {
        Self(Arc::new(HandleScript::default()))
    }
}

impl EngineHandle for MockHandle {
    fn set_hostname(&mut self, hostname: &str) {
        *self.0.hostname.lock() = Some(hostname.to_owned());
    }

    fn set_cache_tag(&mut self, tag: &str) {
        *self.0.cache_tag.lock() = Some(tag.to_owned());
    }

    fn set_alpn_offer(&mut self, protocols: &[u8]) {
        *self.0.alpn_offer.lock() = Some(protocols.to_vec());
    }

    fn connect_step(&mut self) -> i32 {
        self.0.connect_results.lock().pop_front().unwrap_or(ENGINE_DONE)
    }

    fn read(&mut self, buf: &mut [u8]) -> i32 {
        self.0.reads.lock().push(buf.len());
        *self.0.read_result.lock()
    }

    fn write(&mut self, buf: &[u8]) -> i32 {
        self.0.writes.lock().push(buf.to_vec());
        *self.0.write_result.lock()
    }

    fn state(&self) -> EngineState {
        *self.0.state.lock()
    }

    fn cipher_info(&self) -> Option<CipherInfo> {
        *self.0.cipher.lock()
    }

    fn selected_alpn(&self) -> Option<String> {
        self.0.alpn.lock().clone()
    }

    fn peer_certs(&self) -> Vec<Bytes> {
        self.0.peer_chain.lock().clone()
    }

    fn issuer_names(&self) -> Option<Vec<Bytes>> {
        self.0.issuers.lock().clone()
    }

    fn verify_peer(&self) -> VerifyOutcome {
        *self.0.verify.lock()
    }

    fn set_client_cert(&mut self, der: &[u8]) -> bool {
        *self.0.client_cert.lock() = Some(der.to_vec());
        *self.0.accept_client_cert.lock()
    }
}

#[derive(Default)]
struct MockEngineInner {
    fail_open: Mutex<bool>,
    scripts: Mutex<VecDeque<Arc<HandleScript>>>,
    opened: AtomicUsize,
}

/// Cloneable engine factory; each clone shares the same script queue.
#[derive(Clone, Default)]
pub(crate) struct MockEngine(Arc<MockEngineInner>);

impl MockEngine {
    pub fn set_fail_open(&self, fail: bool) {
        *self.0.fail_open.lock() = fail;
    }

    /// Queue a script for the next opened handle.
    pub fn push_script(&self, script: Arc<HandleScript>) {
        self.0.scripts.lock().push_back(script);
    }

    pub fn opened(&self) -> usize {
        self.0.opened.load(Ordering::SeqCst)
    }
}

impl GostEngine for MockEngine {
    fn open(&self) -> Result<Box<dyn EngineHandle>> {
        if *self.0.fail_open.lock() {
            return Err(Error::engine("mock engine closed"));
        }
        self.0.opened.fetch_add(1, Ordering::SeqCst);
        let script = self
            .0
            .scripts
            .lock()
            .pop_front()
            .unwrap_or_else(|| Arc::new(HandleScript::default()));
        Ok(Box::new(MockHandle(script)))
    }
}

/// Host capability table with an optional hole.
pub(crate) struct MockCaps {
    pub missing: Option<u16>,
}

impl MockCaps {
    pub fn complete() -> Self {
        Self { missing: None }
    }
}

impl HostCapabilities for MockCaps {
    fn has_cipher(&self, suite: u16) -> bool {
        self.missing != Some(suite)
    }
}

/// Host session recording every mutation the bridge applies.
#[derive(Default)]
pub(crate) struct MockSession {
    // observed state
    pub hostname: Option<String>,
    pub alpn_offer: Option<Vec<u8>>,
    pub established: bool,
    pub negotiated_suite: Option<u16>,
    pub wants_client_cert: bool,
    pub select_result: i32,
    pub fail_install: Option<&'static str>,
    // recorded mutations
    pub wait_states: Vec<WaitState>,
    pub began_connect: bool,
    pub installed_alpn: Option<Vec<u8>>,
    pub installed_session: Option<(TlsVersion, u16)>,
    pub installed_chain: Option<Vec<Bytes>>,
    pub installed_issuers: Option<Vec<Bytes>>,
    pub marked_established: bool,
    pub notified_done: bool,
    pub raised_required: bool,
    pub select_calls: u32,
}

impl MockSession {
    pub fn with_hostname(hostname: &str) -> Self {
        Self {
            hostname: Some(hostname.to_owned()),
            select_result: 1,
            ..Self::default()
        }
    }

    /// True when the bridge touched the session in any way.
    pub fn mutated(&self) -> bool {
        !self.wait_states.is_empty()
            || self.began_connect
            || self.installed_alpn.is_some()
            || self.installed_session.is_some()
            || self.installed_chain.is_some()
            || self.installed_issuers.is_some()
            || self.marked_established
            || self.notified_done
            || self.raised_required
            || self.select_calls != 0
    }

    fn check_install(&self, what: &'static str) -> Result<()> {
        if self.fail_install == Some(what) {
            return Err(Error::synthesis(format!("host rejected {what}")));
        }
        Ok(())
    }
}

impl HostSession for MockSession {
    fn hostname(&self) -> Option<String> {
        self.hostname.clone()
    }

    fn alpn_offer(&self) -> Option<Vec<u8>> {
        self.alpn_offer.clone()
    }

    fn is_established(&self) -> bool {
        self.established
    }

    fn negotiated_suite(&self) -> Option<u16> {
        self.negotiated_suite
    }

    fn begin_connect(&mut self) {
        self.began_connect = true;
    }

    fn set_wait_state(&mut self, state: WaitState) {
        self.wait_states.push(state);
    }

    fn install_alpn(&mut self, protocol: &[u8]) -> Result<()> {
        self.check_install("alpn")?;
        self.installed_alpn = Some(protocol.to_vec());
        Ok(())
    }

    fn install_session(&mut self, version: TlsVersion, suite: u16) -> Result<()> {
        self.check_install("session")?;
        self.installed_session = Some((version, suite));
        Ok(())
    }

    fn install_peer_chain(&mut self, chain: &[Bytes]) -> Result<()> {
        self.check_install("chain")?;
        self.installed_chain = Some(chain.to_vec());
        Ok(())
    }

    fn mark_established(&mut self) {
        self.marked_established = true;
        self.established = true;
    }

    fn notify_handshake_done(&mut self) {
        self.notified_done = true;
    }

    fn raise_alternate_required(&mut self) {
        self.raised_required = true;
    }

    fn wants_client_cert(&self) -> bool {
        self.wants_client_cert
    }

    fn issuers_installed(&self) -> bool {
        self.installed_issuers.is_some()
    }

    fn install_issuers(&mut self, names: &[Bytes]) -> Result<()> {
        self.check_install("issuers")?;
        self.installed_issuers = Some(names.to_vec());
        Ok(())
    }

    fn select_client_cert(&mut self) -> i32 {
        self.select_calls += 1;
        self.select_result
    }
}

/// Minimal DER builder producing certificates that `x509-parser` accepts.
///
/// Only the fields the bridge inspects carry meaning: the outer signature
/// algorithm OID, the key-usage extension, and the validity window.
pub(crate) mod der {
    /// 1.2.643.2.2.3 (GOST R 34.11/34.10-2001)
    pub const OID_GOST_2001: &[u8] = &[0x2A, 0x85, 0x03, 0x02, 0x02, 0x03];
    /// 1.2.643.7.1.1.3.2 (GOST R 34.11-2012/256)
    pub const OID_GOST_2012_256: &[u8] = &[0x2A, 0x85, 0x03, 0x07, 0x01, 0x01, 0x03, 0x02];
    /// 1.2.840.113549.1.1.11 (sha256WithRSAEncryption)
    pub const OID_SHA256_RSA: &[u8] = &[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01, 0x0B];

    /// keyUsage bit 0 (digitalSignature) in the first content byte.
    pub const DIGITAL_SIGNATURE: u8 = 0x80;
    /// keyUsage bit 2 (keyEncipherment).
    pub const KEY_ENCIPHERMENT: u8 = 0x20;

    /// 2025-01-01T00:00:00Z, inside the default validity window.
    pub const VALID_AT: i64 = 1_735_689_600;

    fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        let len = content.len();
        if len < 128 {
            out.push(len as u8);
        } else if len < 256 {
            out.extend([0x81, len as u8]);
        } else {
            out.extend([0x82, (len >> 8) as u8, (len & 0xFF) as u8]);
        }
        out.extend_from_slice(content);
        out
    }

    fn algorithm(oid: &[u8]) -> Vec<u8> {
        tlv(0x30, &tlv(0x06, oid))
    }

    fn utc_time(s: &str) -> Vec<u8> {
        tlv(0x17, s.as_bytes())
    }

    fn validity(not_before: &str, not_after: &str) -> Vec<u8> {
        let mut content = utc_time(not_before);
        content.extend(utc_time(not_after));
        tlv(0x30, &content)
    }

    fn key_usage_extension(bits: u8) -> Vec<u8> {
        let usage_bitstring = tlv(0x03, &[0x00, bits]);
        let mut ext = tlv(0x06, &[0x55, 0x1D, 0x0F]); // 2.5.29.15
        ext.extend(tlv(0x04, &usage_bitstring));
        tlv(0x30, &ext)
    }

    fn build(sig_oid: &[u8], window: (&str, &str), key_usage: Option<u8>) -> Vec<u8> {
        let empty_name = tlv(0x30, &[]);
        let spki = {
            let mut content = algorithm(&[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01, 0x01]);
            content.extend(tlv(0x03, &[0x00, 0x00]));
            tlv(0x30, &content)
        };

        let mut tbs = tlv(0xA0, &tlv(0x02, &[0x02])); // version v3
        tbs.extend(tlv(0x02, &[0x01])); // serial 1
        tbs.extend(algorithm(sig_oid));
        tbs.extend(&empty_name); // issuer
        tbs.extend(validity(window.0, window.1));
        tbs.extend(&empty_name); // subject
        tbs.extend(spki);
        if let Some(bits) = key_usage {
            tbs.extend(tlv(0xA3, &tlv(0x30, &key_usage_extension(bits))));
        }

        let mut cert = tlv(0x30, &tbs);
        cert.extend(algorithm(sig_oid));
        cert.extend(tlv(0x03, &[0x00, 0x00])); // signature placeholder
        tlv(0x30, &cert)
    }

    /// Certificate valid 2020-2040 with the given signature OID.
    pub fn certificate(sig_oid: &[u8], key_usage: Option<u8>) -> Vec<u8> {
        build(sig_oid, ("200101000000Z", "400101000000Z"), key_usage)
    }

    /// Signing certificate whose validity ended in 2016.
    pub fn certificate_expired(sig_oid: &[u8]) -> Vec<u8> {
        build(
            sig_oid,
            ("150101000000Z", "160101000000Z"),
            Some(DIGITAL_SIGNATURE),
        )
    }
}
