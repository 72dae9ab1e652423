//! Alternate-engine interface.
//!
//! The OS-supplied GOST engine performs the actual handshake protocol and
//! record cryptography; this module only defines the seam the bridge drives
//! it through. One [`GostEngine`] factory exists per process, one
//! [`EngineHandle`] per bridged session.

use bytes::Bytes;

use crate::error::Result;

/// Return code from [`EngineHandle::connect_step`], [`EngineHandle::read`]
/// and [`EngineHandle::write`] meaning the operation completed.
pub const ENGINE_DONE: i32 = 1;

/// Factory for per-session engine handles.
pub trait GostEngine: Send + Sync {
    /// Open a fresh handle, or fail if the engine is unavailable.
    fn open(&self) -> Result<Box<dyn EngineHandle>>;
}

/// One session's view of the alternate engine.
///
/// Handles own their transport underneath; the bridge never sees engine I/O.
/// Dropping the handle releases the engine-side session exactly once.
pub trait EngineHandle: Send {
    /// Set the SNI-equivalent target hostname before the handshake.
    fn set_hostname(&mut self, hostname: &str);

    /// Set the opaque session-cache tag before the handshake.
    fn set_cache_tag(&mut self, tag: &str);

    /// Offer application protocols, in TLS ALPN wire format.
    fn set_alpn_offer(&mut self, protocols: &[u8]);

    /// Drive one handshake step.
    ///
    /// Returns [`ENGINE_DONE`] on completion; any other value means pending
    /// or failed, disambiguated through [`state`](Self::state).
    fn connect_step(&mut self) -> i32;

    /// Read decrypted application data into `buf`.
    ///
    /// Returns the byte count, or a non-positive engine code to be
    /// interpreted through [`state`](Self::state).
    fn read(&mut self, buf: &mut [u8]) -> i32;

    /// Encrypt and send application data from `buf`. Same return convention
    /// as [`read`](Self::read). The buffer is neither retained nor freed.
    fn write(&mut self, buf: &[u8]) -> i32;

    /// Pending-operation flags after the most recent step.
    fn state(&self) -> EngineState;

    /// Negotiated protocol/cipher identifiers, available once the handshake
    /// completed.
    fn cipher_info(&self) -> Option<CipherInfo>;

    /// Application protocol selected by the peer, if any.
    fn selected_alpn(&self) -> Option<String>;

    /// Peer certificate chain, leaf first, DER-encoded.
    fn peer_certs(&self) -> Vec<Bytes>;

    /// DER-encoded issuer names the peer will accept client certificates
    /// from. `None` when the list cannot be produced.
    fn issuer_names(&self) -> Option<Vec<Bytes>>;

    /// The engine's own verification verdict for the peer chain.
    fn verify_peer(&self) -> VerifyOutcome;

    /// Register a client certificate for presentation. Returns false if the
    /// engine rejected it.
    fn set_client_cert(&mut self, der: &[u8]) -> bool;
}

/// Pending-operation flags reported by the engine after each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineState(u32);

impl EngineState {
    /// Hard error; no further progress possible.
    pub const ERROR: u32 = 1 << 0;
    /// The engine wants to read from its transport.
    pub const READING: u32 = 1 << 1;
    /// The engine wants to write to its transport.
    pub const WRITING: u32 = 1 << 2;
    /// The engine is waiting for a client certificate decision.
    pub const X509_LOOKUP: u32 = 1 << 3;
    /// Our close-notify went out.
    pub const SENT_SHUTDOWN: u32 = 1 << 4;
    /// The peer's close-notify arrived.
    pub const RECEIVED_SHUTDOWN: u32 = 1 << 5;
    /// The most recent engine operation was a write.
    pub const LAST_PROC_WRITE: u32 = 1 << 6;

    /// Wrap raw flag bits.
    pub fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Check a flag.
    pub fn contains(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    /// Raw flag bits.
    pub fn bits(self) -> u32 {
        self.0
    }
}

/// Negotiated identifiers reported by the engine after its handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherInfo {
    /// Engine-native protocol identifier (mapped to a TLS version bucket by
    /// the bridge)
    pub protocol: u32,
    /// Numeric TLS cipher-suite identifier
    pub suite: u16,
}

/// Outcome of the engine's peer-chain verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Chain verified successfully
    Trusted,
    /// Chain failed verification outright
    Untrusted,
    /// Any other engine-specific condition, passed through raw
    Other(u32),
}
