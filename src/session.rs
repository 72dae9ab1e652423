//! Host-stack seams.
//!
//! The bridge never touches the host TLS implementation's internals directly.
//! Everything it needs to observe or synthesize goes through the narrow
//! [`HostSession`] mutation interface, implemented by an adapter around the
//! real host engine.

use bytes::Bytes;

use crate::error::Result;

/// Opaque per-session identity assigned by the host stack.
pub type SessionId = u64;

/// Read/write-wait signaling understood by the host state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitState {
    /// No pending transport operation
    #[default]
    Idle,
    /// Waiting for transport readability
    Reading,
    /// Waiting for transport writability
    Writing,
    /// Waiting for a client-certificate decision
    X509Lookup,
}

/// TLS protocol version buckets the host stack understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsVersion {
    /// SSL 3.0 — the catch-all bucket for unrecognized engine protocols
    Ssl3,
    /// TLS 1.0
    Tls10,
    /// TLS 1.1
    Tls11,
    /// TLS 1.2
    Tls12,
}

impl TlsVersion {
    /// Map an engine-native protocol identifier to a version bucket.
    ///
    /// The engine reports either the TLS wire version or its own
    /// per-direction protocol bits; both spellings land in the same bucket.
    /// Anything unrecognized falls back to the SSL3 bucket.
    pub fn from_engine_protocol(protocol: u32) -> Self {
        match protocol {
            0x0301 | 0x0040 | 0x0080 => TlsVersion::Tls10,
            0x0302 | 0x0100 | 0x0200 => TlsVersion::Tls11,
            0x0303 | 0x0400 | 0x0800 => TlsVersion::Tls12,
            _ => TlsVersion::Ssl3,
        }
    }

    /// The TLS wire identifier for this bucket.
    pub fn wire_id(self) -> u16 {
        match self {
            TlsVersion::Ssl3 => 0x0300,
            TlsVersion::Tls10 => 0x0301,
            TlsVersion::Tls11 => 0x0302,
            TlsVersion::Tls12 => 0x0303,
        }
    }
}

/// Host-stack capability lookups needed once at bridge initialization.
pub trait HostCapabilities {
    /// Check whether the host stack has a cipher object for a numeric
    /// cipher-suite identifier.
    fn has_cipher(&self, suite: u16) -> bool;
}

/// Narrow mutation interface onto one host session.
///
/// The synthesis step after a successful engine handshake uses this to make
/// the session indistinguishable from a natively negotiated one. Install
/// methods return an error when the host rejects the value (unknown cipher
/// id, allocation failure); the bridge then aborts the step without leaving
/// partial state marked established.
pub trait HostSession {
    /// Hostname requested by the application (SNI), if any.
    fn hostname(&self) -> Option<String>;

    /// The application's ALPN offer in TLS wire format, if any.
    fn alpn_offer(&self) -> Option<Vec<u8>>;

    /// Whether a session is already fully established for this connection.
    fn is_established(&self) -> bool;

    /// Cipher-suite identifier the host's own handshake negotiated so far,
    /// if any.
    fn negotiated_suite(&self) -> Option<u16>;

    /// Nudge the host state machine from its initial state into connecting.
    fn begin_connect(&mut self);

    /// Signal what the session is waiting on.
    fn set_wait_state(&mut self, state: WaitState);

    /// Record the negotiated application protocol.
    fn install_alpn(&mut self, protocol: &[u8]) -> Result<()>;

    /// Allocate a fresh session object carrying the negotiated version and
    /// cipher suite, including the write-context tagging for that cipher.
    fn install_session(&mut self, version: TlsVersion, suite: u16) -> Result<()>;

    /// Copy the peer certificate chain into the host's representation.
    fn install_peer_chain(&mut self, chain: &[Bytes]) -> Result<()>;

    /// Mark the handshake terminal/complete in the host state machine.
    fn mark_established(&mut self);

    /// Fire the host's handshake-completion callback, if one is registered
    /// (session-level callback takes precedence over context-level).
    fn notify_handshake_done(&mut self);

    /// Raise the host's "GOST suite required" protocol error marker.
    fn raise_alternate_required(&mut self);

    /// Whether the host has a certificate-selection callback configured.
    fn wants_client_cert(&self) -> bool;

    /// Whether the peer-issuer-name list is already populated.
    fn issuers_installed(&self) -> bool;

    /// Populate the peer-issuer-name list, once per session.
    fn install_issuers(&mut self, names: &[Bytes]) -> Result<()>;

    /// Invoke the host's certificate-selection callback.
    ///
    /// Follows the host convention: positive to continue, zero to fail the
    /// handshake, negative to retry later.
    fn select_client_cert(&mut self) -> i32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_buckets() {
        // wire identifiers
        assert_eq!(TlsVersion::from_engine_protocol(0x0301), TlsVersion::Tls10);
        assert_eq!(TlsVersion::from_engine_protocol(0x0302), TlsVersion::Tls11);
        assert_eq!(TlsVersion::from_engine_protocol(0x0303), TlsVersion::Tls12);
        // per-direction engine bits
        assert_eq!(TlsVersion::from_engine_protocol(0x0040), TlsVersion::Tls10);
        assert_eq!(TlsVersion::from_engine_protocol(0x0080), TlsVersion::Tls10);
        assert_eq!(TlsVersion::from_engine_protocol(0x0100), TlsVersion::Tls11);
        assert_eq!(TlsVersion::from_engine_protocol(0x0200), TlsVersion::Tls11);
        assert_eq!(TlsVersion::from_engine_protocol(0x0400), TlsVersion::Tls12);
        assert_eq!(TlsVersion::from_engine_protocol(0x0800), TlsVersion::Tls12);
        // everything else is the SSL3 bucket
        assert_eq!(TlsVersion::from_engine_protocol(0), TlsVersion::Ssl3);
        assert_eq!(TlsVersion::from_engine_protocol(0x0304), TlsVersion::Ssl3);
        assert_eq!(
            TlsVersion::from_engine_protocol(0xDEAD_BEEF),
            TlsVersion::Ssl3
        );
    }

    #[test]
    fn test_wire_ids() {
        assert_eq!(TlsVersion::Ssl3.wire_id(), 0x0300);
        assert_eq!(TlsVersion::Tls10.wire_id(), 0x0301);
        assert_eq!(TlsVersion::Tls11.wire_id(), 0x0302);
        assert_eq!(TlsVersion::Tls12.wire_id(), 0x0303);
    }
}
