//! Error types for the gostlink bridge.

use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while bridging a session to the alternate engine.
#[derive(Error, Debug)]
pub enum Error {
    /// The alternate engine could not be opened or probed
    #[error("alternate engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The host stack does not recognize a required GOST cipher identifier
    #[error("cipher suite 0x{0:04x} not recognized by the host stack")]
    MissingCipher(u16),

    /// The engine reported a hard negotiation failure
    #[error("engine negotiation failed with code {0}")]
    Negotiation(i32),

    /// The host session rejected a synthesized attribute
    #[error("session synthesis failed: {0}")]
    Synthesis(String),

    /// The engine enumerated zero peer certificates after a completed handshake
    #[error("peer presented no certificates")]
    EmptyPeerChain,

    /// The engine could not produce the issuer-name list for cert selection
    #[error("issuer list unavailable from the engine")]
    IssuerList,

    /// The platform certificate store failed
    #[error("certificate store error: {0}")]
    CertStore(String),

    /// The persistent capability store failed
    #[error("status store error: {0}")]
    StatusStore(String),
}

impl Error {
    /// Create a new engine-unavailable error
    pub fn engine(msg: impl Into<String>) -> Self {
        Error::EngineUnavailable(msg.into())
    }

    /// Create a new synthesis error
    pub fn synthesis(msg: impl Into<String>) -> Self {
        Error::Synthesis(msg.into())
    }

    /// Create a new certificate-store error
    pub fn cert_store(msg: impl Into<String>) -> Self {
        Error::CertStore(msg.into())
    }

    /// Create a new status-store error
    pub fn status_store(msg: impl Into<String>) -> Self {
        Error::StatusStore(msg.into())
    }

    /// Check if this error is fatal for the whole bridge (vs. one session)
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::EngineUnavailable(_) | Error::MissingCipher(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MissingCipher(0xFF85);
        assert_eq!(
            err.to_string(),
            "cipher suite 0xff85 not recognized by the host stack"
        );

        let err = Error::Negotiation(-3);
        assert_eq!(err.to_string(), "engine negotiation failed with code -3");
    }

    #[test]
    fn test_error_fatality() {
        assert!(Error::engine("no provider").is_fatal());
        assert!(Error::MissingCipher(0x0081).is_fatal());
        assert!(!Error::EmptyPeerChain.is_fatal());
        assert!(!Error::Negotiation(0).is_fatal());
    }
}
