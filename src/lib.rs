//! # gostlink
//!
//! A bridging layer that lets a TLS host stack transparently hand sessions
//! to an OS-supplied GOST cryptography engine when the remote endpoint only
//! speaks the national cipher suites.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   Host TLS Stack                         │
//! ├─────────────────────────────────────────────────────────┤
//! │  Bridge Facade (register, connect, read/write, hooks)   │
//! ├─────────────────────────────────────────────────────────┤
//! │  Worker Registry + Host Capability Cache (probing FSM)  │
//! ├─────────────────────────────────────────────────────────┤
//! │  Handshake Synthesis (ALPN, version, suite, peer chain) │
//! ├─────────────────────────────────────────────────────────┤
//! │  Alternate GOST Engine (handshake + record protection)  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Goals
//!
//! 1. **Transparency**: a bridged session is indistinguishable from one the
//!    host negotiated itself
//! 2. **Containment**: hosts that never needed the alternate engine are
//!    untouched; one failed probe never blacklists a host
//! 3. **Isolation**: all engine and platform dependencies sit behind traits,
//!    so the core is testable without either

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod bridge;
pub mod cache;
pub mod certs;
pub mod engine;
pub mod error;
pub mod handshake;
pub mod metrics;
pub mod registry;
pub mod session;
pub mod status;
pub mod worker;

#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(test)]
pub(crate) mod testutil;

pub use bridge::{Bridge, Verdict, CRITICAL_TRUST_ERROR, VERIFY_TRUSTED};
pub use cache::HostCache;
pub use error::{Error, Result};
pub use session::SessionId;
pub use status::{HostStatus, PROBING_WINDOW};

/// GOST R 34.10-2001 TLS cipher suite identifier.
pub const TLS_GOST_CIPHER_2001: u16 = 0x0081;

/// GOST R 34.10-2012 TLS cipher suite identifier.
pub const TLS_GOST_CIPHER_2012: u16 = 0xFF85;

/// Application protocol assumed when the engine negotiated none.
pub const DEFAULT_ALPN: &str = "http/1.1";

/// Configuration for the bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Application protocol recorded on synthesized sessions when the engine
    /// reports no ALPN result
    pub default_alpn: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            default_alpn: DEFAULT_ALPN.to_owned(),
        }
    }
}
