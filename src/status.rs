//! Host capability status and cache-key construction.
//!
//! Every remote endpoint has a process-wide trust status describing whether
//! the alternate engine is known to work against it. The status moves through
//! a bounded probing window after failures so a single transient error does
//! not blacklist a host forever.

#[cfg(feature = "persist")]
use serde::{Deserialize, Serialize};

/// Number of probing slots before a host is re-evaluated from scratch.
pub const PROBING_WINDOW: u8 = 16;

/// Placeholder used in cache keys when a component is absent.
const WILDCARD: &str = "*";

/// Capability status of a remote host with respect to the alternate engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "persist", derive(Serialize, Deserialize))]
pub enum HostStatus {
    /// Never probed
    Unknown,
    /// Alternate suite confirmed usable
    Supported,
    /// Alternate suite confirmed unusable
    Unsupported,
    /// Recovering from a failed negotiation; the slot index counts failed
    /// session teardowns since the probe began
    Probing(u8),
}

impl HostStatus {
    /// Terminal statuses are sticky: only another terminal status replaces them.
    pub fn is_terminal(self) -> bool {
        matches!(self, HostStatus::Supported | HostStatus::Unsupported)
    }

    /// Check if the status is inside the probing window.
    pub fn is_probing(self) -> bool {
        matches!(self, HostStatus::Probing(_))
    }

    /// Advance one probing slot on a failed session teardown.
    ///
    /// `Probing(n)` becomes `Probing(n + 1)`; the last slot wraps back to
    /// `Unknown` so the host gets a fresh evaluation. Non-probing statuses
    /// are returned unchanged.
    pub fn advance_probe(self) -> HostStatus {
        match self {
            HostStatus::Probing(n) if n >= PROBING_WINDOW - 1 => HostStatus::Unknown,
            HostStatus::Probing(n) => HostStatus::Probing(n + 1),
            other => other,
        }
    }

    /// Apply the sticky-state rule: a terminal `current` survives any
    /// non-terminal `next`, everything else is overwritten.
    pub fn merge(current: HostStatus, next: HostStatus) -> HostStatus {
        if current.is_terminal() && !next.is_terminal() {
            current
        } else {
            next
        }
    }
}

impl Default for HostStatus {
    fn default() -> Self {
        HostStatus::Unknown
    }
}

/// Build the capability-cache key for a host.
///
/// The key concatenates the requested hostname and an opaque caller-supplied
/// discriminator with `:`, substituting `*` for absent components. `:` is not
/// valid inside a hostname, so the key is unambiguous.
pub fn cache_key(hostname: Option<&str>, discriminator: Option<&str>) -> String {
    format!(
        "{}:{}",
        hostname.unwrap_or(WILDCARD),
        discriminator.unwrap_or(WILDCARD)
    )
}
