//! Per-call choice between the persistent and fallback transports.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::fallback::RequestResponseTransport;
use super::persistent::{ConnectionState, PersistentTransport};

// ============================================================================
// Transport
// ============================================================================

/// Capability shared by both transports.
pub trait Transport: Send + Sync {
    /// Which transport this is.
    fn kind(&self) -> TransportKind;

    /// Hands a serialized request frame to the transport.
    ///
    /// Returns `false` if the transport cannot take it right now; the
    /// caller must then use another transport.
    fn try_send(&self, payload: &str) -> bool;
}

/// Transport that carried a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Persistent WebSocket connection.
    Persistent,
    /// One-shot HTTP request.
    RequestResponse,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Persistent => "persistent",
            Self::RequestResponse => "request-response",
        };
        f.write_str(name)
    }
}

// ============================================================================
// TransportSelector
// ============================================================================

/// Routes each outbound frame by the persistent connection's state.
pub struct TransportSelector {
    persistent: Arc<PersistentTransport>,
    fallback: RequestResponseTransport,
}

impl TransportSelector {
    /// Creates a selector over the two transports.
    #[must_use]
    pub fn new(persistent: Arc<PersistentTransport>, fallback: RequestResponseTransport) -> Self {
        Self {
            persistent,
            fallback,
        }
    }

    /// Returns the persistent transport.
    #[inline]
    #[must_use]
    pub fn persistent(&self) -> &Arc<PersistentTransport> {
        &self.persistent
    }

    /// Returns the fallback transport.
    #[inline]
    #[must_use]
    pub fn fallback(&self) -> &RequestResponseTransport {
        &self.fallback
    }

    /// Sends `payload` over exactly one transport.
    ///
    /// The persistent connection is used when it is open and accepts the
    /// frame; otherwise exactly one fallback call is issued.
    pub fn route(&self, payload: &str) -> TransportKind {
        let state = self.persistent.state();
        if state == ConnectionState::Open && self.persistent.try_send(payload) {
            return self.persistent.kind();
        }

        trace!(%state, "Persistent connection unavailable, using fallback");
        self.fallback.try_send(payload);
        self.fallback.kind()
    }
}

// ============================================================================
// Tests
// ============================================================================
