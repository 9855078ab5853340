//! Reserved event names and their payloads.
//!
//! | Event | Direction | Correlated | Purpose |
//! |-------|-----------|------------|---------|
//! | `keepalive` | Client → Server | yes | Liveness probe |
//! | `disconnect` | Client → Server | no | Best-effort shutdown notice |

// ============================================================================
// Imports
// ============================================================================

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ============================================================================
// Event Names
// ============================================================================

/// Liveness probe sent by the keepalive driver.
pub const KEEPALIVE: &str = "keepalive";

/// Notice sent once when the socket shuts down.
pub const DISCONNECT: &str = "disconnect";

// ============================================================================
// KeepalivePayload
// ============================================================================

/// Data carried by a [`KEEPALIVE`] request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeepalivePayload {
    /// Milliseconds since the UNIX epoch at the time of the probe.
    pub timestamp: u64,
}

impl KeepalivePayload {
    /// Creates a payload stamped with the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default();

        Self { timestamp }
    }
}

// ============================================================================
// Tests
// ============================================================================
