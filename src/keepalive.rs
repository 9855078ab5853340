//! Periodic liveness probe.
//!
//! The driver ticks once immediately and then on a fixed interval. Each
//! tick runs its probe as an independent task, so a probe that times out
//! never delays or stops later ticks.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, warn};

use crate::error::Result;

// ============================================================================
// KeepaliveDriver
// ============================================================================

/// Fixed-interval keepalive ticker.
#[derive(Debug, Clone, Copy)]
pub struct KeepaliveDriver {
    period: Duration,
}

impl KeepaliveDriver {
    /// Creates a driver ticking every `period`.
    #[inline]
    #[must_use]
    pub const fn new(period: Duration) -> Self {
        Self { period }
    }

    /// Returns the tick period.
    #[inline]
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Starts ticking.
    ///
    /// `probe` is called on every tick; returning `None` stops the driver
    /// (the owner is gone).
    pub fn spawn<F, Fut>(self, probe: F) -> JoinHandle<()>
    where
        F: Fn() -> Option<Fut> + Send + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            let mut tick: u64 = 0;

            loop {
                ticker.tick().await;
                tick += 1;

                let Some(probe) = probe() else {
                    debug!(tick, "Keepalive owner gone, stopping");
                    break;
                };

                tokio::spawn(async move {
                    match probe.await {
                        Ok(reply) => debug!(tick, %reply, "Keepalive acknowledged"),
                        Err(e) => warn!(tick, error = %e, "Keepalive failed"),
                    }
                });
            }
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
