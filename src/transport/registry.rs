//! Correlation registry for outstanding requests.
//!
//! Maps each outstanding [`EchoId`] to the channel that completes the
//! caller's [`PendingReply`] and to the timer task that expires it.
//!
//! # Terminal Outcomes
//!
//! An entry is completed by whichever party removes it from the map first:
//!
//! - [`CorrelationRegistry::resolve`] on a matching reply
//! - the entry's timer, after the request timeout
//! - [`CorrelationRegistry::fail_all`] on shutdown
//!
//! Removal happens under a single mutex, so each entry sees exactly one
//! outcome. After `fail_all` the registry is closed and refuses new
//! entries under the same mutex, so no request can slip in behind it.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::EchoId;

// ============================================================================
// Types
// ============================================================================

/// Map of echo ids to their pending entries.
type CorrelationMap = FxHashMap<EchoId, PendingRequest>;

/// One outstanding request.
struct PendingRequest {
    /// Completes the caller's [`PendingReply`].
    reply_tx: oneshot::Sender<Result<Value>>,
    /// Expiry timer; aborted on resolution.
    timer: JoinHandle<()>,
}

// ============================================================================
// PendingReply
// ============================================================================

/// Future returned by [`CorrelationRegistry::register`].
///
/// Resolves with the reply data, [`Error::RequestTimeout`] when the timer
/// fires, or [`Error::ConnectionClosed`] if the registry is torn down.
#[derive(Debug)]
pub struct PendingReply {
    echo_id: EchoId,
    reply_rx: oneshot::Receiver<Result<Value>>,
}

impl PendingReply {
    /// Returns the echo id this reply is waiting for.
    #[inline]
    #[must_use]
    pub fn echo_id(&self) -> &EchoId {
        &self.echo_id
    }
}

impl Future for PendingReply {
    type Output = Result<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.reply_rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(Error::ConnectionClosed)))
    }
}

// ============================================================================
// CorrelationRegistry
// ============================================================================

/// Registry of outstanding requests keyed by echo id.
///
/// Must be used from within a Tokio runtime; each registration spawns a
/// timer task.
pub struct CorrelationRegistry {
    /// Pending entries (shared weakly with timer tasks).
    entries: Arc<Mutex<CorrelationMap>>,
    /// Lifetime of an entry without a reply.
    timeout: Duration,
    /// Set by `fail_all` while holding the `entries` lock.
    closed: AtomicBool,
}

impl CorrelationRegistry {
    /// Creates an empty registry with the given request timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(CorrelationMap::default())),
            timeout,
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the request timeout.
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Registers `echo_id` and starts its expiry timer.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] once [`fail_all`](Self::fail_all) has run
    /// - [`Error::Protocol`] if `echo_id` is already registered; the existing
    ///   entry is left untouched
    pub fn register(&self, echo_id: EchoId) -> Result<PendingReply> {
        let mut entries = self.entries.lock();

        if self.closed.load(Ordering::Acquire) {
            return Err(Error::ConnectionClosed);
        }

        if entries.contains_key(&echo_id) {
            warn!(%echo_id, "Echo id already registered");
            return Err(Error::protocol(format!(
                "Echo id {echo_id} is already awaiting a reply"
            )));
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        let timer = tokio::spawn(Self::expire(
            Arc::downgrade(&self.entries),
            echo_id.clone(),
            self.timeout,
        ));

        entries.insert(echo_id.clone(), PendingRequest { reply_tx, timer });
        trace!(%echo_id, pending = entries.len(), "Request registered");

        Ok(PendingReply { echo_id, reply_rx })
    }

    /// Completes the entry for `echo_id` with `data`.
    ///
    /// Returns `false` with no effect if `echo_id` is not registered
    /// (late, duplicate, or unknown reply).
    pub fn resolve(&self, echo_id: &EchoId, data: Value) -> bool {
        let Some(pending) = self.entries.lock().remove(echo_id) else {
            trace!(%echo_id, "Reply for unknown request dropped");
            return false;
        };

        pending.timer.abort();
        let _ = pending.reply_tx.send(Ok(data));

        trace!(%echo_id, "Request resolved");
        true
    }

    /// Rejects every pending entry with [`Error::ConnectionClosed`] and
    /// closes the registry to new entries.
    pub fn fail_all(&self) {
        let pending: Vec<_> = {
            let mut entries = self.entries.lock();
            self.closed.store(true, Ordering::Release);
            entries.drain().collect()
        };
        let count = pending.len();

        for (_, entry) in pending {
            entry.timer.abort();
            let _ = entry.reply_tx.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending requests on shutdown");
        }
    }

    /// Returns `true` if `echo_id` is awaiting a reply.
    #[inline]
    #[must_use]
    pub fn contains(&self, echo_id: &EchoId) -> bool {
        self.entries.lock().contains_key(echo_id)
    }

    /// Returns the number of pending requests.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if no request is pending.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Timer task body: removes and rejects the entry after `timeout`.
    async fn expire(entries: Weak<Mutex<CorrelationMap>>, echo_id: EchoId, timeout: Duration) {
        sleep(timeout).await;

        let Some(entries) = entries.upgrade() else {
            return;
        };

        let pending = entries.lock().remove(&echo_id);

        if let Some(pending) = pending {
            let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            debug!(%echo_id, timeout_ms, "Request timed out");
            let _ = pending
                .reply_tx
                .send(Err(Error::request_timeout(echo_id, timeout_ms)));
        }
    }
}

impl Drop for CorrelationRegistry {
    fn drop(&mut self) {
        for (_, entry) in self.entries.lock().drain() {
            entry.timer.abort();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
