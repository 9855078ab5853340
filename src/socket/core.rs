//! Socket service object.
//!
//! A [`Socket`] owns every piece of the transport layer for one client:
//! the correlation registry, the dispatcher, both transports, the
//! connection supervisor, and the keepalive driver. It is cheap to clone;
//! clones share the same connection.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Value, to_value};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{ClientId, EchoId};
use crate::keepalive::KeepaliveDriver;
use crate::protocol::{DISCONNECT, KEEPALIVE, KeepalivePayload, ReplyFrame, RequestFrame};
use crate::transport::{
    ConnectionState, CorrelationRegistry, Dispatcher, PersistentTransport,
    RequestResponseTransport, Transport, TransportSelector,
};

use super::builder::SocketBuilder;
use super::options::{Endpoints, SocketOptions};

// ============================================================================
// Constants
// ============================================================================

/// Longest `shutdown` waits for the disconnect notice over HTTP.
const DISCONNECT_NOTICE_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// Socket
// ============================================================================

/// Client connection to one server endpoint.
///
/// # Example
///
/// ```no_run
/// use echo_socket::Socket;
/// use serde_json::json;
///
/// # async fn example() -> echo_socket::Result<()> {
/// let socket = Socket::builder()
///     .base_url("http://localhost:8080/api")
///     .build()?;
///
/// let reply = socket.send("echo", json!({ "x": 1 })).await?;
/// assert_eq!(reply, json!({ "x": 1 }));
///
/// socket.shutdown().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Socket {
    inner: Arc<SocketInner>,
}

/// Shared state behind every [`Socket`] clone.
struct SocketInner {
    client_id: ClientId,
    endpoints: Endpoints,
    options: SocketOptions,
    registry: Arc<CorrelationRegistry>,
    dispatcher: Arc<Dispatcher>,
    selector: TransportSelector,
    /// Claimed by the first `shutdown` call.
    closing: AtomicBool,
    /// Tells the supervisor to stop. Dropping it does the same.
    shutdown_tx: watch::Sender<bool>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    keepalive: Mutex<Option<JoinHandle<()>>>,
}

// ============================================================================
// Socket - Constructor
// ============================================================================

impl Socket {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> SocketBuilder {
        SocketBuilder::new()
    }

    /// Wires the components together and spawns the background tasks.
    pub(crate) fn start(
        client_id: ClientId,
        endpoints: Endpoints,
        options: SocketOptions,
    ) -> Result<Self> {
        Handle::try_current()
            .map_err(|_| Error::config("Socket must be started within a Tokio runtime"))?;

        let registry = Arc::new(CorrelationRegistry::new(options.request_timeout));
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&registry)));

        let persistent = Arc::new(PersistentTransport::new(
            endpoints.websocket.clone(),
            Arc::clone(&dispatcher),
            options.reconnect_delay,
        ));
        let fallback = RequestResponseTransport::new(
            endpoints.http.clone(),
            Arc::clone(&dispatcher),
            options.fallback_deadline,
        )?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let supervisor = persistent.spawn(shutdown_rx);

        let inner = Arc::new(SocketInner {
            client_id,
            endpoints,
            options,
            registry,
            dispatcher,
            selector: TransportSelector::new(persistent, fallback),
            closing: AtomicBool::new(false),
            shutdown_tx,
            supervisor: Mutex::new(Some(supervisor)),
            keepalive: Mutex::new(None),
        });

        if let Some(period) = options.keepalive_interval {
            let weak = Arc::downgrade(&inner);
            let driver = KeepaliveDriver::new(period).spawn(move || {
                let inner = weak.upgrade()?;
                Some(async move { inner.keepalive().await })
            });
            *inner.keepalive.lock() = Some(driver);
        }

        info!(
            client_id = %inner.client_id,
            url = %inner.endpoints.websocket,
            "Socket started"
        );

        Ok(Self { inner })
    }
}

// ============================================================================
// Socket - Display
// ============================================================================

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("client_id", &self.inner.client_id)
            .field("state", &self.state())
            .field("pending_count", &self.pending_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Socket - Public API
// ============================================================================

impl Socket {
    /// Sends `event` with `data` and waits for the correlated reply.
    ///
    /// Uses the persistent connection if it is open, otherwise one HTTP
    /// fallback call. Whichever transport delivers the reply first
    /// resolves the request.
    ///
    /// # Errors
    ///
    /// - [`Error::RequestTimeout`] if no reply arrives within the request timeout
    /// - [`Error::ConnectionClosed`] if the socket is shut down
    /// - [`Error::Json`] if `data` cannot be serialized
    pub async fn send(&self, event: &str, data: impl Serialize) -> Result<Value> {
        let data = to_value(data)?;
        self.inner.send(event, data).await
    }

    /// Returns this client's id.
    #[inline]
    #[must_use]
    pub fn client_id(&self) -> &ClientId {
        &self.inner.client_id
    }

    /// Returns the WebSocket and HTTP endpoints.
    #[inline]
    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.inner.endpoints
    }

    /// Returns the timing options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &SocketOptions {
        &self.inner.options
    }

    /// Returns the persistent connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.selector.persistent().state()
    }

    /// Subscribes to persistent connection state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.selector.persistent().subscribe()
    }

    /// Returns the number of requests awaiting a reply.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Returns the number of persistent connection attempts so far.
    #[inline]
    #[must_use]
    pub fn connection_attempts(&self) -> u64 {
        self.inner.selector.persistent().attempts()
    }

    /// Returns the number of fallback HTTP calls issued so far.
    #[inline]
    #[must_use]
    pub fn fallback_calls(&self) -> u64 {
        self.inner.selector.fallback().issued()
    }

    /// Drops the current connection (or pending reconnect delay) and
    /// connects again immediately.
    pub fn reconnect(&self) {
        self.inner.selector.persistent().reconnect();
    }

    /// Sets the handler for frames that answer no request.
    ///
    /// The handler may replace or clear itself.
    pub fn set_unsolicited_handler<F>(&self, handler: F)
    where
        F: Fn(ReplyFrame) + Send + Sync + 'static,
    {
        self.inner.dispatcher.set_unsolicited_handler(handler);
    }

    /// Removes the unsolicited frame handler.
    pub fn clear_unsolicited_handler(&self) {
        self.inner.dispatcher.clear_unsolicited_handler();
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has begun.
    #[inline]
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.closing.load(Ordering::Acquire)
    }

    /// Sends the `disconnect` notice, closes the connection, and stops all
    /// background tasks.
    ///
    /// The notice is best-effort: over the persistent connection if open,
    /// otherwise one fallback call, waited on for at most two seconds.
    /// Requests still pending are rejected with [`Error::ConnectionClosed`].
    /// Only the first call does anything; concurrent and later calls return
    /// immediately.
    pub async fn shutdown(&self) {
        if self.inner.closing.swap(true, Ordering::AcqRel) {
            return;
        }

        info!(client_id = %self.inner.client_id, "Shutting down socket");
        self.inner.send_disconnect_notice().await;
        self.inner.shutdown_tx.send_replace(true);

        if let Some(keepalive) = self.inner.keepalive.lock().take() {
            keepalive.abort();
        }

        let supervisor = self.inner.supervisor.lock().take();
        if let Some(supervisor) = supervisor {
            let _ = supervisor.await;
        }

        self.inner.registry.fail_all();
        debug!("Socket shut down");
    }
}

// ============================================================================
// SocketInner
// ============================================================================

impl SocketInner {
    async fn send(&self, event: &str, data: Value) -> Result<Value> {
        if self.closing.load(Ordering::Acquire) {
            return Err(Error::ConnectionClosed);
        }

        let echo_id = EchoId::generate();
        let payload = RequestFrame::correlated(event, data, echo_id.clone()).to_json()?;

        // Refused once shutdown has failed the registry
        let pending = self.registry.register(echo_id.clone())?;

        let route = self.selector.route(&payload);
        trace!(%echo_id, event, %route, "Request sent");

        pending.await
    }

    async fn keepalive(&self) -> Result<Value> {
        let payload = to_value(KeepalivePayload::now())?;
        self.send(KEEPALIVE, payload).await
    }

    async fn send_disconnect_notice(&self) {
        let payload = match RequestFrame::notice(DISCONNECT).to_json() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to encode disconnect notice");
                return;
            }
        };

        if self.selector.persistent().try_send(&payload) {
            return;
        }

        match timeout(DISCONNECT_NOTICE_TIMEOUT, self.selector.fallback().deliver(payload)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "Disconnect notice not delivered"),
            Err(_) => debug!("Disconnect notice abandoned after timeout"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
