//! Persistent WebSocket transport and its reconnect supervisor.
//!
//! A single supervisor task owns the connection for the lifetime of the
//! socket:
//!
//! ```text
//!            ┌──────────────┐ handshake ok ┌────────┐
//!   start ──►│  Connecting  │─────────────►│  Open  │
//!            └──────────────┘              └────────┘
//!                   ▲   │ handshake failed      │ close / error
//!                   │   ▼                       ▼
//!                   │ ┌──────────────────────────┐
//!                   └─┤ Closed (reconnect delay) │
//!                     └──────────────────────────┘
//! ```
//!
//! The reconnect delay is fixed: no backoff growth, no retry cap.
//! [`PersistentTransport::reconnect`] skips the delay, or drops the
//! current connection and opens a new one immediately.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};
use url::Url;

use super::dispatcher::Dispatcher;
use super::selector::{Transport, TransportKind};

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of the persistent connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Handshake in progress.
    Connecting,
    /// Frames can be sent.
    Open,
    /// Not connected; waiting to reconnect or shut down.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Why a connection attempt or session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// Lost or refused; reconnect after the delay.
    Closed,
    /// Reconnect requested; skip the delay.
    Restart,
    /// Socket is shutting down.
    Shutdown,
}

// ============================================================================
// PersistentTransport
// ============================================================================

/// Long-lived WebSocket connection to the endpoint.
pub struct PersistentTransport {
    /// `ws://` or `wss://` endpoint including the client id.
    url: Url,
    /// Receives every inbound batch.
    dispatcher: Arc<Dispatcher>,
    /// Fixed wait between a close and the next attempt.
    reconnect_delay: Duration,
    /// Published connection state.
    state: watch::Sender<ConnectionState>,
    /// Writer queue of the open session, if any.
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    /// Wakes the supervisor for an immediate reconnect.
    restart: Notify,
    /// Connection attempts started so far.
    attempts: AtomicU64,
}

impl PersistentTransport {
    /// Creates a transport in the `Closed` state. Call [`spawn`](Self::spawn)
    /// to start connecting.
    #[must_use]
    pub fn new(url: Url, dispatcher: Arc<Dispatcher>, reconnect_delay: Duration) -> Self {
        let (state, _) = watch::channel(ConnectionState::Closed);

        Self {
            url,
            dispatcher,
            reconnect_delay,
            state,
            outbound: Mutex::new(None),
            restart: Notify::new(),
            attempts: AtomicU64::new(0),
        }
    }

    /// Starts the supervisor task.
    ///
    /// The task runs until `shutdown` becomes `true` or its sender is dropped.
    pub fn spawn(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run(shutdown))
    }

    /// Returns the endpoint URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Subscribes to connection state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Returns the number of connection attempts started so far.
    #[inline]
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Cancels any pending reconnect delay, closes the current connection,
    /// and opens a new one.
    pub fn reconnect(&self) {
        debug!("Immediate reconnect requested");
        self.restart.notify_one();
    }

    /// Supervisor loop: connect, run the session, wait, repeat.
    async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
            self.state.send_replace(ConnectionState::Connecting);
            debug!(url = %self.url, attempt, "Opening persistent connection");

            let end = tokio::select! {
                result = connect_async(self.url.as_str()) => match result {
                    Ok((stream, _)) => {
                        info!(url = %self.url, attempt, "Persistent connection open");
                        self.run_session(stream, &mut shutdown).await
                    }
                    Err(e) => {
                        debug!(error = %e, attempt, "Persistent connection attempt failed");
                        SessionEnd::Closed
                    }
                },
                () = self.restart.notified() => SessionEnd::Restart,
                _ = shutdown.changed() => SessionEnd::Shutdown,
            };

            self.close_link();

            match end {
                SessionEnd::Shutdown => break,
                SessionEnd::Restart => continue,
                SessionEnd::Closed => {}
            }

            warn!(
                delay_ms = u64::try_from(self.reconnect_delay.as_millis()).unwrap_or(u64::MAX),
                "Persistent connection closed, reconnecting after delay"
            );

            tokio::select! {
                () = sleep(self.reconnect_delay) => {}
                () = self.restart.notified() => debug!("Reconnect delay cancelled"),
                _ = shutdown.changed() => break,
            }
        }

        self.close_link();
        debug!("Persistent transport supervisor terminated");
    }

    /// Pumps one open connection until it ends.
    async fn run_session(&self, stream: WsStream, shutdown: &mut watch::Receiver<bool>) -> SessionEnd {
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (mut ws_write, mut ws_read) = stream.split();

        *self.outbound.lock() = Some(outbound_tx);
        self.state.send_replace(ConnectionState::Open);

        let end = loop {
            tokio::select! {
                // Queued frames go out before a shutdown is honored
                biased;

                outbound = outbound_rx.recv() => {
                    let Some(json) = outbound else {
                        break SessionEnd::Closed;
                    };

                    if let Err(e) = ws_write.send(Message::Text(json.into())).await {
                        warn!(error = %e, "Failed to write frame");
                        break SessionEnd::Closed;
                    }
                }

                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => self.dispatcher.dispatch_text(&text),

                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "WebSocket closed by remote");
                            break SessionEnd::Closed;
                        }

                        Some(Err(e)) => {
                            warn!(error = %e, "WebSocket error");
                            break SessionEnd::Closed;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break SessionEnd::Closed;
                        }

                        // Ignore Binary, Ping, Pong, Frame
                        Some(Ok(_)) => {}
                    }
                }

                () = self.restart.notified() => break SessionEnd::Restart,

                _ = shutdown.changed() => break SessionEnd::Shutdown,
            }
        };

        self.close_link();

        if end != SessionEnd::Closed {
            let _ = ws_write.close().await;
        }

        end
    }

    /// Stops accepting frames and publishes `Closed`.
    fn close_link(&self) {
        self.outbound.lock().take();
        self.state.send_replace(ConnectionState::Closed);
    }
}

impl Transport for PersistentTransport {
    #[inline]
    fn kind(&self) -> TransportKind {
        TransportKind::Persistent
    }

    /// Queues `payload` on the open session; `false` if none is open.
    fn try_send(&self, payload: &str) -> bool {
        let sent = self
            .outbound
            .lock()
            .as_ref()
            .is_some_and(|tx| tx.send(payload.to_owned()).is_ok());

        if sent {
            trace!(len = payload.len(), "Frame queued on persistent connection");
        }
        sent
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio::time::{Instant, timeout};

    use crate::identifiers::EchoId;
    use crate::protocol::RequestFrame;
    use crate::transport::test_support::{EchoServer, closed_port_url, dispatcher};

    const WAIT: Duration = Duration::from_secs(5);

    async fn wait_for(transport: &PersistentTransport, state: ConnectionState) {
        let mut rx = transport.subscribe();
        timeout(WAIT, rx.wait_for(|s| *s == state))
            .await
            .expect("state reached in time")
            .expect("transport alive");
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionState::Open.to_string(), "open");
        assert_eq!(ConnectionState::Closed.to_string(), "closed");
    }

    #[tokio::test]
    async fn test_try_send_without_connection_is_refused() {
        let (_registry, dispatcher) = dispatcher(Duration::from_secs(10));
        let url = closed_port_url("ws").await;
        let transport = PersistentTransport::new(url, dispatcher, Duration::from_secs(5));

        assert_eq!(transport.state(), ConnectionState::Closed);
        assert!(!transport.try_send(r#"{"event":"echo"}"#));
        assert_eq!(transport.attempts(), 0);
    }

    #[tokio::test]
    async fn test_open_connection_round_trip() {
        let server = EchoServer::start().await;
        let (registry, dispatcher) = dispatcher(Duration::from_secs(10));
        let transport = Arc::new(PersistentTransport::new(
            server.url.clone(),
            dispatcher,
            Duration::from_secs(5),
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let supervisor = transport.spawn(shutdown_rx);

        wait_for(&transport, ConnectionState::Open).await;

        let echo_id = EchoId::generate();
        let pending = registry.register(echo_id.clone()).expect("registered");
        let frame = RequestFrame::correlated("echo", json!({"x": 1}), echo_id);
        assert!(transport.try_send(&frame.to_json().expect("serialize")));

        let reply = timeout(WAIT, pending).await.expect("reply in time");
        assert_eq!(reply.expect("resolved"), json!({"x": 1}));

        let received = server.received.lock().clone();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].event, "echo");

        shutdown_tx.send_replace(true);
        timeout(WAIT, supervisor).await.expect("stops").expect("joins");
        assert_eq!(transport.state(), ConnectionState::Closed);
        assert!(!transport.try_send("{}"));
    }

    #[tokio::test]
    async fn test_reconnects_after_fixed_delay() {
        const DELAY: Duration = Duration::from_millis(150);

        // Accepts TCP and drops it, so every handshake fails
        let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
            .await
            .expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let accepts = Arc::new(Mutex::new(Vec::new()));
        let accepts_clone = Arc::clone(&accepts);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                accepts_clone.lock().push(Instant::now());
                drop(stream);
            }
        });

        let (_registry, dispatcher) = dispatcher(Duration::from_secs(10));
        let url = Url::parse(&format!("ws://127.0.0.1:{port}/api")).expect("url");
        let transport = Arc::new(PersistentTransport::new(url, dispatcher, DELAY));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let supervisor = transport.spawn(shutdown_rx);

        timeout(WAIT, async {
            while accepts.lock().len() < 4 {
                sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("kept reconnecting");

        let times = accepts.lock().clone();
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= DELAY, "gap {:?}", pair[1] - pair[0]);
        }
        assert!(transport.attempts() >= 4);

        shutdown_tx.send_replace(true);
        timeout(WAIT, supervisor).await.expect("stops").expect("joins");
    }

    #[tokio::test]
    async fn test_reconnect_replaces_open_connection() {
        let server = EchoServer::start().await;
        let (_registry, dispatcher) = dispatcher(Duration::from_secs(10));
        let transport = Arc::new(PersistentTransport::new(
            server.url.clone(),
            dispatcher,
            Duration::from_secs(60),
        ));
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let _supervisor = transport.spawn(shutdown_rx);

        wait_for(&transport, ConnectionState::Open).await;
        transport.reconnect();

        timeout(WAIT, async {
            while server.accepted.load(std::sync::atomic::Ordering::SeqCst) < 2 {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("second connection without waiting the delay");

        wait_for(&transport, ConnectionState::Open).await;
        assert_eq!(transport.attempts(), 2);
    }

    #[tokio::test]
    async fn test_dropped_shutdown_sender_stops_supervisor() {
        let (_registry, dispatcher) = dispatcher(Duration::from_secs(10));
        let url = closed_port_url("ws").await;
        let transport = Arc::new(PersistentTransport::new(url, dispatcher, Duration::from_secs(60)));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let supervisor = transport.spawn(shutdown_rx);

        drop(shutdown_tx);

        timeout(WAIT, supervisor).await.expect("stops").expect("joins");
        assert_eq!(transport.state(), ConnectionState::Closed);
    }
}
