//! HTTP request/response fallback transport.
//!
//! Used whenever the persistent connection is not open. Each frame is
//! `POST`ed to the same endpoint; the response body is a reply batch and
//! goes through the same dispatcher as WebSocket messages.
//!
//! Every call is aborted after a hard deadline. An aborted call yields no
//! reply, so the request then expires on its own registry timer.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::Result;

use super::dispatcher::Dispatcher;
use super::selector::{Transport, TransportKind};

// ============================================================================
// RequestResponseTransport
// ============================================================================

/// One-shot HTTP transport to the endpoint.
pub struct RequestResponseTransport {
    /// Client carrying the abort deadline as its request timeout.
    http: reqwest::Client,
    /// `http://` or `https://` endpoint including the client id.
    url: Url,
    /// Receives every response batch.
    dispatcher: Arc<Dispatcher>,
    /// Calls issued so far.
    issued: AtomicU64,
}

impl RequestResponseTransport {
    /// Creates a transport whose calls are aborted after `deadline`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`](crate::Error::Http) if the HTTP client cannot
    /// be built.
    pub fn new(url: Url, dispatcher: Arc<Dispatcher>, deadline: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(deadline).build()?;

        Ok(Self {
            http,
            url,
            dispatcher,
            issued: AtomicU64::new(0),
        })
    }

    /// Returns the endpoint URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the number of calls issued so far.
    #[inline]
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }

    /// Issues one call and waits for it to finish.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`](crate::Error::Http) if the call fails or
    /// exceeds the deadline.
    pub async fn deliver(&self, payload: String) -> Result<()> {
        self.issued.fetch_add(1, Ordering::Relaxed);
        Self::post(
            self.http.clone(),
            self.url.clone(),
            payload,
            Arc::clone(&self.dispatcher),
        )
        .await
    }

    async fn post(
        http: reqwest::Client,
        url: Url,
        payload: String,
        dispatcher: Arc<Dispatcher>,
    ) -> Result<()> {
        let response = http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        trace!(%status, len = body.len(), "Fallback response received");

        if body.trim().is_empty() {
            debug!(%status, "Fallback response without body");
        } else {
            dispatcher.dispatch_text(&body);
        }

        Ok(())
    }
}

impl Transport for RequestResponseTransport {
    #[inline]
    fn kind(&self) -> TransportKind {
        TransportKind::RequestResponse
    }

    /// Spawns one call; always accepts.
    fn try_send(&self, payload: &str) -> bool {
        self.issued.fetch_add(1, Ordering::Relaxed);

        let call = Self::post(
            self.http.clone(),
            self.url.clone(),
            payload.to_owned(),
            Arc::clone(&self.dispatcher),
        );

        tokio::spawn(async move {
            if let Err(e) = call.await {
                if e.is_timeout() {
                    debug!(error = %e, "Fallback call aborted at deadline");
                } else {
                    warn!(error = %e, "Fallback call failed");
                }
            }
        });

        true
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use axum::Router;
    use axum::routing::post;
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio::time::{Instant, timeout};

    use crate::identifiers::EchoId;
    use crate::protocol::RequestFrame;
    use crate::transport::test_support::{closed_port_url, dispatcher};

    const WAIT: Duration = Duration::from_secs(5);

    /// HTTP server answering every `POST /api` with `body`.
    async fn http_server(body: &'static str) -> Url {
        let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
            .await
            .expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let app = Router::new().route("/api", post(move || async move { body }));

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Url::parse(&format!("http://127.0.0.1:{port}/api")).expect("url")
    }

    /// Server that accepts connections and never answers.
    async fn silent_server() -> Url {
        let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
            .await
            .expect("bind");
        let port = listener.local_addr().expect("addr").port();

        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        Url::parse(&format!("http://127.0.0.1:{port}/api")).expect("url")
    }

    #[tokio::test]
    async fn test_response_batch_resolves_request() {
        let url = http_server(r#"[{"echo_id": "fixed", "event": "echo", "data": {"x": 1}}]"#).await;
        let (registry, dispatcher) = dispatcher(Duration::from_secs(10));
        let transport =
            RequestResponseTransport::new(url, dispatcher, Duration::from_secs(10)).expect("client");

        let pending = registry.register(EchoId::from("fixed")).expect("registered");
        let frame = RequestFrame::correlated("echo", json!({"x": 1}), EchoId::from("fixed"));

        assert!(transport.try_send(&frame.to_json().expect("serialize")));
        assert_eq!(transport.issued(), 1);

        let reply = timeout(WAIT, pending).await.expect("reply in time");
        assert_eq!(reply.expect("resolved"), json!({"x": 1}));
    }

    #[tokio::test]
    async fn test_deliver_reports_unreachable_endpoint() {
        let url = closed_port_url("http").await;
        let (_registry, dispatcher) = dispatcher(Duration::from_secs(10));
        let transport =
            RequestResponseTransport::new(url, dispatcher, Duration::from_secs(10)).expect("client");

        let err = transport
            .deliver(r#"{"event":"disconnect"}"#.to_string())
            .await
            .expect_err("nothing listening");
        assert!(matches!(err, crate::Error::Http(_)));
        assert_eq!(transport.issued(), 1);
    }

    #[tokio::test]
    async fn test_deliver_aborts_at_deadline() {
        const DEADLINE: Duration = Duration::from_millis(200);

        let url = silent_server().await;
        let (_registry, dispatcher) = dispatcher(Duration::from_secs(10));
        let transport = RequestResponseTransport::new(url, dispatcher, DEADLINE).expect("client");

        let start = Instant::now();
        let err = transport
            .deliver(r#"{"event":"echo"}"#.to_string())
            .await
            .expect_err("should abort");

        assert!(err.is_timeout());
        assert!(start.elapsed() >= DEADLINE);
        assert!(start.elapsed() < WAIT);
    }

    #[tokio::test]
    async fn test_empty_body_is_ignored() {
        let url = http_server("").await;
        let (registry, dispatcher) = dispatcher(Duration::from_secs(10));
        let transport =
            RequestResponseTransport::new(url, dispatcher, Duration::from_secs(10)).expect("client");

        transport
            .deliver(r#"{"event":"disconnect"}"#.to_string())
            .await
            .expect("delivered");
        assert!(registry.is_empty());
    }
}
