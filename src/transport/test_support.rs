//! Loopback servers shared by the transport tests.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::to_string;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::protocol::{ReplyFrame, RequestFrame};

use super::dispatcher::Dispatcher;
use super::registry::CorrelationRegistry;

/// Registry and dispatcher with the given request timeout.
pub(crate) fn dispatcher(timeout: Duration) -> (Arc<CorrelationRegistry>, Arc<Dispatcher>) {
    let registry = Arc::new(CorrelationRegistry::new(timeout));
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&registry)));
    (registry, dispatcher)
}

/// WebSocket server that echoes every correlated frame back as a batch.
pub(crate) struct EchoServer {
    pub(crate) url: Url,
    pub(crate) accepted: Arc<AtomicUsize>,
    pub(crate) received: Arc<Mutex<Vec<RequestFrame>>>,
}

impl EchoServer {
    pub(crate) async fn start() -> Self {
        let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
            .await
            .expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let accepted = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(Mutex::new(Vec::new()));

        let accepted_clone = Arc::clone(&accepted);
        let received_clone = Arc::clone(&received);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                accepted_clone.fetch_add(1, Ordering::SeqCst);
                let received = Arc::clone(&received_clone);

                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };

                    while let Some(Ok(Message::Text(text))) = ws.next().await {
                        let Ok(frame) = serde_json::from_str::<RequestFrame>(&text) else {
                            continue;
                        };
                        received.lock().push(frame.clone());

                        if let Some(echo_id) = frame.echo_id {
                            let batch = vec![ReplyFrame::reply(echo_id, frame.event, frame.data)];
                            let json = to_string(&batch).expect("serialize");
                            if ws.send(Message::Text(json.into())).await.is_err() {
                                return;
                            }
                        }
                    }
                });
            }
        });

        let url = Url::parse(&format!("ws://127.0.0.1:{port}/api")).expect("url");
        Self {
            url,
            accepted,
            received,
        }
    }
}

/// Address with nothing listening on it.
pub(crate) async fn closed_port_url(scheme: &str) -> Url {
    let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
        .await
        .expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    Url::parse(&format!("{scheme}://127.0.0.1:{port}/api")).expect("url")
}
