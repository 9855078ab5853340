//! Routing of inbound reply batches.
//!
//! Every inbound payload, from either transport, passes through
//! [`Dispatcher::dispatch_text`]. Frames carrying an echo id resolve the
//! matching registry entry; frames without one go to the unsolicited hook.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::protocol::{ReplyFrame, parse_batch};

use super::registry::CorrelationRegistry;

// ============================================================================
// Types
// ============================================================================

/// Callback for frames that answer no request (`echo_id == null`).
type UnsolicitedHandler = Arc<dyn Fn(ReplyFrame) + Send + Sync>;

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes reply frames to the registry or the unsolicited hook.
pub struct Dispatcher {
    registry: Arc<CorrelationRegistry>,
    unsolicited: RwLock<Option<UnsolicitedHandler>>,
}

impl Dispatcher {
    /// Creates a dispatcher resolving into `registry`.
    #[must_use]
    pub fn new(registry: Arc<CorrelationRegistry>) -> Self {
        Self {
            registry,
            unsolicited: RwLock::new(None),
        }
    }

    /// Sets the handler for unsolicited frames.
    ///
    /// The handler runs without any lock held, so it may replace or clear
    /// itself.
    pub fn set_unsolicited_handler<F>(&self, handler: F)
    where
        F: Fn(ReplyFrame) + Send + Sync + 'static,
    {
        *self.unsolicited.write() = Some(Arc::new(handler));
    }

    /// Removes the unsolicited handler.
    pub fn clear_unsolicited_handler(&self) {
        *self.unsolicited.write() = None;
    }

    /// Parses a raw inbound payload and dispatches it.
    ///
    /// Malformed payloads are logged and dropped.
    pub fn dispatch_text(&self, text: &str) {
        match parse_batch(text) {
            Ok(batch) => self.dispatch(batch),
            Err(e) => warn!(error = %e, len = text.len(), "Failed to parse reply batch"),
        }
    }

    /// Dispatches each frame of `batch` in order.
    pub fn dispatch(&self, batch: Vec<ReplyFrame>) {
        for frame in batch {
            trace!(echo_id = ?frame.echo_id, event = %frame.event, "Reply frame received");

            let ReplyFrame {
                echo_id,
                event,
                data,
            } = frame;

            match echo_id {
                Some(echo_id) => {
                    // Unknown ids are expected after a timeout
                    let _ = self.registry.resolve(&echo_id, data);
                }
                None => self.dispatch_unsolicited(ReplyFrame::unsolicited(event, data)),
            }
        }
    }

    fn dispatch_unsolicited(&self, frame: ReplyFrame) {
        let handler = self.unsolicited.read().clone();
        match handler {
            Some(handler) => handler(frame),
            None => debug!(event = %frame.event, "Unsolicited frame without handler"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::mpsc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use serde_json::json;

    use crate::identifiers::EchoId;

    fn dispatcher() -> (Arc<CorrelationRegistry>, Dispatcher) {
        let registry = Arc::new(CorrelationRegistry::new(Duration::from_secs(10)));
        let dispatcher = Dispatcher::new(Arc::clone(&registry));
        (registry, dispatcher)
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_resolves_matching_entries() {
        let (registry, dispatcher) = dispatcher();
        let a = registry.register(EchoId::from("a")).expect("registered");
        let b = registry.register(EchoId::from("b")).expect("registered");

        dispatcher.dispatch_text(
            r#"[{"echo_id": "b", "event": "echo", "data": 2},
                {"echo_id": "a", "event": "echo", "data": 1}]"#,
        );

        assert_eq!(a.await.expect("a"), json!(1));
        assert_eq!(b.await.expect("b"), json!(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_echo_id_has_no_effect() {
        let (registry, dispatcher) = dispatcher();
        let _a = registry.register(EchoId::from("a")).expect("registered");

        dispatcher.dispatch(vec![ReplyFrame::reply(EchoId::from("x"), "echo", json!(1))]);

        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&EchoId::from("a")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_reply_in_batch_resolves_once() {
        let (registry, dispatcher) = dispatcher();
        let a = registry.register(EchoId::from("a")).expect("registered");

        dispatcher.dispatch(vec![
            ReplyFrame::reply(EchoId::from("a"), "echo", json!("first")),
            ReplyFrame::reply(EchoId::from("a"), "echo", json!("second")),
        ]);

        assert_eq!(a.await.expect("a"), json!("first"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsolicited_frames_reach_handler_in_order() {
        let (_registry, dispatcher) = dispatcher();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        dispatcher.set_unsolicited_handler(move |frame: ReplyFrame| sink.lock().push(frame.event));
        dispatcher.dispatch_text(
            r#"[{"echo_id": null, "event": "first"},
                {"echo_id": "unknown", "event": "skipped"},
                {"echo_id": null, "event": "second"}]"#,
        );

        assert_eq!(*seen.lock(), vec!["first".to_string(), "second".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleared_handler_is_not_called() {
        let (_registry, dispatcher) = dispatcher();
        let seen = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&seen);

        dispatcher.set_unsolicited_handler(move |_| *sink.lock() += 1);
        dispatcher.clear_unsolicited_handler();
        dispatcher.dispatch(vec![ReplyFrame::unsolicited("notice", json!(null))]);

        assert_eq!(*seen.lock(), 0);
    }

    #[test]
    fn test_handler_may_clear_itself() {
        let registry = Arc::new(CorrelationRegistry::new(Duration::from_secs(10)));
        let dispatcher = Arc::new(Dispatcher::new(registry));
        let calls = Arc::new(Mutex::new(0usize));

        let weak = Arc::downgrade(&dispatcher);
        let sink = Arc::clone(&calls);
        dispatcher.set_unsolicited_handler(move |_| {
            *sink.lock() += 1;
            if let Some(dispatcher) = weak.upgrade() {
                dispatcher.clear_unsolicited_handler();
            }
        });

        let (done_tx, done_rx) = mpsc::channel();
        let worker = Arc::clone(&dispatcher);
        std::thread::spawn(move || {
            worker.dispatch(vec![
                ReplyFrame::unsolicited("once", json!(1)),
                ReplyFrame::unsolicited("twice", json!(2)),
            ]);
            let _ = done_tx.send(());
        });

        done_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("dispatch returns");
        assert_eq!(*calls.lock(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_payload_is_dropped() {
        let (registry, dispatcher) = dispatcher();
        let _a = registry.register(EchoId::from("a")).expect("registered");

        dispatcher.dispatch_text("{not json");
        dispatcher.dispatch_text(r#"{"echo_id": "a"}"#);

        assert!(registry.contains(&EchoId::from("a")));
    }
}
