//! Echo Socket - Event/echo messaging client with transparent HTTP fallback.
//!
//! This library sends named events with JSON payloads to a server and
//! resolves each call with the server's correlated reply.
//!
//! # Architecture
//!
//! The client talks to one endpoint over two transports:
//!
//! - **Persistent (WebSocket)**: Long-lived connection, reconnected on a
//!   fixed delay whenever it closes
//! - **Request/Response (HTTP)**: One `POST` per frame, used whenever the
//!   persistent connection is not open
//!
//! Key design principles:
//!
//! - Every request carries a fresh `echo_id`; the first reply with that id
//!   resolves it, on whichever transport it arrives
//! - Every request resolves or fails exactly once, bounded by its timeout
//! - Inbound messages are batches; frames without an `echo_id` go to an
//!   optional unsolicited handler
//! - A keepalive event flows through the normal request path
//!
//! # Quick Start
//!
//! ```no_run
//! use echo_socket::{Result, Socket};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let socket = Socket::builder()
//!         .base_url("http://localhost:8080/api")
//!         .build()?;
//!
//!     let reply = socket.send("echo", json!({ "hello": "world" })).await?;
//!     println!("Reply: {reply}");
//!
//!     socket.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`socket`] | [`Socket`] service object and configuration |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Client and request id generation |
//! | [`keepalive`] | Periodic liveness probe |
//! | [`protocol`] | Wire frame types |
//! | [`transport`] | Transports, correlation, and dispatch |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Client and request identifiers.
///
/// Newtype wrappers keep client ids and echo ids apart at compile time.
pub mod identifiers;

/// Fixed-interval keepalive driver.
pub mod keepalive;

/// Wire protocol frame types.
pub mod protocol;

/// Socket service object and configuration.
///
/// Use [`Socket::builder()`] to create a configured socket.
pub mod socket;

/// Transport and correlation layer.
///
/// Persistent and fallback transports, the correlation registry, and the
/// inbound dispatcher.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Socket types
pub use socket::{Endpoints, Socket, SocketBuilder, SocketOptions};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ClientId, EchoId};

// Protocol types
pub use protocol::{ReplyFrame, RequestFrame};

// Transport types
pub use transport::{ConnectionState, TransportKind};
