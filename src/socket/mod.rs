//! Socket client module.
//!
//! This module provides the main entry point for event/echo messaging.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Socket`] | Client connection with correlation and fallback |
//! | [`SocketBuilder`] | Fluent configuration builder |
//! | [`SocketOptions`] | Timing options |
//! | [`Endpoints`] | WebSocket and HTTP URLs derived from the base |
//!
//! # Example
//!
//! ```no_run
//! use echo_socket::{Result, Socket};
//! use serde_json::json;
//!
//! # async fn example() -> Result<()> {
//! let socket = Socket::builder()
//!     .base_url("https://example.com/api")
//!     .build()?;
//!
//! let reply = socket.send("echo", json!({ "hello": "world" })).await?;
//! println!("{reply}");
//!
//! socket.shutdown().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for socket configuration.
pub mod builder;

/// Core socket implementation.
pub mod core;

/// Timing options and endpoint derivation.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::SocketBuilder;
pub use core::Socket;
pub use options::{
    DEFAULT_FALLBACK_DEADLINE, DEFAULT_KEEPALIVE_INTERVAL, DEFAULT_RECONNECT_DELAY,
    DEFAULT_REQUEST_TIMEOUT, Endpoints, SocketOptions,
};
