//! Transport and correlation layer.
//!
//! This module carries request frames to the server and routes replies
//! back to the callers waiting for them.
//!
//! # Architecture
//!
//! ```text
//!  send(event, data)
//!        │
//!        ▼
//! ┌───────────────────┐ register ┌─────────────────────┐
//! │ TransportSelector │─────────►│ CorrelationRegistry │
//! └───────────────────┘          └─────────────────────┘
//!    Open │     │ not Open                  ▲ resolve
//!         ▼     ▼                           │
//! ┌────────────┐ ┌─────────────────┐  ┌────────────┐
//! │ Persistent │ │ RequestResponse │─►│ Dispatcher │
//! └────────────┘ └─────────────────┘  └────────────┘
//!        │          reply batches           ▲
//!        └──────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `dispatcher` | Inbound batch routing |
//! | `fallback` | HTTP request/response transport |
//! | `persistent` | WebSocket transport and reconnect supervisor |
//! | `registry` | Outstanding request correlation and timeouts |
//! | `selector` | `Transport` trait and per-call routing |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound batch routing.
pub mod dispatcher;

/// HTTP request/response fallback.
pub mod fallback;

/// Persistent WebSocket connection.
pub mod persistent;

/// Correlation registry.
pub mod registry;

/// Transport selection.
pub mod selector;

#[cfg(test)]
pub(crate) mod test_support;

// ============================================================================
// Re-exports
// ============================================================================

pub use dispatcher::Dispatcher;
pub use fallback::RequestResponseTransport;
pub use persistent::{ConnectionState, PersistentTransport};
pub use registry::{CorrelationRegistry, PendingReply};
pub use selector::{Transport, TransportKind, TransportSelector};
