//! Wire protocol message types.
//!
//! This module defines the JSON frames exchanged with the server over
//! either transport.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `RequestFrame` | Client → Server | One event, optionally correlated |
//! | `ReplyFrame` | Server → Client | One reply or unsolicited event |
//!
//! Inbound messages are always a JSON array of reply frames.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Reserved event names and payloads |
//! | `frame` | Request and reply frames |

// ============================================================================
// Submodules
// ============================================================================

/// Reserved event names.
pub mod event;

/// Request and reply frames.
pub mod frame;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{DISCONNECT, KEEPALIVE, KeepalivePayload};
pub use frame::{ReplyFrame, RequestFrame, parse_batch};
