//! Request and reply frames.
//!
//! Both transports carry the same JSON shapes: one request frame per
//! outbound message, and a batch (array) of reply frames per inbound
//! message or HTTP response body.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, from_str, to_string};

use crate::error::Result;
use crate::identifiers::EchoId;

// ============================================================================
// RequestFrame
// ============================================================================

/// An outbound frame from client to server.
///
/// # Format
///
/// ```json
/// { "event": "echo", "data": { ... }, "echo_id": "uuid" }
/// ```
///
/// `echo_id` is omitted for uncorrelated notices; `data` is omitted when null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    /// Event name.
    pub event: String,

    /// Event payload.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,

    /// Correlation id, if a reply is expected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub echo_id: Option<EchoId>,
}

impl RequestFrame {
    /// Creates a frame that expects a reply carrying `echo_id`.
    #[inline]
    #[must_use]
    pub fn correlated(event: impl Into<String>, data: Value, echo_id: EchoId) -> Self {
        Self {
            event: event.into(),
            data,
            echo_id: Some(echo_id),
        }
    }

    /// Creates a fire-and-forget frame with no data.
    #[inline]
    #[must_use]
    pub fn notice(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: Value::Null,
            echo_id: None,
        }
    }

    /// Serializes the frame to its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if `data` cannot be serialized.
    #[inline]
    pub fn to_json(&self) -> Result<String> {
        Ok(to_string(self)?)
    }
}

// ============================================================================
// ReplyFrame
// ============================================================================

/// An inbound frame from server to client.
///
/// # Format
///
/// ```json
/// { "echo_id": "uuid" | null, "event": "echo", "data": { ... } }
/// ```
///
/// A null `echo_id` marks an unsolicited server event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyFrame {
    /// Correlation id of the request being answered.
    #[serde(default)]
    pub echo_id: Option<EchoId>,

    /// Event name.
    #[serde(default)]
    pub event: String,

    /// Reply payload.
    #[serde(default)]
    pub data: Value,
}

impl ReplyFrame {
    /// Creates a reply to the request carrying `echo_id`.
    #[inline]
    #[must_use]
    pub fn reply(echo_id: EchoId, event: impl Into<String>, data: Value) -> Self {
        Self {
            echo_id: Some(echo_id),
            event: event.into(),
            data,
        }
    }

    /// Creates an unsolicited frame.
    #[inline]
    #[must_use]
    pub fn unsolicited(event: impl Into<String>, data: Value) -> Self {
        Self {
            echo_id: None,
            event: event.into(),
            data,
        }
    }

    /// Returns `true` if no request is waiting for this frame.
    #[inline]
    #[must_use]
    pub fn is_unsolicited(&self) -> bool {
        self.echo_id.is_none()
    }
}

/// Parses an inbound payload into an ordered batch of reply frames.
///
/// # Errors
///
/// Returns [`Error::Json`](crate::Error::Json) if the payload is not a JSON
/// array of reply frames.
#[inline]
pub fn parse_batch(text: &str) -> Result<Vec<ReplyFrame>> {
    Ok(from_str(text)?)
}

// ============================================================================
// Tests
// ============================================================================
