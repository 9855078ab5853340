//! Error types for the echo socket.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use echo_socket::{Result, Socket};
//!
//! async fn example(socket: &Socket) -> Result<()> {
//!     let reply = socket.send("echo", serde_json::json!({ "x": 1 })).await?;
//!     println!("{reply}");
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidUrl`] |
//! | Connection | [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`] |
//! | Execution | [`Error::RequestTimeout`] |
//! | External | [`Error::Json`], [`Error::Http`] |
//!
//! Only [`Error::RequestTimeout`] reaches callers of `send` during normal
//! operation. Transport failures are logged where they happen and the
//! request is left to its own timer.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::EchoId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when socket configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Base URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// The socket was shut down while the request was pending.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected payload.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// No reply arrived before the request timeout.
    #[error("Request {echo_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// Echo id of the request that timed out.
        echo_id: EchoId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP fallback error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(echo_id: EchoId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            echo_id,
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::RequestTimeout { .. } => true,
            Self::Http(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::ConnectionClosed => true,
            Self::Http(e) => e.is_connect(),
            _ => false,
        }
    }

    /// Returns `true` if retrying the same request may succeed.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::RequestTimeout { .. } => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::protocol("unexpected payload");
        assert_eq!(err.to_string(), "Protocol error: unexpected payload");
        assert_eq!(Error::ConnectionClosed.to_string(), "Connection closed");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("base URL is required");
        assert_eq!(err.to_string(), "Configuration error: base URL is required");
    }

    #[test]
    fn test_request_timeout_display() {
        let echo_id = EchoId::from("a1b2");
        let err = Error::request_timeout(echo_id, 10_000);
        assert_eq!(err.to_string(), "Request a1b2 timed out after 10000ms");
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::request_timeout(EchoId::generate(), 10_000);
        let other_err = Error::ConnectionClosed;

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::config("test").is_connection_error());
        assert!(!Error::protocol("test").is_connection_error());
    }

    #[test]
    fn test_is_recoverable() {
        let timeout_err = Error::request_timeout(EchoId::generate(), 1_000);

        assert!(timeout_err.is_recoverable());
        assert!(!Error::config("test").is_recoverable());
        assert!(!Error::ConnectionClosed.is_recoverable());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_from_url_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
