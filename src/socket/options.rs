//! Socket timing options and endpoint derivation.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use echo_socket::SocketOptions;
//!
//! let options = SocketOptions::new()
//!     .with_request_timeout(Duration::from_secs(3))
//!     .without_keepalive();
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::ClientId;

// ============================================================================
// Constants
// ============================================================================

/// Time a request waits for its reply.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Time after which a fallback HTTP call is aborted.
pub const DEFAULT_FALLBACK_DEADLINE: Duration = Duration::from_secs(10);

/// Wait between a connection loss and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Keepalive period.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);

/// Query parameter carrying the client id.
const CLIENT_ID_PARAM: &str = "id";

// ============================================================================
// SocketOptions
// ============================================================================

/// Timing configuration of a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketOptions {
    /// Time a request waits for its reply.
    pub request_timeout: Duration,

    /// Hard deadline of one fallback HTTP call.
    pub fallback_deadline: Duration,

    /// Fixed wait before reconnecting.
    pub reconnect_delay: Duration,

    /// Keepalive period; `None` disables the driver.
    pub keepalive_interval: Option<Duration>,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl SocketOptions {
    /// Creates options with the default timings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            fallback_deadline: DEFAULT_FALLBACK_DEADLINE,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            keepalive_interval: Some(DEFAULT_KEEPALIVE_INTERVAL),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SocketOptions {
    /// Sets the request timeout.
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the fallback call deadline.
    #[inline]
    #[must_use]
    pub fn with_fallback_deadline(mut self, deadline: Duration) -> Self {
        self.fallback_deadline = deadline;
        self
    }

    /// Sets the reconnect delay.
    #[inline]
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the keepalive period.
    #[inline]
    #[must_use]
    pub fn with_keepalive_interval(mut self, period: Duration) -> Self {
        self.keepalive_interval = Some(period);
        self
    }

    /// Disables the keepalive driver.
    #[inline]
    #[must_use]
    pub fn without_keepalive(mut self) -> Self {
        self.keepalive_interval = None;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl SocketOptions {
    /// Checks that every duration is non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first zero duration.
    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("request_timeout", Some(self.request_timeout)),
            ("fallback_deadline", Some(self.fallback_deadline)),
            ("reconnect_delay", Some(self.reconnect_delay)),
            ("keepalive_interval", self.keepalive_interval),
        ];

        for (name, duration) in durations {
            if duration.is_some_and(|d| d.is_zero()) {
                return Err(Error::config(format!("{name} must be greater than zero")));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Endpoints
// ============================================================================

/// The two URLs a socket talks to.
///
/// Both share host, path, and the `id` query parameter; only the scheme
/// differs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// `ws://` or `wss://` URL of the persistent connection.
    pub websocket: Url,
    /// `http://` or `https://` URL of the fallback transport.
    pub http: Url,
}

impl Endpoints {
    /// Derives both endpoints from `base` and the client id.
    ///
    /// `base` may use any of `http`, `https`, `ws`, `wss`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for any other scheme.
    pub fn derive(base: &Url, client_id: &ClientId) -> Result<Self> {
        let (http_scheme, ws_scheme) = match base.scheme() {
            "http" | "ws" => ("http", "ws"),
            "https" | "wss" => ("https", "wss"),
            other => {
                return Err(Error::config(format!(
                    "Unsupported URL scheme '{other}'. Use http, https, ws or wss."
                )));
            }
        };

        let mut http = base.clone();
        http.set_fragment(None);
        http.set_scheme(http_scheme)
            .map_err(|()| Error::config(format!("Cannot use scheme '{http_scheme}' for {base}")))?;
        http.query_pairs_mut()
            .append_pair(CLIENT_ID_PARAM, client_id.as_str());

        let mut websocket = http.clone();
        websocket
            .set_scheme(ws_scheme)
            .map_err(|()| Error::config(format!("Cannot use scheme '{ws_scheme}' for {base}")))?;

        Ok(Self { websocket, http })
    }
}

// ============================================================================
// Tests
// ============================================================================
