//! Builder pattern for socket configuration.
//!
//! Provides a fluent API for configuring and starting [`Socket`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use echo_socket::Socket;
//!
//! # async fn example() -> echo_socket::Result<()> {
//! let socket = Socket::builder()
//!     .base_url("https://example.com/api")
//!     .request_timeout(Duration::from_secs(5))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::ClientId;

use super::core::Socket;
use super::options::{Endpoints, SocketOptions};

// ============================================================================
// SocketBuilder
// ============================================================================

/// Builder for configuring a [`Socket`] instance.
///
/// Use [`Socket::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct SocketBuilder {
    /// Server endpoint without the client id.
    base_url: Option<String>,
    /// Timing options.
    options: SocketOptions,
}

// ============================================================================
// SocketBuilder Implementation
// ============================================================================

impl SocketBuilder {
    /// Creates a new builder with default options and no endpoint.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server endpoint (e.g. `https://example.com/api`).
    ///
    /// The client id is appended as the `id` query parameter.
    #[inline]
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Replaces all timing options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: SocketOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets how long a request waits for its reply.
    #[inline]
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_request_timeout(timeout);
        self
    }

    /// Sets the hard deadline of one fallback HTTP call.
    #[inline]
    #[must_use]
    pub fn fallback_deadline(mut self, deadline: Duration) -> Self {
        self.options = self.options.with_fallback_deadline(deadline);
        self
    }

    /// Sets the fixed wait before reconnecting.
    #[inline]
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.options = self.options.with_reconnect_delay(delay);
        self
    }

    /// Sets the keepalive period.
    #[inline]
    #[must_use]
    pub fn keepalive_interval(mut self, period: Duration) -> Self {
        self.options = self.options.with_keepalive_interval(period);
        self
    }

    /// Disables the keepalive driver.
    #[inline]
    #[must_use]
    pub fn without_keepalive(mut self) -> Self {
        self.options = self.options.without_keepalive();
        self
    }

    /// Validates the configuration and starts the socket.
    ///
    /// Must be called from within a Tokio runtime: the connection
    /// supervisor and keepalive driver are spawned immediately.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the base URL is missing, uses an unsupported
    ///   scheme, a duration is zero, or no Tokio runtime is running
    /// - [`Error::InvalidUrl`] if the base URL cannot be parsed
    /// - [`Error::Http`] if the fallback HTTP client cannot be built
    pub fn build(self) -> Result<Socket> {
        let base_url = self.validate_base_url()?;
        self.options.validate()?;

        let client_id = ClientId::generate();
        let endpoints = Endpoints::derive(&base_url, &client_id)?;

        Socket::start(client_id, endpoints, self.options)
    }
}

// ============================================================================
// Validation
// ============================================================================

impl SocketBuilder {
    /// Validates the base URL configuration.
    fn validate_base_url(&self) -> Result<Url> {
        let base_url = self.base_url.as_deref().ok_or_else(|| {
            Error::config(
                "Base URL is required. Use .base_url() to set it.\n\
                 Example: Socket::builder().base_url(\"https://example.com/api\")",
            )
        })?;

        Ok(Url::parse(base_url)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
