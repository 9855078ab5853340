//! Client and request identifiers.
//!
//! Two token shapes are generated:
//!
//! | Function | Shape |
//! |----------|-------|
//! | [`dashed`] | 36 chars, `xxxxxxxx-xxxx-4xxx-Vxxx-xxxxxxxxxxxx`, `V` in `8 9 a b` |
//! | [`token`] | `len` chars from `[0-9A-Za-z]` |
//!
//! Both draw from cryptographically strong sources. Uniqueness is
//! probabilistic; collisions are not detected.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Generators
// ============================================================================

/// Length of a [`dashed`] token.
pub const DASHED_LEN: usize = 36;

/// Returns a 36-character dashed token (UUID v4 layout, lowercase).
#[inline]
#[must_use]
pub fn dashed() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Returns `len` characters drawn independently from `[0-9A-Za-z]`.
#[must_use]
pub fn token(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

// ============================================================================
// ClientId
// ============================================================================

/// Identity of one socket instance.
///
/// Generated once and embedded in the endpoint URL as `?id=`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Generates a fresh client id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(dashed())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// EchoId
// ============================================================================

/// Correlation id linking a request frame to its reply frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EchoId(String);

impl EchoId {
    /// Generates a fresh echo id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(dashed())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EchoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EchoId {
    #[inline]
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for EchoId {
    #[inline]
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

// ============================================================================
// Tests
// ============================================================================
