//! Error types for the Puppet client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use puppet_client::{PuppetConnection, Result};
//!
//! async fn example(connection: &mut PuppetConnection) -> Result<()> {
//!     connection.connect().await?;
//!     connection.close()?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::NotConnected`], [`Error::Closed`] |
//! | Data | [`Error::Decode`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |
//!
//! Most of the client's surface is deliberately non-propagating: dropped
//! sends, unrecognized tags, failed probes, and missing summaries are
//! reported through diagnostics or absent values rather than errors. Only
//! operations where the caller explicitly asks for a state change or for
//! decoded data return this error type.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when an endpoint URL or client setting is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the connection to the Puppet endpoint cannot be
    /// established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection timeout during the WebSocket handshake.
    ///
    /// Returned when the Puppet endpoint does not complete the handshake
    /// within the timeout period.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Operation requires a connection that was never established.
    ///
    /// Returned by [`close`](crate::PuppetConnection::close) when `connect`
    /// was never called. The lifecycle has no handle to shut down, so this is
    /// surfaced as an explicit caller error rather than a silent no-op.
    #[error("Not connected: no connection was ever established")]
    NotConnected,

    /// The connection lifecycle already reached its terminal state.
    ///
    /// Returned by [`connect`](crate::PuppetConnection::connect) after
    /// [`close`](crate::PuppetConnection::close); a closed manager cannot be
    /// reconnected.
    #[error("Connection closed")]
    Closed,

    // ========================================================================
    // Data Errors
    // ========================================================================
    /// Screenshot data could not be decoded.
    ///
    /// Returned when a caller explicitly asks for the raw bytes of a
    /// screenshot whose payload is not valid base64 / data-URI content.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of the decode failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
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

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a decode error.
    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
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
        matches!(self, Self::ConnectionTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::NotConnected
                | Self::Closed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is a caller-side lifecycle error.
    ///
    /// Lifecycle errors indicate the manager was used outside its
    /// `unconnected -> open -> closed` state machine, not a network fault.
    #[inline]
    #[must_use]
    pub fn is_lifecycle_error(&self) -> bool {
        matches!(self, Self::NotConnected | Self::Closed)
    }
}

// ============================================================================
// Tests
// ============================================================================
