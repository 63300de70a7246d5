//! Service endpoint configuration.
//!
//! The client talks to two fixed, well-known endpoints. Their URLs are
//! process-wide configuration with no runtime mutation, represented here as
//! an immutable [`Endpoints`] value rather than global state.
//!
//! [`Endpoints::default()`] points at the production services; the `with_*`
//! builders exist so tests can redirect the client to local mock servers.

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Well-known Puppet WebSocket endpoint.
pub const PUPPET_WS_URL: &str = "wss://browse.dev.swisscows.com/ws/";

/// Well-known summarizer HTTP endpoint.
pub const SUMMARIZER_URL: &str = "https://summarizer.dev.swisscows.com/summarize";

// ============================================================================
// Endpoints
// ============================================================================

/// Immutable endpoint configuration for the two remote services.
///
/// # Example
///
/// ```ignore
/// use puppet_client::Endpoints;
///
/// // Production endpoints
/// let endpoints = Endpoints::default();
///
/// // Redirected to a local mock (tests)
/// let endpoints = Endpoints::default()
///     .with_puppet_ws("ws://127.0.0.1:9222/ws/")?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// WebSocket URL of the Puppet rendering service.
    puppet_ws: Url,

    /// HTTP URL of the summarizer service.
    summarizer: Url,
}

impl Default for Endpoints {
    fn default() -> Self {
        // The well-known constants are valid URLs; parsing them cannot fail.
        Self {
            puppet_ws: Url::parse(PUPPET_WS_URL).expect("valid Puppet endpoint constant"),
            summarizer: Url::parse(SUMMARIZER_URL).expect("valid summarizer endpoint constant"),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl Endpoints {
    /// Creates the default (production) endpoint configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with a different Puppet WebSocket URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `url` is not a valid `ws://` or `wss://`
    /// URL.
    pub fn with_puppet_ws(mut self, url: impl AsRef<str>) -> Result<Self> {
        let url = parse_endpoint(url.as_ref(), &["ws", "wss"])?;
        self.puppet_ws = url;
        Ok(self)
    }

    /// Returns a copy with a different summarizer URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `url` is not a valid `http://` or
    /// `https://` URL.
    pub fn with_summarizer(mut self, url: impl AsRef<str>) -> Result<Self> {
        let url = parse_endpoint(url.as_ref(), &["http", "https"])?;
        self.summarizer = url;
        Ok(self)
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl Endpoints {
    /// Returns the Puppet WebSocket URL.
    #[inline]
    #[must_use]
    pub fn puppet_ws(&self) -> &Url {
        &self.puppet_ws
    }

    /// Returns the summarizer URL.
    #[inline]
    #[must_use]
    pub fn summarizer(&self) -> &Url {
        &self.summarizer
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Parses an endpoint URL and checks its scheme against the allowed set.
fn parse_endpoint(url: &str, schemes: &[&str]) -> Result<Url> {
    let parsed =
        Url::parse(url).map_err(|e| Error::config(format!("invalid endpoint URL {url}: {e}")))?;

    if !schemes.contains(&parsed.scheme()) {
        return Err(Error::config(format!(
            "unsupported scheme {} for endpoint {url} (expected one of {schemes:?})",
            parsed.scheme()
        )));
    }

    Ok(parsed)
}

// ============================================================================
// Tests
// ============================================================================
