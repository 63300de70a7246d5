//! HTTP client for the summarizer endpoint.
//!
//! The summarizer is a stateless one-shot service: a single POST with `url`
//! and `language` query parameters and no body, answered with the summary as
//! plain text. Missing summaries are tolerated silently; every failure mode
//! (network, status, body) surfaces as an absent result with a diagnostic,
//! never as an error.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::config::Endpoints;
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// TCP connect timeout for the summarizer request.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(8);

/// End-to-end timeout for the summarizer request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default summary language.
const DEFAULT_LANGUAGE: &str = "en";

// ============================================================================
// SummarizerClient
// ============================================================================

/// Client for the stateless summarization endpoint.
///
/// # Example
///
/// ```ignore
/// use puppet_client::{Endpoints, SummarizerClient};
///
/// let client = SummarizerClient::new(Endpoints::default())?;
/// if let Some(summary) = client.summarize("https://example.com", "en").await {
///     println!("{summary}");
/// }
/// ```
#[derive(Clone)]
pub struct SummarizerClient {
    /// Endpoint configuration.
    endpoints: Endpoints,

    /// Shared HTTP client with connect/request timeouts.
    http: Client,
}

impl SummarizerClient {
    /// Creates a client for the given endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(endpoints: Endpoints) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { endpoints, http })
    }

    /// Requests a summary of `website` in the given language.
    ///
    /// Issues one POST with `url` and `language` query parameters and no
    /// body. Returns `None` when the call fails, the endpoint answers with a
    /// non-success status, or the body is empty; a warning diagnostic is
    /// emitted in each case.
    pub async fn summarize(&self, website: &str, language: &str) -> Option<String> {
        let endpoint = self.endpoints.summarizer().clone();

        let response = self
            .http
            .post(endpoint)
            .query(&[("url", website), ("language", language)])
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(website, error = %e, "Summarizer request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(website, status = %response.status(), "Summarizer returned an error status");
            return None;
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                warn!(website, error = %e, "Failed to read summarizer response body");
                return None;
            }
        };

        if body.is_empty() {
            debug!(website, "Summarizer returned an empty body");
            return None;
        }

        Some(body)
    }

    /// Requests a summary in the default language (`en`).
    pub async fn summarize_en(&self, website: &str) -> Option<String> {
        self.summarize(website, DEFAULT_LANGUAGE).await
    }
}

// ============================================================================
// Tests
// ============================================================================
