//! Puppet client - adapter for off-device page rendering.
//!
//! This library lets a host application talk to two remote services: a
//! stateless HTTP summarization endpoint, and the stateful Puppet WebSocket
//! service that renders webpages off-device and streams back tagged results
//! (trackers detected on the page and screenshots).
//!
//! # Architecture
//!
//! The client follows a single-session request/response-stream model:
//!
//! - **Outbound**: one [`CaptureRequest`] per page, serialized over the
//!   WebSocket by [`PuppetConnection`]
//! - **Inbound**: tagged [`PuppetMessage`] envelopes, delivered in transport
//!   order and routed by [`dispatch`](dispatch::dispatch) to the callbacks
//!   the caller registered
//!
//! Key design principles:
//!
//! - One connection manager owns the transport handle; all state transitions
//!   go through `connect`/`send`/`close`
//! - Tagged payloads decode into a closed sum type; unrecognized tags flow
//!   through as ignored messages, never as errors
//! - Permissive degradation: dropped sends, failed probes, and missing
//!   summaries are diagnostics or absent values, not propagated errors
//!
//! # Quick Start
//!
//! ```no_run
//! use puppet_client::{
//!     CaptureRequest, Endpoints, ImageFormat, MessageHandlers, PuppetConnection, Result,
//!     dispatch,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let handlers = Arc::new(
//!         MessageHandlers::new()
//!             .on_tracker(|tracker, _raw| println!("tracker: {}", tracker.name))
//!             .on_screenshot(|data, _raw| println!("screenshot: {} chars", data.len())),
//!     );
//!
//!     let mut connection = PuppetConnection::new(Endpoints::default());
//!     let dispatch_handlers = Arc::clone(&handlers);
//!     connection.set_message_handler(Box::new(move |message| {
//!         dispatch(message, &dispatch_handlers);
//!     }));
//!
//!     connection.connect().await?;
//!     connection.send(&CaptureRequest::new(
//!         "https://example.com",
//!         ImageFormat::jpeg(80),
//!         1280,
//!         800,
//!         "networkidle0",
//!     ));
//!
//!     // ... receive tagged results through the handlers ...
//!
//!     connection.close()?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------------|----------------------------------------------------|
//! | [`config`] | Immutable endpoint configuration |
//! | [`dispatch`] | Tag-based routing of inbound messages |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`probe`] | Screenshot values and the image validity probe |
//! | [`protocol`] | Wire message types (envelopes, capture requests) |
//! | [`summarizer`] | One-shot HTTP summarization client |
//! | [`transport`] | WebSocket connection manager and read loop |

// ============================================================================
// Modules
// ============================================================================

/// Immutable endpoint configuration.
pub mod config;

/// Tag-based routing of inbound messages to caller-supplied callbacks.
pub mod dispatch;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Screenshot values and the asynchronous image validity probe.
pub mod probe;

/// Wire protocol message types.
pub mod protocol;

/// HTTP client for the summarizer endpoint.
pub mod summarizer;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration
pub use config::{Endpoints, PUPPET_WS_URL, SUMMARIZER_URL};

// Dispatch
pub use dispatch::{MessageHandlers, dispatch};

// Error types
pub use error::{Error, Result};

// Screenshot values
pub use probe::{Screenshot, probe_image};

// Protocol types
pub use protocol::{
    CaptureRequest, ImageFormat, ParsedMessage, PuppetMessage, Tag, Tracker, TrackerCategory,
};

// Summarizer
pub use summarizer::SummarizerClient;

// Transport
pub use transport::{ConnectionState, MessageHandler, PuppetConnection};
