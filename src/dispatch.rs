//! Tag-based message dispatch.
//!
//! Routes an inbound [`PuppetMessage`] to the caller-supplied handler for its
//! tag. Callers register only the handlers they care about; messages with an
//! unrecognized tag or no registered handler are dropped silently.
//!
//! Each handler receives the decoded payload together with the raw envelope,
//! so callers that need the undecoded form (logging, replay) still have it.
//!
//! ```ignore
//! use puppet_client::{MessageHandlers, dispatch};
//!
//! let handlers = MessageHandlers::new()
//!     .on_tracker(|tracker, _raw| println!("tracker: {}", tracker.name))
//!     .on_screenshot(|data, _raw| println!("{} bytes of image data", data.len()));
//!
//! dispatch(&message, &handlers);
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::trace;

use crate::protocol::{ParsedMessage, PuppetMessage, Tracker};

// ============================================================================
// Handler Types
// ============================================================================

/// Handler for `tracker` messages.
pub type TrackerHandler = Box<dyn Fn(&Tracker, &PuppetMessage) + Send + Sync>;

/// Handler for `screenshot` messages.
pub type ScreenshotHandler = Box<dyn Fn(&str, &PuppetMessage) + Send + Sync>;

/// Handler for opaque `error` / `close` payloads.
pub type OpaqueHandler = Box<dyn Fn(&Value, &PuppetMessage) + Send + Sync>;

// ============================================================================
// MessageHandlers
// ============================================================================

/// A set of named callbacks, one optional slot per known tag.
///
/// All slots default to unregistered; a message for an empty slot is dropped
/// without error.
#[derive(Default)]
pub struct MessageHandlers {
    tracker: Option<TrackerHandler>,
    screenshot: Option<ScreenshotHandler>,
    error: Option<OpaqueHandler>,
    close: Option<OpaqueHandler>,
}

impl MessageHandlers {
    /// Creates an empty handler set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the `tracker` handler.
    #[must_use]
    pub fn on_tracker(mut self, handler: impl Fn(&Tracker, &PuppetMessage) + Send + Sync + 'static) -> Self {
        self.tracker = Some(Box::new(handler));
        self
    }

    /// Registers the `screenshot` handler.
    ///
    /// The handler receives the raw data string (image URI or raw data)
    /// exactly as transmitted.
    #[must_use]
    pub fn on_screenshot(mut self, handler: impl Fn(&str, &PuppetMessage) + Send + Sync + 'static) -> Self {
        self.screenshot = Some(Box::new(handler));
        self
    }

    /// Registers the `error` handler.
    ///
    /// The payload is forwarded verbatim; the client does not interpret it.
    #[must_use]
    pub fn on_error(mut self, handler: impl Fn(&Value, &PuppetMessage) + Send + Sync + 'static) -> Self {
        self.error = Some(Box::new(handler));
        self
    }

    /// Registers the `close` handler.
    ///
    /// The payload is forwarded verbatim; the client does not interpret it.
    #[must_use]
    pub fn on_close(mut self, handler: impl Fn(&Value, &PuppetMessage) + Send + Sync + 'static) -> Self {
        self.close = Some(Box::new(handler));
        self
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Routes one inbound message to the handler registered for its tag.
///
/// At most one handler is invoked per message. Unrecognized tags and tags
/// without a registered handler are dropped silently; callers must treat
/// such messages as ignored.
pub fn dispatch(message: &PuppetMessage, handlers: &MessageHandlers) {
    match message.parse() {
        ParsedMessage::Tracker(tracker) => {
            if let Some(ref handler) = handlers.tracker {
                handler(&tracker, message);
            } else {
                trace!(tag = "tracker", "No handler registered, message dropped");
            }
        }

        ParsedMessage::Screenshot(data) => {
            if let Some(ref handler) = handlers.screenshot {
                handler(&data, message);
            } else {
                trace!(tag = "screenshot", "No handler registered, message dropped");
            }
        }

        ParsedMessage::Error(payload) => {
            if let Some(ref handler) = handlers.error {
                handler(&payload, message);
            } else {
                trace!(tag = "error", "No handler registered, message dropped");
            }
        }

        ParsedMessage::Close(payload) => {
            if let Some(ref handler) = handlers.close {
                handler(&payload, message);
            } else {
                trace!(tag = "close", "No handler registered, message dropped");
            }
        }

        ParsedMessage::Unknown { tag, .. } => {
            trace!(%tag, "Unrecognized tag, message dropped");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
