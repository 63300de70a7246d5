//! Wire protocol message types.
//!
//! This module defines the message formats exchanged with the Puppet
//! rendering service.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------------|----------------|------------------------------|
//! | [`CaptureRequest`] | Local → Remote | Render-and-capture request |
//! | [`PuppetMessage`] | Remote → Local | Tagged result envelope |
//!
//! Outbound frames carry one [`CaptureRequest`]; the service replies
//! asynchronously over the same connection with [`PuppetMessage`] envelopes
//! whose `type` tag selects the payload shape.
//!
//! # Modules
//!
//! | Module | Description |
//! |-----------|-----------------------------------------|
//! | `message` | Inbound tagged envelopes and payloads |
//! | `request` | Outbound capture request |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound tagged message types.
pub mod message;

/// Outbound capture request types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{ParsedMessage, PuppetMessage, Tag, Tracker, TrackerCategory};
pub use request::{CaptureRequest, ImageFormat};
