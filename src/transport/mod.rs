//! WebSocket transport layer.
//!
//! This module owns the client side of the persistent connection to the
//! Puppet rendering service.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                              ┌─────────────────┐
//! │  Host app (Rust) │                              │  Puppet service │
//! │                  │          WebSocket           │                 │
//! │ PuppetConnection │◄────────────────────────────►│  Remote browser │
//! │  + read loop     │   wss://…/ws/ (one session)  │  renderer       │
//! └──────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. [`PuppetConnection::new`] - unconnected manager with endpoint config
//! 2. [`PuppetConnection::connect`] - dial and upgrade, spawn the read loop
//! 3. [`PuppetConnection::send`] - serialize and transmit capture requests
//! 4. Inbound tagged messages are delivered to the registered handler in
//!    transport order
//! 5. [`PuppetConnection::close`] - terminal shutdown (no reconnect)

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and read loop.
pub mod connection;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{ConnectionState, MessageHandler, PuppetConnection};
