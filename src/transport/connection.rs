//! WebSocket connection to the Puppet service.
//!
//! This module owns the single transport handle and its read loop. Inbound
//! tagged messages are handed to the registered message handler in transport
//! delivery order, one invocation per message.
//!
//! # Lifecycle
//!
//! ```text
//! unconnected ──connect()──► open ──close() / remote closure──► closed
//! ```
//!
//! The lifecycle is terminal: a closed manager cannot be reconnected. While
//! open, a second `connect()` replaces the live handle (single-attempt
//! clients re-dialing is permitted). `send` outside the open state transmits
//! nothing and reports the drop through a diagnostic instead of an error.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{from_str, to_string};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, trace, warn};

use crate::config::Endpoints;
use crate::error::{Error, Result};
use crate::protocol::{CaptureRequest, PuppetMessage};

// ============================================================================
// Constants
// ============================================================================

/// Timeout for the WebSocket handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Types
// ============================================================================

/// Client-side WebSocket stream (plain or TLS).
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Message handler callback type.
///
/// Called for each inbound message, in transport delivery order. Wire this to
/// [`dispatch`](crate::dispatch::dispatch) to route messages by tag.
pub type MessageHandler = Box<dyn Fn(&PuppetMessage) + Send + Sync>;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a [`PuppetConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection has been established yet.
    Unconnected,
    /// Handshake completed; the transport is live.
    Open,
    /// Terminal state, reached via explicit close or remote closure.
    Closed,
}

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the read loop.
enum ConnectionCommand {
    /// Transmit a serialized frame.
    Send(String),
    /// Shut the transport down.
    Shutdown,
}

// ============================================================================
// Shared
// ============================================================================

/// State shared between the manager and its read loop.
struct Shared {
    /// Current lifecycle state.
    state: Mutex<ConnectionState>,

    /// Handle generation. A read loop only marks the connection closed if its
    /// generation is still the current one, so a replaced handle's loop
    /// cannot clobber the state of its successor.
    generation: AtomicU64,

    /// Message handler slot.
    handler: Mutex<Option<MessageHandler>>,

    /// Count of sends dropped outside the open state.
    dropped_sends: AtomicU64,
}

// ============================================================================
// PuppetConnection
// ============================================================================

/// Manager for the single WebSocket connection to the Puppet endpoint.
///
/// Exclusively owns the transport handle; all state transitions go through
/// [`connect`](Self::connect), [`send`](Self::send) and
/// [`close`](Self::close). The handle itself is never exposed.
///
/// # Example
///
/// ```ignore
/// use puppet_client::{CaptureRequest, Endpoints, ImageFormat, PuppetConnection};
///
/// let mut connection = PuppetConnection::new(Endpoints::default());
/// connection.connect().await?;
/// connection.send(&CaptureRequest::new(
///     "https://example.com",
///     ImageFormat::jpeg(80),
///     1280,
///     800,
///     "networkidle0",
/// ));
/// connection.close()?;
/// ```
pub struct PuppetConnection {
    /// Endpoint configuration.
    endpoints: Endpoints,

    /// Command channel to the current read loop; `None` until first connect.
    command_tx: Option<mpsc::UnboundedSender<ConnectionCommand>>,

    /// State shared with the read loop.
    shared: Arc<Shared>,
}

impl PuppetConnection {
    /// Creates an unconnected manager for the given endpoints.
    #[must_use]
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            endpoints,
            command_tx: None,
            shared: Arc::new(Shared {
                state: Mutex::new(ConnectionState::Unconnected),
                generation: AtomicU64::new(0),
                handler: Mutex::new(None),
                dropped_sends: AtomicU64::new(0),
            }),
        }
    }

    /// Establishes the WebSocket connection to the Puppet endpoint.
    ///
    /// On success the manager transitions to [`ConnectionState::Open`] and
    /// the read loop starts delivering inbound messages to the registered
    /// handler. Calling `connect` while already open replaces the live
    /// handle with a fresh one.
    ///
    /// # Errors
    ///
    /// - [`Error::Closed`] if the lifecycle already reached its terminal
    ///   state; a closed manager cannot be reconnected.
    /// - [`Error::ConnectionTimeout`] if the handshake does not complete
    ///   within the timeout.
    /// - [`Error::Connection`] if the endpoint cannot be reached or the
    ///   upgrade fails.
    pub async fn connect(&mut self) -> Result<()> {
        if *self.shared.state.lock() == ConnectionState::Closed {
            return Err(Error::Closed);
        }

        let url = self.endpoints.puppet_ws().as_str();
        debug!(url, "Connecting to Puppet endpoint");

        let connect_result = timeout(CONNECT_TIMEOUT, connect_async(url))
            .await
            .map_err(|_| Error::connection_timeout(CONNECT_TIMEOUT.as_millis() as u64))?;

        let (ws_stream, response) =
            connect_result.map_err(|e| Error::connection(e.to_string()))?;

        debug!(status = %response.status(), "WebSocket handshake completed");

        // Replace any live handle: shut the previous loop down and bump the
        // generation so its exit cannot mark the new connection closed.
        if let Some(old_tx) = self.command_tx.take() {
            warn!("Replacing live Puppet connection handle");
            let _ = old_tx.send(ConnectionCommand::Shutdown);
        }
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::run_read_loop(
            ws_stream,
            command_rx,
            Arc::clone(&self.shared),
            generation,
        ));

        self.command_tx = Some(command_tx);
        *self.shared.state.lock() = ConnectionState::Open;

        Ok(())
    }

    /// Sends a capture request over the live connection.
    ///
    /// Outside the open state this transmits nothing: the drop is reported
    /// with exactly one diagnostic (a warning plus the
    /// [`dropped_sends`](Self::dropped_sends) counter) and the call returns
    /// normally. It never panics and never returns an error.
    pub fn send(&self, request: &CaptureRequest) {
        let state = *self.shared.state.lock();
        if state != ConnectionState::Open {
            self.report_dropped_send(state, request);
            return;
        }

        // CaptureRequest has a fixed, serializable shape.
        let json = match to_string(request) {
            Ok(j) => j,
            Err(e) => {
                error!(error = %e, "Failed to serialize capture request");
                return;
            }
        };

        if let Some(ref tx) = self.command_tx
            && tx.send(ConnectionCommand::Send(json)).is_ok()
        {
            trace!(url = %request.url, "Capture request queued");
        } else {
            // Read loop already gone; the state flip to Closed is racing us.
            self.report_dropped_send(ConnectionState::Closed, request);
        }
    }

    /// Closes the connection and transitions to the terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if `connect` was never called: there
    /// is no handle to shut down, which is surfaced as an explicit caller
    /// error rather than a silent no-op. Closing an already-closed manager
    /// is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let Some(ref tx) = self.command_tx else {
            return Err(Error::NotConnected);
        };

        let _ = tx.send(ConnectionCommand::Shutdown);
        *self.shared.state.lock() = ConnectionState::Closed;

        debug!("Puppet connection closed");
        Ok(())
    }

    /// Sets the message handler callback.
    ///
    /// The handler is called once per inbound message, in transport delivery
    /// order, on the read loop.
    pub fn set_message_handler(&self, handler: MessageHandler) {
        let mut guard = self.shared.handler.lock();
        *guard = Some(handler);
    }

    /// Clears the message handler.
    pub fn clear_message_handler(&self) {
        let mut guard = self.shared.handler.lock();
        *guard = None;
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock()
    }

    /// Returns the number of sends dropped outside the open state.
    #[inline]
    #[must_use]
    pub fn dropped_sends(&self) -> u64 {
        self.shared.dropped_sends.load(Ordering::Relaxed)
    }

    /// Emits the single diagnostic for a dropped send.
    fn report_dropped_send(&self, state: ConnectionState, request: &CaptureRequest) {
        self.shared.dropped_sends.fetch_add(1, Ordering::Relaxed);
        warn!(
            ?state,
            url = %request.url,
            "Dropping capture request: connection is not open"
        );
    }

    /// Read loop that handles WebSocket I/O for one handle generation.
    async fn run_read_loop(
        ws_stream: WsStream,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        shared: Arc<Shared>,
        generation: u64,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                // Inbound messages from the Puppet service
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_incoming_message(&text, &shared);
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Commands from the manager
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send(json)) => {
                            if let Err(e) = ws_write.send(Message::Text(json.into())).await {
                                warn!(error = %e, "Failed to send capture request");
                            }
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        // Only the current generation may mark the manager closed; a replaced
        // handle's loop exits without touching its successor's state.
        if shared.generation.load(Ordering::SeqCst) == generation {
            *shared.state.lock() = ConnectionState::Closed;
        }

        debug!(generation, "Read loop terminated");
    }

    /// Handles one inbound text frame from the Puppet service.
    fn handle_incoming_message(text: &str, shared: &Arc<Shared>) {
        let message = match from_str::<PuppetMessage>(text) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, text, "Failed to parse inbound message");
                return;
            }
        };

        let handler = shared.handler.lock();
        if let Some(ref handler) = *handler {
            handler(&message);
        } else {
            trace!(tag = %message.tag, "Inbound message with no handler registered");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use tokio::net::TcpListener;
    use tokio::sync::mpsc::unbounded_channel;

    use crate::protocol::{ImageFormat, ParsedMessage};

    /// Installs a test subscriber so transport diagnostics are visible
    /// under `RUST_LOG`.
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// Binds a localhost listener for a mock Puppet server.
    async fn bind_mock_server() -> (TcpListener, String) {
        init_tracing();
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        let listener = TcpListener::bind(addr).await.expect("bind mock server");
        let port = listener.local_addr().expect("local addr").port();
        (listener, format!("ws://127.0.0.1:{port}/ws/"))
    }

    fn example_request() -> CaptureRequest {
        CaptureRequest::new(
            "https://example.com",
            ImageFormat::jpeg(80),
            1280,
            800,
            "networkidle0",
        )
    }

    #[tokio::test]
    async fn test_send_unconnected_drops_with_diagnostic() {
        let connection = PuppetConnection::new(Endpoints::default());

        connection.send(&example_request());
        connection.send(&example_request());

        // One diagnostic per call, no transmission, no panic
        assert_eq!(connection.dropped_sends(), 2);
        assert_eq!(connection.state(), ConnectionState::Unconnected);
    }

    #[tokio::test]
    async fn test_close_never_connected_is_an_error() {
        let mut connection = PuppetConnection::new(Endpoints::default());

        let result = connection.close();
        assert!(matches!(result, Err(Error::NotConnected)));
        assert_eq!(connection.state(), ConnectionState::Unconnected);
    }

    #[tokio::test]
    async fn test_connect_send_close_lifecycle() {
        let (listener, url) = bind_mock_server().await;

        // Mock server: accept one client, record the first frame
        let (frame_tx, mut frame_rx) = unbounded_channel::<String>();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("ws upgrade");
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                let _ = frame_tx.send(text.to_string());
            }
        });

        let endpoints = Endpoints::default()
            .with_puppet_ws(&url)
            .expect("mock endpoint");
        let mut connection = PuppetConnection::new(endpoints);

        connection.connect().await.expect("connect");
        assert_eq!(connection.state(), ConnectionState::Open);

        connection.send(&example_request());

        let frame = frame_rx.recv().await.expect("server received frame");
        let value: serde_json::Value = serde_json::from_str(&frame).expect("frame is JSON");
        assert_eq!(
            value.get("url").and_then(serde_json::Value::as_str),
            Some("https://example.com")
        );
        assert_eq!(
            value.get("waitForEvent").and_then(serde_json::Value::as_str),
            Some("networkidle0")
        );
        assert_eq!(connection.dropped_sends(), 0);

        connection.close().expect("close");
        assert_eq!(connection.state(), ConnectionState::Closed);

        server.await.expect("mock server");
    }

    #[tokio::test]
    async fn test_send_after_close_drops_with_diagnostic() {
        let (listener, url) = bind_mock_server().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("ws upgrade");
            // Drain until the client goes away
            while let Some(Ok(_)) = ws.next().await {}
        });

        let endpoints = Endpoints::default()
            .with_puppet_ws(&url)
            .expect("mock endpoint");
        let mut connection = PuppetConnection::new(endpoints);

        connection.connect().await.expect("connect");
        connection.close().expect("close");

        connection.send(&example_request());
        assert_eq!(connection.dropped_sends(), 1);

        server.abort();
    }

    #[tokio::test]
    async fn test_connect_after_close_is_an_error() {
        let (listener, url) = bind_mock_server().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("ws upgrade");
            while let Some(Ok(_)) = ws.next().await {}
        });

        let endpoints = Endpoints::default()
            .with_puppet_ws(&url)
            .expect("mock endpoint");
        let mut connection = PuppetConnection::new(endpoints);

        connection.connect().await.expect("connect");
        connection.close().expect("close");

        let result = connection.connect().await;
        assert!(matches!(result, Err(Error::Closed)));

        server.abort();
    }

    #[tokio::test]
    async fn test_connect_unreachable_endpoint_fails() {
        // Bind then drop to get a port with no listener
        let (listener, url) = bind_mock_server().await;
        drop(listener);

        let endpoints = Endpoints::default()
            .with_puppet_ws(&url)
            .expect("mock endpoint");
        let mut connection = PuppetConnection::new(endpoints);

        let result = connection.connect().await;
        assert!(matches!(result, Err(Error::Connection { .. })));
        assert_eq!(connection.state(), ConnectionState::Unconnected);
    }

    #[tokio::test]
    async fn test_inbound_messages_reach_handler_in_order() {
        let (listener, url) = bind_mock_server().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("ws upgrade");

            let first = serde_json::to_string(&PuppetMessage::tracker(
                "Tracker A",
                "https://a.example",
                crate::protocol::TrackerCategory::Advertising,
            ))
            .expect("serialize");
            let second =
                serde_json::to_string(&PuppetMessage::screenshot("data:image/png;base64,AAAA"))
                    .expect("serialize");

            ws.send(Message::Text(first.into())).await.expect("send");
            ws.send(Message::Text(second.into())).await.expect("send");
            ws.close(None).await.expect("close");
        });

        let endpoints = Endpoints::default()
            .with_puppet_ws(&url)
            .expect("mock endpoint");
        let mut connection = PuppetConnection::new(endpoints);

        let (seen_tx, mut seen_rx) = unbounded_channel::<String>();
        connection.set_message_handler(Box::new(move |message| {
            let _ = seen_tx.send(message.tag.clone());
        }));

        connection.connect().await.expect("connect");

        assert_eq!(seen_rx.recv().await.as_deref(), Some("tracker"));
        assert_eq!(seen_rx.recv().await.as_deref(), Some("screenshot"));

        server.await.expect("mock server");
    }

    #[tokio::test]
    async fn test_remote_closure_transitions_to_closed() {
        let (listener, url) = bind_mock_server().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("ws upgrade");
            ws.close(None).await.expect("close");
        });

        let endpoints = Endpoints::default()
            .with_puppet_ws(&url)
            .expect("mock endpoint");
        let mut connection = PuppetConnection::new(endpoints);

        connection.connect().await.expect("connect");
        server.await.expect("mock server");

        // Give the read loop a moment to observe the close frame
        for _ in 0..50 {
            if connection.state() == ConnectionState::Closed {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(connection.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_screenshot_scenario_end_to_end() {
        let (listener, url) = bind_mock_server().await;

        // Mock Puppet: wait for the capture request, reply with a screenshot
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("ws upgrade");

            let Some(Ok(Message::Text(_request))) = ws.next().await else {
                panic!("expected capture request frame");
            };

            let reply =
                serde_json::to_string(&PuppetMessage::screenshot("data:image/jpeg;base64,/9j/4AAQ"))
                    .expect("serialize");
            ws.send(Message::Text(reply.into())).await.expect("send");
        });

        let endpoints = Endpoints::default()
            .with_puppet_ws(&url)
            .expect("mock endpoint");
        let mut connection = PuppetConnection::new(endpoints);

        let (seen_tx, mut seen_rx) = unbounded_channel::<(String, String)>();
        connection.set_message_handler(Box::new(move |message| {
            if let ParsedMessage::Screenshot(data) = message.parse() {
                let _ = seen_tx.send((data, message.tag.clone()));
            }
        }));

        connection.connect().await.expect("connect");
        connection.send(&example_request());

        let (data, raw_tag) = seen_rx.recv().await.expect("screenshot dispatched");
        assert_eq!(data, "data:image/jpeg;base64,/9j/4AAQ");
        assert_eq!(raw_tag, "screenshot");

        server.await.expect("mock server");
    }
}
