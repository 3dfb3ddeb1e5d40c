//! WebSocket connection and event loop.
//!
//! This module handles the WebSocket connection to the node, including
//! token-authenticated dialing, reconnection, and request/response
//! correlation.
//!
//! # Connection Task
//!
//! [`WsTransport::connect`] spawns a tokio task that handles:
//!
//! - Dialing the node with the current token digest
//! - Re-dialing after a refused handshake or a dropped socket
//! - Outgoing requests from the Rust API
//! - Request/response correlation by JSON-RPC id

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Value, from_str, to_string};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{Method, Request, Response};

use super::Transport;
use super::auth;

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for a request round trip.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum pending requests before rejecting new ones.
const MAX_PENDING_REQUESTS: usize = 100;

/// Timeout for the WebSocket handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Delay before re-dialing after a failed or dropped connection.
const RECONNECT_DELAY: Duration = Duration::from_millis(500);

// ============================================================================
// Types
// ============================================================================

/// Map of request IDs to response channels.
type CorrelationMap = FxHashMap<RequestId, oneshot::Sender<Result<Response>>>;

/// Client WebSocket stream.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of the client WebSocket stream.
type WsSink = SplitSink<WsStream, Message>;

/// Token plus a counter bumped on every replacement.
///
/// A dial started under an older generation is discarded.
#[derive(Debug, Clone, Default)]
struct Credentials {
    token: String,
    generation: u64,
}

/// State shared between the handles and the connection task.
struct Shared {
    /// Node endpoint.
    url: Url,
    /// Current token.
    credentials: Mutex<Credentials>,
    /// Handshake with the current token completed.
    connected: AtomicBool,
    /// Error that ended the last attempt.
    last_error: Mutex<Option<Arc<Error>>>,
    /// In-flight requests.
    correlation: Mutex<CorrelationMap>,
}

impl Shared {
    fn new(url: Url, token: String) -> Self {
        Self {
            url,
            credentials: Mutex::new(Credentials {
                token,
                generation: 0,
            }),
            connected: AtomicBool::new(false),
            last_error: Mutex::new(None),
            correlation: Mutex::new(CorrelationMap::default()),
        }
    }

    fn generation(&self) -> u64 {
        self.credentials.lock().generation
    }

    /// Installs a new token and invalidates any dial made with the old one.
    fn replace_token(&self, token: &str) {
        {
            let mut credentials = self.credentials.lock();
            credentials.token = token.to_string();
            credentials.generation += 1;
            self.connected.store(false, Ordering::SeqCst);
        }

        *self.last_error.lock() = None;
    }

    /// Marks the socket dialed under `generation` as live.
    ///
    /// Returns `false` if the token was replaced since the dial started.
    fn mark_connected(&self, generation: u64) -> bool {
        let credentials = self.credentials.lock();
        if credentials.generation != generation {
            return false;
        }

        *self.last_error.lock() = None;
        self.connected.store(true, Ordering::SeqCst);
        true
    }

    fn mark_failed(&self, generation: u64, error: Error) {
        self.connected.store(false, Ordering::SeqCst);

        // A token swap already cleared the error; keep it clear.
        if self.generation() == generation {
            *self.last_error.lock() = Some(Arc::new(error));
        }
    }
}

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the connection task.
enum ConnectionCommand {
    /// Send a request and wait for response.
    Send {
        request: Request,
        response_tx: oneshot::Sender<Result<Response>>,
    },
    /// Remove a timed-out correlation entry.
    RemoveCorrelation(RequestId),
    /// The token changed; re-dial.
    Reconnect,
    /// Shutdown the connection.
    Shutdown,
}

/// Why an established connection's event loop ended.
enum LoopExit {
    /// Socket closed or failed.
    Closed(Error),
    /// Token changed; re-dial now.
    Reconnect,
    /// Shutdown requested or every handle dropped.
    Shutdown,
}

// ============================================================================
// WsTransport
// ============================================================================

/// WebSocket transport to the node's signer port.
///
/// Handles token-authenticated dialing, reconnection and request/response
/// correlation. The transport spawns an internal connection task.
///
/// # Thread Safety
///
/// `WsTransport` is `Send + Sync` and cheap to clone.
/// All operations are non-blocking.
#[derive(Clone)]
pub struct WsTransport {
    /// Channel for sending commands to the connection task.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// State shared with the connection task.
    shared: Arc<Shared>,
}

impl fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsTransport")
            .field("url", &self.shared.url.as_str())
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl WsTransport {
    /// Opens a transport to `endpoint`, authenticating with `token`.
    ///
    /// Returns immediately; the handshake runs on a spawned task and its
    /// outcome is observed through [`Transport::is_connected`] and
    /// [`Transport::last_error`]. Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `endpoint` is not a `ws://` or `wss://` URL.
    pub fn connect(endpoint: &str, token: impl Into<String>) -> Result<Self> {
        let url = parse_endpoint(endpoint)?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared::new(url, token.into()));

        tokio::spawn(Self::run(Arc::clone(&shared), command_rx));

        Ok(Self { command_tx, shared })
    }

    /// Returns the endpoint this transport dials.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.shared.url
    }

    /// Sends a request and waits for response with default timeout (30s).
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if connection is closed
    /// - [`Error::RequestTimeout`] if response not received within timeout
    /// - [`Error::Protocol`] if too many pending requests
    pub async fn send(&self, request: Request) -> Result<Response> {
        self.send_with_timeout(request, DEFAULT_COMMAND_TIMEOUT)
            .await
    }

    /// Sends a request and waits for response with custom timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if connection is closed
    /// - [`Error::RequestTimeout`] if response not received within timeout
    /// - [`Error::Protocol`] if too many pending requests
    pub async fn send_with_timeout(
        &self,
        request: Request,
        request_timeout: Duration,
    ) -> Result<Response> {
        if !self.is_connected() {
            return Err(Error::ConnectionClosed);
        }

        let request_id = request.id;

        {
            let correlation = self.shared.correlation.lock();
            if correlation.len() >= MAX_PENDING_REQUESTS {
                warn!(
                    pending = correlation.len(),
                    max = MAX_PENDING_REQUESTS,
                    "Too many pending requests"
                );
                return Err(Error::protocol(format!(
                    "Too many pending requests: {}/{}",
                    correlation.len(),
                    MAX_PENDING_REQUESTS
                )));
            }
        }

        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(ConnectionCommand::Send {
                request,
                response_tx,
            })
            .map_err(|_| Error::ConnectionClosed)?;

        match timeout(request_timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                let _ = self
                    .command_tx
                    .send(ConnectionCommand::RemoveCorrelation(request_id));

                Err(Error::request_timeout(
                    request_id,
                    request_timeout.as_millis() as u64,
                ))
            }
        }
    }

    /// Returns the number of pending requests.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.correlation.lock().len()
    }
}

// ============================================================================
// WsTransport - Transport
// ============================================================================

#[async_trait]
impl Transport for WsTransport {
    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    fn last_error(&self) -> Option<Arc<Error>> {
        self.shared.last_error.lock().clone()
    }

    fn token(&self) -> String {
        self.shared.credentials.lock().token.clone()
    }

    fn update_token(&self, token: &str) {
        self.shared.replace_token(token);

        let _ = self.command_tx.send(ConnectionCommand::Reconnect);
    }

    async fn execute(&self, method: Method) -> Result<Value> {
        let name = method.name();
        let response = self.send(Request::new(method)).await?;

        trace!(method = name, "RPC response received");
        response.into_result()
    }

    fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }
}

// ============================================================================
// Connection Task
// ============================================================================

impl WsTransport {
    /// Dials, serves and re-dials until shutdown.
    async fn run(shared: Arc<Shared>, mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>) {
        loop {
            let Credentials { token, generation } = shared.credentials.lock().clone();

            match Self::open(&shared.url, &token).await {
                Ok(ws_stream) => {
                    if !shared.mark_connected(generation) {
                        debug!("Token changed during handshake, re-dialing");
                        continue;
                    }
                    info!(url = %shared.url, "WebSocket connection established");

                    let exit = Self::run_event_loop(ws_stream, &mut command_rx, &shared, generation)
                        .await;

                    shared.connected.store(false, Ordering::SeqCst);
                    Self::fail_pending_requests(&shared);

                    match exit {
                        LoopExit::Shutdown => break,
                        LoopExit::Reconnect => continue,
                        LoopExit::Closed(error) => {
                            debug!(error = %error, "WebSocket connection lost");
                            shared.mark_failed(generation, error);
                        }
                    }
                }

                Err(error) => {
                    debug!(error = %error, "WebSocket handshake failed");
                    shared.mark_failed(generation, error);
                }
            }

            if !Self::wait_reconnect(&mut command_rx).await {
                break;
            }
        }

        Self::fail_pending_requests(&shared);
        debug!("Connection task terminated");
    }

    /// Performs the WebSocket handshake presenting the token digest.
    async fn open(url: &Url, token: &str) -> Result<WsStream> {
        let mut request = url.as_str().into_client_request()?;
        let protocol = auth::protocol_header(token, auth::unix_now());
        let value = HeaderValue::from_str(&protocol)
            .map_err(|e| Error::protocol(format!("Invalid handshake header: {e}")))?;
        request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);

        let (ws_stream, _) = timeout(HANDSHAKE_TIMEOUT, connect_async(request))
            .await
            .map_err(|_| Error::connection("WebSocket handshake timed out"))??;

        Ok(ws_stream)
    }

    /// Waits out the reconnect delay while disconnected.
    ///
    /// Returns `false` if the task should stop.
    async fn wait_reconnect(
        command_rx: &mut mpsc::UnboundedReceiver<ConnectionCommand>,
    ) -> bool {
        let delay = sleep(RECONNECT_DELAY);
        tokio::pin!(delay);

        loop {
            tokio::select! {
                _ = &mut delay => return true,

                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send { response_tx, .. }) => {
                            let _ = response_tx.send(Err(Error::ConnectionClosed));
                        }
                        Some(ConnectionCommand::RemoveCorrelation(_)) => {}
                        Some(ConnectionCommand::Reconnect) => return true,
                        Some(ConnectionCommand::Shutdown) | None => return false,
                    }
                }
            }
        }
    }

    /// Event loop that handles WebSocket I/O for one connection.
    async fn run_event_loop(
        ws_stream: WsStream,
        command_rx: &mut mpsc::UnboundedReceiver<ConnectionCommand>,
        shared: &Shared,
        generation: u64,
    ) -> LoopExit {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_incoming_message(&text, shared);
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            return LoopExit::Closed(Error::ConnectionClosed);
                        }

                        Some(Err(e)) => {
                            warn!(error = %e, "WebSocket error");
                            return LoopExit::Closed(Error::WebSocket(e));
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            return LoopExit::Closed(Error::ConnectionClosed);
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send { request, response_tx }) => {
                            Self::handle_send_command(request, response_tx, &mut ws_write, shared)
                                .await;
                        }

                        Some(ConnectionCommand::RemoveCorrelation(request_id)) => {
                            shared.correlation.lock().remove(&request_id);
                            debug!(%request_id, "Removed timed-out correlation");
                        }

                        Some(ConnectionCommand::Reconnect) => {
                            if shared.generation() != generation {
                                debug!("Token updated, re-dialing");
                                let _ = ws_write.close().await;
                                return LoopExit::Reconnect;
                            }
                        }

                        Some(ConnectionCommand::Shutdown) | None => {
                            debug!("Shutdown requested");
                            let _ = ws_write.close().await;
                            return LoopExit::Shutdown;
                        }
                    }
                }
            }
        }
    }

    /// Routes a text frame from the node to its waiting caller.
    fn handle_incoming_message(text: &str, shared: &Shared) {
        let response = match from_str::<Response>(text) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, text = %text, "Failed to parse incoming message");
                return;
            }
        };

        let Some(id) = response.id else {
            trace!(text = %text, "Ignoring notification");
            return;
        };

        let tx = shared.correlation.lock().remove(&id);

        if let Some(tx) = tx {
            let _ = tx.send(Ok(response));
        } else {
            warn!(%id, "Response for unknown request");
        }
    }

    /// Handles a send command from the Rust API.
    async fn handle_send_command(
        request: Request,
        response_tx: oneshot::Sender<Result<Response>>,
        ws_write: &mut WsSink,
        shared: &Shared,
    ) {
        let request_id = request.id;

        let json = match to_string(&request) {
            Ok(j) => j,
            Err(e) => {
                let _ = response_tx.send(Err(Error::Json(e)));
                return;
            }
        };

        // Store correlation before sending
        shared.correlation.lock().insert(request_id, response_tx);

        if let Err(e) = ws_write.send(Message::Text(json.into())).await {
            if let Some(tx) = shared.correlation.lock().remove(&request_id) {
                let _ = tx.send(Err(Error::connection(e.to_string())));
            }
        }

        trace!(%request_id, method = request.method.name(), "Request sent");
    }

    /// Fails all pending requests with ConnectionClosed error.
    fn fail_pending_requests(shared: &Shared) {
        let pending: Vec<_> = shared.correlation.lock().drain().collect();
        let count = pending.len();

        for (_, tx) in pending {
            let _ = tx.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending requests on disconnect");
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Validates a node endpoint.
pub(crate) fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint)
        .map_err(|e| Error::config(format!("Invalid endpoint '{endpoint}': {e}")))?;

    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(Error::config(format!(
            "Unsupported endpoint scheme '{}', expected ws:// or wss://",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(Error::config(format!("Endpoint '{endpoint}' has no host")));
    }

    Ok(url)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::SocketAddr;

    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_hdr_async;
    use tokio_tungstenite::tungstenite::handshake::server::{
        ErrorResponse, Request as HandshakeRequest, Response as HandshakeResponse,
    };
    use tokio_tungstenite::tungstenite::http::StatusCode;

    use crate::protocol::ParityMethod;

    /// Accepts connections authenticated with `token` and answers
    /// `parity_dappsPort` with 8080; everything else gets an error object.
    async fn spawn_node(token: &'static str) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let callback = |request: &HandshakeRequest,
                                    mut response: HandshakeResponse|
                     -> std::result::Result<HandshakeResponse, ErrorResponse> {
                        let header = request
                            .headers()
                            .get(SEC_WEBSOCKET_PROTOCOL)
                            .cloned();

                        match header {
                            Some(value)
                                if auth::verify_protocol_header(
                                    value.to_str().unwrap_or_default(),
                                    token,
                                ) =>
                            {
                                response.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
                                Ok(response)
                            }
                            _ => {
                                let mut refusal = ErrorResponse::new(None);
                                *refusal.status_mut() = StatusCode::FORBIDDEN;
                                Err(refusal)
                            }
                        }
                    };

                    let Ok(mut ws) = accept_hdr_async(stream, callback).await else {
                        return;
                    };

                    while let Some(Ok(message)) = ws.next().await {
                        let Message::Text(text) = message else {
                            continue;
                        };
                        let request: Value = from_str(&text).expect("request json");
                        let reply = if request["method"] == "parity_dappsPort" {
                            serde_json::json!({"jsonrpc": "2.0", "id": request["id"], "result": 8080})
                        } else {
                            serde_json::json!({
                                "jsonrpc": "2.0",
                                "id": request["id"],
                                "error": {"code": -32601, "message": "Method not found"}
                            })
                        };
                        let _ = ws.send(Message::Text(reply.to_string().into())).await;
                    }
                });
            }
        });

        addr
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        timeout(Duration::from_secs(5), async {
            while !condition() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_COMMAND_TIMEOUT.as_secs(), 30);
        assert_eq!(MAX_PENDING_REQUESTS, 100);
        assert_eq!(RECONNECT_DELAY.as_millis(), 500);
    }

    #[test]
    fn test_parse_endpoint() {
        assert!(parse_endpoint("ws://127.0.0.1:8180").is_ok());
        assert_eq!(
            parse_endpoint("wss://node.example:8180")
                .expect("wss accepted")
                .scheme(),
            "wss"
        );
        assert!(matches!(
            parse_endpoint("http://127.0.0.1:8180"),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            parse_endpoint("not a url"),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_stale_dial_is_not_marked_connected() {
        let shared = Shared::new(
            parse_endpoint("ws://127.0.0.1:8180").expect("endpoint"),
            "oldtoken".to_string(),
        );
        let dialed_with = shared.generation();

        shared.replace_token("newtoken");

        assert!(!shared.mark_connected(dialed_with));
        assert!(!shared.connected.load(Ordering::SeqCst));
        assert_eq!(shared.credentials.lock().token, "newtoken");

        assert!(shared.mark_connected(shared.generation()));
        assert!(shared.connected.load(Ordering::SeqCst));
    }

    #[test]
    fn test_stale_failure_keeps_error_clear() {
        let shared = Shared::new(
            parse_endpoint("ws://127.0.0.1:8180").expect("endpoint"),
            "oldtoken".to_string(),
        );
        let dialed_with = shared.generation();

        shared.replace_token("newtoken");
        shared.mark_failed(dialed_with, Error::connection("403 Forbidden"));
        assert!(shared.last_error.lock().is_none());

        shared.mark_failed(shared.generation(), Error::connection("403 Forbidden"));
        assert!(shared.last_error.lock().is_some());
    }

    #[tokio::test]
    async fn test_connects_with_valid_token() {
        let addr = spawn_node("goodtoken").await;
        let transport =
            WsTransport::connect(&format!("ws://{addr}"), "goodtoken").expect("connect");

        wait_until(|| transport.is_connected()).await;
        assert!(transport.last_error().is_none());

        let port = transport
            .execute(ParityMethod::DappsPort.into())
            .await
            .expect("dapps port");
        assert_eq!(port, Value::from(8080));

        let err = transport
            .execute(ParityMethod::SignerPort.into())
            .await
            .expect_err("unknown method");
        assert!(matches!(err, Error::Rpc { code: -32601, .. }));
        assert_eq!(transport.pending_count(), 0);

        transport.shutdown();
    }

    #[tokio::test]
    async fn test_refused_token_sets_last_error() {
        let addr = spawn_node("goodtoken").await;
        let transport = WsTransport::connect(&format!("ws://{addr}"), "badtoken").expect("connect");

        wait_until(|| transport.last_error().is_some()).await;
        assert!(!transport.is_connected());

        let err = transport
            .execute(ParityMethod::DappsPort.into())
            .await
            .expect_err("not connected");
        assert!(matches!(err, Error::ConnectionClosed));

        transport.update_token("goodtoken");
        assert!(transport.last_error().is_none());
        assert_eq!(transport.token(), "goodtoken");

        wait_until(|| transport.is_connected()).await;
        transport.shutdown();
    }
}
