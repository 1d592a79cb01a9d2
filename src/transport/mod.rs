//! Server-Sent Events transport for the MCP HTTP+SSE protocol (2024-11-05).
//!
//! A transport owns the outbound half of one SSE response. Clients open the
//! stream with `GET /sse`, learn their posting endpoint from the first
//! `endpoint` event, and POST JSON-RPC messages there. Responses travel back
//! over the stream as `message` events.

pub mod registry;

use std::{
    convert::Infallible,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, OnceLock, PoisonError,
    },
};

use async_stream::stream;
use async_trait::async_trait;
use axum::{
    body::Bytes,
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

pub use registry::{CloseSummary, TransportRegistry};

/// Server-generated identifier of one open transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport already started")]
    AlreadyStarted,
    #[error("sse connection not established")]
    NotStarted,
    #[error("transport is closed")]
    Closed,
    #[error("server is shutting down")]
    ShuttingDown,
    #[error("session {0} is already registered")]
    DuplicateSession(SessionId),
    #[error("failed to encode outbound message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("message handler failed: {0}")]
    Handler(String),
}

/// Receives the messages posted to one transport.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Returns the reply to push over the stream, if any.
    async fn on_message(&self, message: Value) -> Result<Option<Value>, TransportError>;

    async fn on_close(&self) -> Result<(), TransportError>;
}

/// The protocol engine a freshly opened transport is handed to.
#[async_trait]
pub trait ProtocolServer: Send + Sync {
    async fn connect(&self, transport: Arc<SseTransport>) -> Result<(), TransportError>;
}

pub struct SseTransport {
    session_id: SessionId,
    endpoint: String,
    outbound: Mutex<Option<UnboundedSender<Event>>>,
    handler: OnceLock<Arc<dyn MessageHandler>>,
    closed: AtomicBool,
    finalized: AtomicBool,
    close_notifier: UnboundedSender<SessionId>,
}

impl SseTransport {
    /// `endpoint` is the path clients POST to; the session id is appended as
    /// the `sessionId` query parameter.
    pub fn new(
        endpoint: impl Into<String>,
        close_notifier: UnboundedSender<SessionId>,
    ) -> (Arc<Self>, EventStream) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            session_id: SessionId::new(),
            endpoint: endpoint.into(),
            outbound: Mutex::new(Some(sender)),
            handler: OnceLock::new(),
            closed: AtomicBool::new(false),
            finalized: AtomicBool::new(false),
            close_notifier,
        });

        let events = EventStream {
            receiver,
            guard: DisconnectGuard {
                transport: transport.clone(),
            },
        };

        (transport, events)
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Installs the inbound handler and announces the posting endpoint.
    pub fn start(&self, handler: Arc<dyn MessageHandler>) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        self.handler
            .set(handler)
            .map_err(|_| TransportError::AlreadyStarted)?;

        let endpoint = format!("{}?sessionId={}", self.endpoint, self.session_id);
        self.send(Event::default().event("endpoint").data(endpoint))
    }

    pub fn send_message(&self, message: &Value) -> Result<(), TransportError> {
        let data = serde_json::to_string(message)?;
        self.send(Event::default().event("message").data(data))
    }

    /// Forwards one posted body to the handler and builds the HTTP reply.
    ///
    /// A non-JSON content type or malformed JSON is answered here with
    /// `400`; every other failure comes back as `Err`.
    pub async fn handle_post_message(
        &self,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Response, TransportError> {
        let Some(handler) = self.handler.get() else {
            return Err(TransportError::NotStarted);
        };
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        if !is_json_content_type(headers) {
            warn!(session_id = %self.session_id, "rejected message with unsupported content type");
            return Ok((StatusCode::BAD_REQUEST, "Unsupported content-type").into_response());
        }

        let message: Value = match serde_json::from_slice(&body) {
            Ok(message) => message,
            Err(err) => {
                warn!(session_id = %self.session_id, error = %err, "rejected malformed message");
                return Ok((StatusCode::BAD_REQUEST, "Invalid message").into_response());
            }
        };

        if let Some(reply) = handler.on_message(message).await? {
            self.send_message(&reply)?;
        }

        Ok((StatusCode::ACCEPTED, "Accepted").into_response())
    }

    /// Ends the stream and runs the handler's close hook. Only the first
    /// call reaches the handler.
    pub async fn close(&self) -> Result<(), TransportError> {
        self.signal_closed();

        if self.finalized.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        match self.handler.get() {
            Some(handler) => handler.on_close().await,
            None => Ok(()),
        }
    }

    fn send(&self, event: Event) -> Result<(), TransportError> {
        let outbound = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        match outbound.as_ref() {
            Some(sender) => sender.send(event).map_err(|_| TransportError::Closed),
            None => Err(TransportError::Closed),
        }
    }

    fn signal_closed(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        // Dropping the sender lets the response stream run to completion.
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if self.close_notifier.send(self.session_id.clone()).is_err() {
            debug!(session_id = %self.session_id, "registry gone before transport closed");
        }
    }
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

impl fmt::Debug for SseTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SseTransport")
            .field("session_id", &self.session_id)
            .field("endpoint", &self.endpoint)
            .field("started", &self.handler.get().is_some())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Receiving half of a transport, turned into the SSE response body.
pub struct EventStream {
    receiver: UnboundedReceiver<Event>,
    guard: DisconnectGuard,
}

impl IntoResponse for EventStream {
    fn into_response(self) -> Response {
        let Self {
            mut receiver,
            guard,
        } = self;

        let stream = stream! {
            let _guard = guard;
            while let Some(event) = receiver.recv().await {
                yield Ok::<Event, Infallible>(event);
            }
        };

        Sse::new(stream)
            .keep_alive(KeepAlive::default())
            .into_response()
    }
}

/// Signals closure when the response body is dropped, which is how a client
/// disconnect surfaces.
struct DisconnectGuard {
    transport: Arc<SseTransport>,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        self.transport.signal_closed();
    }
}
