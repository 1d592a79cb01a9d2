//! Axum HTTP handlers for the SSE front door
//!
//! `GET /sse` opens a stream and registers its transport; `POST /messages`
//! routes a posted body to the transport named by `sessionId`.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    errors::AppError,
    transport::{SessionId, SseTransport, TransportError},
    AppState,
};

pub const STREAM_PATH: &str = "/sse";
pub const MESSAGES_PATH: &str = "/messages";

const STREAM_SETUP_FAILED: &str = "Error establishing SSE stream";
const FORWARDING_FAILED: &str = "Error handling request";

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

pub async fn open_stream(State(state): State<AppState>) -> Result<Response, AppError> {
    info!("establishing sse stream");

    let (transport, events) = state.registry.create_transport(MESSAGES_PATH);
    let session_id = state
        .registry
        .register(transport.clone())
        .map_err(|err| AppError::internal(STREAM_SETUP_FAILED, err.to_string()))?;

    if let Err(err) = state.server.connect(transport).await {
        state.registry.remove(&session_id);
        return Err(AppError::internal(
            STREAM_SETUP_FAILED,
            format!("connect failed for session {session_id}: {err}"),
        ));
    }

    info!(session_id = %session_id, "established sse stream");
    Ok(events.into_response())
}

pub async fn post_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let Some(session_id) = query.session_id.filter(|id| !id.is_empty()) else {
        warn!("no session id provided in request url");
        return Err(AppError::bad_request("Missing sessionId parameter"));
    };
    let session_id = SessionId::from(session_id);

    let Some(transport) = state.registry.lookup(&session_id) else {
        warn!(session_id = %session_id, "no active transport found for session");
        return Err(AppError::not_found("Session not found"));
    };

    transport
        .handle_post_message(&headers, body)
        .await
        .map_err(|err| forwarding_failure(&session_id, &transport, err))
}

/// A transport that closed after `lookup` is reported like an unknown session.
fn forwarding_failure(
    session_id: &SessionId,
    transport: &SseTransport,
    err: TransportError,
) -> AppError {
    match err {
        TransportError::Closed => {
            warn!(session_id = %session_id, "transport closed while forwarding message");
            AppError::not_found("Session not found")
        }
        TransportError::NotStarted if transport.is_closed() => {
            warn!(session_id = %session_id, "transport closed before it was started");
            AppError::not_found("Session not found")
        }
        err => AppError::internal(
            FORWARDING_FAILED,
            format!("forwarding failed for session {session_id}: {err}"),
        ),
    }
}
