use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::sse::Sse;
use axum::response::{IntoResponse, Response};
use folio_core::Conversation;
use tracing::{error, info};

use crate::dto::ChatRequest;
use crate::error::AppError;
use crate::services::relay;
use crate::ServerState;

/// Relays a conversation to the upstream model and streams the reply as server-sent events.
pub async fn stream_reply(State(state): State<Arc<ServerState>>, body: Bytes) -> Result<Response, AppError> {
    let request: ChatRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::internal(format!("unreadable chat body: {e}")))?;

    info!("Chat relay: {} client turns", request.messages.len());

    let conversation =
        Conversation::with_persona(&state.chat.persona, &state.chat.acknowledgment, request.messages);

    let upstream = state.provider.chat_stream(&conversation).await.map_err(|e| {
        error!("Upstream open failed: {}", e);
        AppError::from(e)
    })?;

    let (events, _pump) = relay::spawn_pump(upstream);

    Ok(([(header::CONNECTION, "keep-alive")], Sse::new(events)).into_response())
}
