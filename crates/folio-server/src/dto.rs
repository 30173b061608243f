use folio_core::Message;
use serde::{Deserialize, Serialize};

// === Auth DTOs ===

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
}

// === Chat DTOs ===

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
}

/// Body of one streamed `data:` frame.
#[derive(Debug, Serialize)]
pub struct ContentFrame<'a> {
    pub content: &'a str,
}
