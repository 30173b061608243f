//! Core domain types and error definitions for folio.
//!
//! This crate provides the types shared across the folio workspace:
//!
//! - [`FolioError`]: Error taxonomy for the auth and chat relay endpoints
//! - [`Message`] and [`MessageRole`]: Conversation message types
//! - [`Conversation`]: A persona-augmented conversation ready for upstream
//! - [`ModelConfig`] and [`ProviderType`]: Upstream model selection
//! - [`unix_now_secs`]: Wall clock used for session timestamps
//!
//! # Example
//!
//! ```rust
//! use folio_core::{Conversation, Message};
//!
//! let conversation = Conversation::with_persona(
//!     "You answer questions about the site owner.",
//!     "Understood.",
//!     vec![Message::user("Hi")],
//! );
//!
//! assert_eq!(conversation.history.len(), 2);
//! assert_eq!(conversation.prompt.content, "Hi");
//! ```

mod conversation;

pub use conversation::Conversation;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the auth and chat relay handlers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FolioError {
    /// Malformed or missing request fields.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Wrong password or an invalid session.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The upstream generative API failed, before or during streaming.
    #[error("Upstream request failed: {0}")]
    UpstreamFailure(String),

    /// Anything unexpected, including malformed stored configuration.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for FolioError {
    fn from(err: serde_json::Error) -> Self {
        FolioError::InvalidInput(err.to_string())
    }
}

/// Role of a message in a conversation.
///
/// Upstream APIs distinguish exactly two parties, so any non-user turn is an
/// assistant turn. `"model"` is accepted as an alias for `"assistant"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the visitor.
    User,
    /// Message from the assistant/LLM.
    #[serde(alias = "model")]
    Assistant,
}

/// A single message in a conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender.
    pub role: MessageRole,
    /// The content of the message.
    pub content: String,
}

impl Message {
    /// Creates a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: MessageRole::User, content: content.into() }
    }

    /// Creates a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: MessageRole::Assistant, content: content.into() }
    }
}

/// Upstream API family, determined from the model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Gemini,
    Anthropic,
}

impl ProviderType {
    pub fn for_model(model: &str) -> Self {
        match model.starts_with("claude-") {
            true => ProviderType::Anthropic,
            false => ProviderType::Gemini,
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_var(self) -> &'static str {
        match self {
            ProviderType::Gemini => "GEMINI_API_KEY",
            ProviderType::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// Configuration for the upstream LLM model.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// The provider model identifier (e.g., "gemini-2.5-flash", "claude-sonnet-4-5").
    pub model: String,
    /// Optional API base URL for proxies or alternative endpoints.
    pub api_base: Option<String>,
}

impl ModelConfig {
    pub fn provider(&self) -> ProviderType {
        ProviderType::for_model(&self.model)
    }
}

/// Seconds since the Unix epoch; zero if the clock is before it.
pub fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
