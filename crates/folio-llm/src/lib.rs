//! Streaming generative-text clients for folio.
//!
//! The relay only needs one capability from an upstream provider: submit a
//! list of role-tagged turns and receive an asynchronous sequence of text
//! deltas. [`ChatProvider`] is that seam; [`UnifiedLlmClient`] routes to
//! Gemini or Anthropic based on the configured model name.

pub mod anthropic;
pub mod gemini;
pub mod sse;
pub mod unified;

use std::pin::Pin;

use async_trait::async_trait;
use folio_core::{Conversation, FolioError};
use futures::Stream;

pub use anthropic::AnthropicClient;
pub use gemini::GeminiClient;
pub use unified::UnifiedLlmClient;

/// One item of an upstream reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    /// An incremental text fragment.
    Content(String),
    /// Token accounting, when the provider reports it.
    Usage { input_tokens: u32, output_tokens: u32 },
}

/// Ordered upstream deltas, ending when the provider signals completion.
pub type LlmStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, FolioError>> + Send>>;

/// A provider that streams a reply to a conversation.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Opens the upstream stream.
    ///
    /// Errors returned here happen before any delta exists; errors inside the
    /// stream happen mid-generation.
    async fn chat_stream(&self, conversation: &Conversation) -> Result<LlmStream, FolioError>;
}

/// Maps a non-success upstream response to an error carrying its body.
pub(crate) async fn ensure_success(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, FolioError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(FolioError::UpstreamFailure(format!("{} API error {}: {}", provider, status, body)))
}
