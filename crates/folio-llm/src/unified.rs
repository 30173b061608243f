//! Unified LLM client that routes to the appropriate provider based on model name.

use async_trait::async_trait;
use folio_core::{Conversation, FolioError, ModelConfig};

pub use folio_core::ProviderType;

use crate::anthropic::AnthropicClient;
use crate::gemini::GeminiClient;
use crate::{ChatProvider, LlmStream};

enum Inner {
    Gemini(GeminiClient),
    Anthropic(AnthropicClient),
}

/// Unified client that routes requests to Gemini or Anthropic based on model name.
pub struct UnifiedLlmClient {
    provider: ProviderType,
    inner: Inner,
}

impl UnifiedLlmClient {
    /// Creates a new unified client, detecting provider from model name.
    pub fn new(model: &ModelConfig, api_key: &str) -> Self {
        let provider = model.provider();
        let api_base = model.api_base.as_deref();

        let inner = match provider {
            ProviderType::Gemini => Inner::Gemini(GeminiClient::new(&model.model, api_key, api_base)),
            ProviderType::Anthropic => {
                Inner::Anthropic(AnthropicClient::new(&model.model, api_key, api_base))
            }
        };

        Self { provider, inner }
    }

    pub fn provider(&self) -> ProviderType {
        self.provider
    }
}

#[async_trait]
impl ChatProvider for UnifiedLlmClient {
    async fn chat_stream(&self, conversation: &Conversation) -> Result<LlmStream, FolioError> {
        match &self.inner {
            Inner::Gemini(client) => client.chat_stream(conversation).await,
            Inner::Anthropic(client) => client.chat_stream(conversation).await,
        }
    }
}
