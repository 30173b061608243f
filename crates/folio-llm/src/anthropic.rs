//! Anthropic Claude API client with streaming support.

use async_trait::async_trait;
use folio_core::{Conversation, FolioError, MessageRole};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{ensure_success, sse, ChatProvider, LlmStream, StreamChunk};

pub const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 8192;

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
    stream: bool,
}

#[derive(Deserialize)]
struct ContentBlockDelta {
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    delta: Option<ContentBlockDelta>,
    usage: Option<Usage>,
    message: Option<MessageEvent>,
    error: Option<ErrorEvent>,
}

#[derive(Deserialize)]
struct MessageEvent {
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ErrorEvent {
    message: Option<String>,
}

/// Client for Anthropic's Claude API.
pub struct AnthropicClient {
    client: Client,
    model: String,
    api_key: String,
    api_base: String,
}

impl AnthropicClient {
    /// Creates a new Anthropic client.
    pub fn new(model: &str, api_key: &str, api_base: Option<&str>) -> Self {
        info!("AnthropicClient: model={}, api_key_len={}", model, api_key.len());
        Self {
            client: Client::new(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            api_base: api_base.unwrap_or(ANTHROPIC_API_BASE).trim_end_matches('/').to_string(),
        }
    }

    fn build_request<'a>(&'a self, conversation: &'a Conversation) -> AnthropicRequest<'a> {
        let mut messages: Vec<AnthropicMessage<'a>> = conversation
            .history
            .iter()
            .map(|msg| AnthropicMessage {
                role: match msg.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                },
                content: &msg.content,
            })
            .collect();

        messages.push(AnthropicMessage { role: "user", content: &conversation.prompt.content });

        AnthropicRequest { model: &self.model, max_tokens: MAX_TOKENS, messages, stream: true }
    }
}

/// Decodes one `data:` payload of the Anthropic event stream.
pub(crate) fn parse_event(json: &str) -> Vec<Result<StreamChunk, FolioError>> {
    let event: StreamEvent = match serde_json::from_str(json) {
        Ok(e) => e,
        Err(e) => {
            error!("Failed to parse Anthropic event: {} - {}", e, json);
            return vec![Err(FolioError::UpstreamFailure(format!("unreadable Anthropic event: {e}")))];
        }
    };

    match event.event_type.as_str() {
        "content_block_delta" => event
            .delta
            .and_then(|d| d.text)
            .map(|text| vec![Ok(StreamChunk::Content(text))])
            .unwrap_or_default(),
        "message_delta" => event
            .usage
            .map(|usage| {
                vec![Ok(StreamChunk::Usage {
                    input_tokens: usage.input_tokens.unwrap_or(0),
                    output_tokens: usage.output_tokens.unwrap_or(0),
                })]
            })
            .unwrap_or_default(),
        "message_start" => event
            .message
            .and_then(|m| m.usage)
            .map(|usage| {
                vec![Ok(StreamChunk::Usage {
                    input_tokens: usage.input_tokens.unwrap_or(0),
                    output_tokens: 0,
                })]
            })
            .unwrap_or_default(),
        "error" => {
            let message = event.error.and_then(|e| e.message).unwrap_or_else(|| "unknown error".into());
            vec![Err(FolioError::UpstreamFailure(format!("Anthropic stream error: {message}")))]
        }
        _ => vec![],
    }
}

#[async_trait]
impl ChatProvider for AnthropicClient {
    async fn chat_stream(&self, conversation: &Conversation) -> Result<LlmStream, FolioError> {
        let request = self.build_request(conversation);

        let response = self
            .client
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| FolioError::UpstreamFailure(e.to_string()))?;

        let response = ensure_success("Anthropic", response).await?;

        Ok(sse::decode_stream(response.bytes_stream(), parse_event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::Message;

    #[test]
    fn test_request_alternates_roles() {
        let client = AnthropicClient::new("claude-sonnet-4-5", "key", None);
        let conv = Conversation::with_persona("persona", "ack", vec![Message::user("Hi")]);
        let json = serde_json::to_value(client.build_request(&conv)).unwrap();

        assert_eq!(json["model"], "claude-sonnet-4-5");
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][1]["role"], "assistant");
        assert_eq!(json["messages"][2]["content"], "Hi");
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_parse_delta() {
        let json = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#;
        assert_eq!(parse_event(json), vec![Ok(StreamChunk::Content("Hi".into()))]);
    }

    #[test]
    fn test_parse_usage() {
        let start = r#"{"type":"message_start","message":{"usage":{"input_tokens":25,"output_tokens":1}}}"#;
        let delta = r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":15}}"#;

        assert_eq!(
            parse_event(start),
            vec![Ok(StreamChunk::Usage { input_tokens: 25, output_tokens: 0 })]
        );
        assert_eq!(
            parse_event(delta),
            vec![Ok(StreamChunk::Usage { input_tokens: 0, output_tokens: 15 })]
        );
    }

    #[test]
    fn test_parse_ignores_pings() {
        assert!(parse_event(r#"{"type":"ping"}"#).is_empty());
        assert!(parse_event(r#"{"type":"content_block_stop","index":0}"#).is_empty());
    }

    #[test]
    fn test_parse_error_event() {
        let json = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        assert!(matches!(parse_event(json)[0], Err(FolioError::UpstreamFailure(ref m)) if m.contains("Overloaded")));
    }
}
