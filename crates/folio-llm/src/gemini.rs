//! Google Gemini client with streaming support.

use async_trait::async_trait;
use folio_core::{Conversation, FolioError, Message, MessageRole};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{ensure_success, sse, ChatProvider, LlmStream, StreamChunk};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamEvent {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: Option<String>,
}

/// Client for the Gemini `streamGenerateContent` API.
pub struct GeminiClient {
    client: Client,
    model: String,
    api_key: String,
    api_base: String,
}

impl GeminiClient {
    /// Creates a new Gemini client.
    pub fn new(model: &str, api_key: &str, api_base: Option<&str>) -> Self {
        info!("GeminiClient: model={}, api_key_len={}", model, api_key.len());
        Self {
            client: Client::new(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            api_base: api_base.unwrap_or(GEMINI_API_BASE).trim_end_matches('/').to_string(),
        }
    }

    fn stream_url(&self) -> String {
        format!("{}/v1beta/models/{}:streamGenerateContent?alt=sse", self.api_base, self.model)
    }
}

/// History turns keep their role; the submitted turn is always sent as the user.
fn build_request(conversation: &Conversation) -> GenerateContentRequest<'_> {
    let mut contents: Vec<Content<'_>> = conversation.history.iter().map(to_content).collect();
    contents.push(Content {
        role: "user",
        parts: vec![Part { text: &conversation.prompt.content }],
    });
    GenerateContentRequest { contents }
}

fn to_content(msg: &Message) -> Content<'_> {
    Content {
        role: match msg.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "model",
        },
        parts: vec![Part { text: &msg.content }],
    }
}

/// Decodes one `data:` payload of the Gemini event stream.
pub(crate) fn parse_event(json: &str) -> Vec<Result<StreamChunk, FolioError>> {
    let event: StreamEvent = match serde_json::from_str(json) {
        Ok(e) => e,
        Err(e) => {
            error!("Failed to parse Gemini event: {} - {}", e, json);
            return vec![Err(FolioError::UpstreamFailure(format!("unreadable Gemini event: {e}")))];
        }
    };

    if let Some(err) = event.error {
        let message = err.message.unwrap_or_else(|| "unknown error".into());
        return vec![Err(FolioError::UpstreamFailure(format!("Gemini stream error: {message}")))];
    }

    if let Some(reason) = event.prompt_feedback.and_then(|f| f.block_reason) {
        return vec![Err(FolioError::UpstreamFailure(format!("Gemini blocked the prompt: {reason}")))];
    }

    let mut chunks = Vec::new();

    let text: String = event
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if !text.is_empty() {
        chunks.push(Ok(StreamChunk::Content(text)));
    }

    if let Some(usage) = event.usage_metadata {
        chunks.push(Ok(StreamChunk::Usage {
            input_tokens: usage.prompt_token_count.unwrap_or(0),
            output_tokens: usage.candidates_token_count.unwrap_or(0),
        }));
    }

    chunks
}

#[async_trait]
impl ChatProvider for GeminiClient {
    async fn chat_stream(&self, conversation: &Conversation) -> Result<LlmStream, FolioError> {
        let request = build_request(conversation);

        let response = self
            .client
            .post(self.stream_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| FolioError::UpstreamFailure(e.to_string()))?;

        let response = ensure_success("Gemini", response).await?;

        Ok(sse::decode_stream(response.bytes_stream(), parse_event))
    }
}
