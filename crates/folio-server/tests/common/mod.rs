#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, Response};
use axum::Router;
use folio_auth::password::hash_password;
use folio_config::{AuthSettings, ChatSettings};
use folio_core::{Conversation, FolioError, ModelConfig};
use folio_llm::{ChatProvider, LlmStream, StreamChunk};
use folio_server::{router, ServerState};
use futures::stream;
use tower::ServiceExt;

pub const PASSWORD: &str = "huhlo";
pub const PERSONA: &str = "You describe the site owner.";
pub const ACK: &str = "Understood.";

/// Upstream fake that replays a fixed script and records what it was asked.
pub struct ScriptedProvider {
    open_error: Option<FolioError>,
    script: Vec<Result<StreamChunk, FolioError>>,
    pub seen: Mutex<Vec<Conversation>>,
}

impl ScriptedProvider {
    pub fn replying(script: Vec<Result<StreamChunk, FolioError>>) -> Arc<Self> {
        Arc::new(Self { open_error: None, script, seen: Mutex::new(Vec::new()) })
    }

    pub fn failing_to_open(error: FolioError) -> Arc<Self> {
        Arc::new(Self { open_error: Some(error), script: Vec::new(), seen: Mutex::new(Vec::new()) })
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn chat_stream(&self, conversation: &Conversation) -> Result<LlmStream, FolioError> {
        self.seen.lock().unwrap().push(conversation.clone());
        if let Some(e) = &self.open_error {
            return Err(e.clone());
        }
        Ok(Box::pin(stream::iter(self.script.clone())))
    }
}

pub fn auth_settings(secure_cookies: bool) -> AuthSettings {
    AuthSettings {
        password_hash: hash_password(PASSWORD),
        deployment_epoch: 1_700_000_000,
        session_secret: b"integration-test-session-secret".to_vec(),
        session_ttl: Duration::from_secs(86_400),
        failure_delay: Duration::from_millis(1000),
        secure_cookies,
    }
}

pub fn chat_settings() -> ChatSettings {
    ChatSettings {
        persona: PERSONA.into(),
        acknowledgment: ACK.into(),
        model: ModelConfig { model: "scripted".into(), api_base: None },
        api_key: String::new(),
    }
}

pub fn app_with(auth: AuthSettings, provider: Arc<dyn ChatProvider>) -> Router {
    let state = ServerState::with_provider(&auth, chat_settings(), provider);
    router(Arc::new(state), None)
}

pub fn app() -> Router {
    app_with(auth_settings(false), ScriptedProvider::replying(Vec::new()))
}

pub async fn send(app: &Router, method: Method, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
    let mut request = Request::builder().method(method).uri(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, format!("auth-token={cookie}"));
    }
    app.clone().oneshot(request.body(Body::from(body.to_string())).unwrap()).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string())
}

/// Value of the session cookie from a `Set-Cookie` header.
pub fn cookie_value(set_cookie: &str) -> String {
    let pair = set_cookie.split(';').next().unwrap();
    pair.trim_start_matches("auth-token=").to_string()
}

/// Splits an event-stream body into its `data:` payloads.
pub fn data_frames(body: &str) -> Vec<String> {
    body.split("\n\n")
        .filter(|frame| !frame.is_empty())
        .map(|frame| frame.strip_prefix("data: ").unwrap_or(frame).to_string())
        .collect()
}

/// Reads a streamed body to completion and returns its `data:` payloads.
pub async fn stream_frames(response: Response<Body>) -> Vec<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    data_frames(std::str::from_utf8(&bytes).unwrap())
}
