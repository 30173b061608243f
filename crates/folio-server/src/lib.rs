//! HTTP surface for the folio site: the password gate and the chat relay.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod services;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::routing::{get, post};
use axum::Router;
use folio_auth::SessionKeeper;
use folio_config::{AuthSettings, ChatSettings, ServerConfig};
use folio_llm::unified::UnifiedLlmClient;
use folio_llm::ChatProvider;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct ServerState {
    pub sessions: SessionKeeper,
    pub chat: ChatSettings,
    pub provider: Arc<dyn ChatProvider>,
}

impl ServerState {
    /// Builds state from loaded configuration, wiring the upstream client for the configured model.
    pub fn new(config: &ServerConfig) -> Self {
        let provider = UnifiedLlmClient::new(&config.chat.model, &config.chat.api_key);
        info!("Chat relay using {:?} model {}", provider.provider(), config.chat.model.model);
        Self::with_provider(&config.auth, config.chat.clone(), Arc::new(provider))
    }

    pub fn with_provider(
        auth: &AuthSettings,
        chat: ChatSettings,
        provider: Arc<dyn ChatProvider>,
    ) -> Self {
        Self { sessions: SessionKeeper::new(auth.clone()), chat, provider }
    }
}

/// Assembles the application router. Unmatched paths fall through to `static_dir` when set.
pub fn router(state: Arc<ServerState>, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                version = ?req.version(),
            )
        })
        .on_response(|res: &Response<Body>, latency: Duration, _span: &tracing::Span| {
            info!(
                latency = %format!("{} ms", latency.as_millis()),
                status = %res.status().as_u16(),
                "finished processing request"
            );
        });

    let logged_routes = Router::new()
        .route(
            "/api/auth",
            post(handlers::auth::login)
                .get(handlers::auth::status)
                .delete(handlers::auth::logout),
        )
        .route("/api/chat", post(handlers::chat::stream_reply))
        .layer(trace_layer);

    let mut app = Router::new()
        .merge(logged_routes)
        .route("/health", get(handlers::health));

    if let Some(dir) = static_dir {
        info!("Serving static files from {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(cors).with_state(state)
}
