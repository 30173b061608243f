use std::sync::Arc;

use anyhow::Result;
use folio_config::ServerConfig;
use folio_server::{router, ServerState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .compact()
        .init();

    let config = ServerConfig::from_env()?;
    info!(
        "Loaded config: session ttl {}s, secure cookies {}, epoch {}",
        config.auth.session_ttl.as_secs(),
        config.auth.secure_cookies,
        config.auth.deployment_epoch
    );

    let state = Arc::new(ServerState::new(&config));
    let app = router(state, config.static_dir.as_deref());

    info!("Starting server on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
