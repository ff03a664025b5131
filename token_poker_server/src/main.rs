use anyhow::Context;
use std::sync::Arc;
use token_poker_server::{config::ServerConfig, logging, store::RoomStore, ws};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = ServerConfig::from_env()?;
    let store = Arc::new(RoomStore::new(config.poll_window));
    let app = ws::router(store);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(addr = %config.bind, poll_secs = config.poll_window.as_secs(), "room store listening");
    axum::serve(listener, app).await.context("server stopped")?;
    Ok(())
}
