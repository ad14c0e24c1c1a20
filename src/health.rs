use std::net::SocketAddr;

use axum::{routing::get, Router};
use tokio::net::TcpListener;

pub const ALIVE: &str = "Bot is alive!";

/// Liveness check for the hosting platform.
pub fn router() -> Router {
    Router::new().route("/", get(alive))
}

async fn alive() -> &'static str {
    ALIVE
}

pub async fn serve(addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Health check listening on {addr}");
    axum::serve(listener, router()).await
}
