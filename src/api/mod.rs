//! Read-only HTTP layer over the saved signal report.

pub mod routes;
pub mod types;

use std::net::SocketAddr;

use anyhow::Result;
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::Settings;

#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Settings,
}

pub fn router(settings: Settings) -> Router {
    Router::new()
        .route("/signals", get(routes::list_signals))
        .route("/signals/:drug", get(routes::drug_signals))
        .route("/alerts", get(routes::list_alerts))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { settings })
}

pub async fn serve(settings: Settings, host: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let router = router(settings);
    info!(%addr, "serving signal-ranker API");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
