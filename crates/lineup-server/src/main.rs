use std::collections::HashMap;
use std::sync::Arc;

use axum::{routing::get, Router};
use lineup_core::{CancelToken, InMemoryCatalog, JobCoordinator, Profile};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

mod http;
mod protocol;
mod runner;
mod websocket;

/// Application state shared across all handlers
pub struct AppState {
    pub catalog: Arc<InMemoryCatalog>,
    pub coordinator: Arc<JobCoordinator>,
    pub profiles: RwLock<HashMap<String, Profile>>,
    /// Cancellation flags for running generation jobs
    pub cancel_tokens: RwLock<HashMap<String, CancelToken>>,
}

impl AppState {
    pub async fn cancel_token_for(&self, job_id: &str) -> Option<CancelToken> {
        self.cancel_tokens.read().await.get(job_id).cloned()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    tracing::info!("Starting lineup programming server...");

    let app_state = Arc::new(AppState {
        catalog: Arc::new(InMemoryCatalog::new()),
        coordinator: Arc::new(JobCoordinator::new()),
        profiles: RwLock::new(HashMap::new()),
        cancel_tokens: RwLock::new(HashMap::new()),
    });

    // Periodic retention sweep for finished jobs
    {
        let coordinator = Arc::clone(&app_state.coordinator);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
            loop {
                interval.tick().await;
                coordinator.cleanup_older(24).await;
            }
        });
    }

    let app = Router::new()
        .merge(http::create_http_router())
        .route("/ws", get(websocket::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());

    tracing::info!("Server listening on {}", addr);
    tracing::info!("WebSocket endpoint: ws://{}/ws", addr);
    tracing::info!("Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
