//! HTTP status server

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;

use crate::config::UiConfig;
use crate::dispatch::DispatchStats;
use crate::network::ConnectionManager;
use crate::scene::SceneSnapshot;
use crate::ui::handlers;

/// State shared with every handler
pub struct AppState {
    pub manager: Arc<ConnectionManager>,
    pub scene: SceneSnapshot,
    pub dispatch_stats: Arc<DispatchStats>,
    pub started_at: Instant,
}

pub struct WebServer {
    config: UiConfig,
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(
        config: UiConfig,
        manager: Arc<ConnectionManager>,
        scene: SceneSnapshot,
        dispatch_stats: Arc<DispatchStats>,
    ) -> Self {
        Self {
            config,
            state: Arc::new(AppState {
                manager,
                scene,
                dispatch_stats,
                started_at: Instant::now(),
            }),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/status", get(handlers::get_status))
            .route("/api/detections", get(handlers::get_detections))
            .route("/api/connect", post(handlers::connect))
            .route("/api/disconnect", post(handlers::disconnect))
            .route("/api/send", post(handlers::send))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Serve until the listener fails
    pub async fn run(self) -> std::io::Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.http_port)
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Status API listening on http://{}", addr);

        axum::serve(listener, self.router()).await
    }

    /// Spawn the server on the current runtime
    pub fn start_background(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run().await {
                tracing::error!("Status API stopped: {}", e);
            }
        })
    }
}
