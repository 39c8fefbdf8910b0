//! HTTP API handlers

use axum::{extract::State, http::StatusCode, Json};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::buffer::QueueStats;
use crate::dispatch::DispatchStatsSnapshot;
use crate::network::{ConnectionState, ReceiverStatsSnapshot};
use crate::scene::SceneFrame;
use crate::ui::server::AppState;

/// API response wrapper
#[derive(serde::Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Link status
#[derive(serde::Serialize)]
pub struct LinkStatus {
    pub state: ConnectionState,
    pub local_addr: Option<SocketAddr>,
    pub server: String,
    pub queue: QueueStats,
    pub receiver: ReceiverStatsSnapshot,
    pub dispatch: DispatchStatsSnapshot,
    pub uptime_seconds: u64,
}

/// Get link status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<LinkStatus>> {
    let network = state.manager.config();
    let status = LinkStatus {
        state: state.manager.state(),
        local_addr: state.manager.local_addr(),
        server: format!("{}:{}", network.server_address, network.server_port),
        queue: state.manager.queue().stats(),
        receiver: state.manager.receiver_stats(),
        dispatch: state.dispatch_stats.snapshot(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    };

    Json(ApiResponse::ok(status))
}

/// Get the latest decoded frame
pub async fn get_detections(State(state): State<Arc<AppState>>) -> Json<ApiResponse<SceneFrame>> {
    Json(ApiResponse::ok(state.scene.latest()))
}

/// Connect (or reconnect) the UDP link
pub async fn connect(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<ConnectionState>>) {
    let manager = state.manager.clone();
    // connect joins the previous receive thread, keep it off the runtime
    match tokio::task::spawn_blocking(move || manager.connect()).await {
        Ok(true) => (StatusCode::OK, Json(ApiResponse::ok(state.manager.state()))),
        Ok(false) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error("Failed to bind UDP socket")),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(e.to_string())),
        ),
    }
}

/// Disconnect the UDP link
pub async fn disconnect(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<bool>>) {
    let manager = state.manager.clone();
    match tokio::task::spawn_blocking(move || manager.disconnect()).await {
        Ok(closed) => (StatusCode::OK, Json(ApiResponse::ok(closed))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(e.to_string())),
        ),
    }
}

#[derive(serde::Deserialize)]
pub struct SendRequest {
    pub message: String,
}

/// Send text back to the detection source
pub async fn send(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendRequest>,
) -> (StatusCode, Json<ApiResponse<usize>>) {
    match state.manager.send(&req.message) {
        Ok(sent) => (StatusCode::OK, Json(ApiResponse::ok(sent))),
        Err(e) => (StatusCode::BAD_REQUEST, Json(ApiResponse::error(e.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::create_shared_queue;
    use crate::config::NetworkConfig;
    use crate::dispatch::DispatchStats;
    use crate::network::ConnectionManager;
    use crate::scene::SceneSnapshot;
    use std::time::Instant;

    fn app_state() -> Arc<AppState> {
        let config = NetworkConfig {
            server_address: "127.0.0.1".to_string(),
            local_port: 0,
            receive_timeout_ms: 50,
            ..Default::default()
        };
        Arc::new(AppState {
            manager: Arc::new(ConnectionManager::new(config, create_shared_queue(16))),
            scene: SceneSnapshot::new(),
            dispatch_stats: Arc::new(DispatchStats::default()),
            started_at: Instant::now(),
        })
    }

    #[tokio::test]
    async fn test_status_reports_disconnected() {
        let state = app_state();
        let Json(response) = get_status(State(state)).await;

        assert!(response.success);
        let status = response.data.unwrap();
        assert_eq!(status.state, ConnectionState::Disconnected);
        assert_eq!(status.queue.capacity, 16);
        assert_eq!(status.server, "127.0.0.1:8080");
    }

    #[tokio::test]
    async fn test_status_json_shape() {
        let state = app_state();
        let Json(response) = get_status(State(state)).await;
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["state"], "disconnected");
        assert_eq!(json["data"]["local_addr"], serde_json::Value::Null);
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_connect_and_disconnect_endpoints() {
        let state = app_state();

        let (code, Json(response)) = connect(State(state.clone())).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(response.data, Some(ConnectionState::Connected));

        let (code, Json(response)) = disconnect(State(state.clone())).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(response.data, Some(true));
        assert!(!state.manager.is_connected());
    }

    #[tokio::test]
    async fn test_send_while_disconnected_is_rejected() {
        let state = app_state();
        let request = SendRequest {
            message: "ping".to_string(),
        };

        let (code, Json(response)) = send(State(state), Json(request)).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(response.error.as_deref(), Some("Not connected"));
    }
}
