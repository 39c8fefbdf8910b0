//! Detection Receiver Application
//!
//! Listens for detection datagrams, drains them at a fixed tick rate into
//! the scene snapshot and serves link status over HTTP.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bev_link::{
    buffer::create_shared_queue,
    config::AppConfig,
    dispatch::Dispatcher,
    network::ConnectionManager,
    scene::SceneSnapshot,
    ui::WebServer,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting BEV Detection Receiver");

    // Optional config path as first argument
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load_or_default(config_path.as_deref())?;

    let queue = create_shared_queue(config.queue.capacity);
    let manager = Arc::new(ConnectionManager::new(config.network.clone(), queue.clone()));

    manager.events().on_connection_status_changed(|connected| {
        if connected {
            tracing::info!("Connected to detection source");
        } else {
            tracing::info!("Disconnected from detection source");
        }
    });
    manager.events().on_message_received(|payload| {
        tracing::trace!("Datagram received ({} bytes)", payload.len());
    });

    if config.network.auto_connect {
        let manager = manager.clone();
        tokio::task::spawn_blocking(move || manager.connect()).await?;
    } else {
        tracing::info!("Auto-connect disabled; POST /api/connect to start");
    }

    let scene = SceneSnapshot::new();
    let mut dispatcher = Dispatcher::new(queue.clone(), scene.clone())
        .with_drain_limit(config.queue.drain_limit)
        .with_status_log_interval(config.dispatch.status_log_interval_ticks);

    if config.ui.enabled {
        let web_server = WebServer::new(
            config.ui.clone(),
            manager.clone(),
            scene.clone(),
            dispatcher.stats(),
        );
        let _web_handle = web_server.start_background();
    }

    let mut ticker = tokio::time::interval(config.dispatch.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    tracing::info!(
        "Dispatching at {} Hz, up to {} messages per tick - press Ctrl+C to stop",
        config.dispatch.tick_rate_hz,
        dispatcher.drain_limit()
    );

    let mut last_stats_time = Instant::now();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                dispatcher.drain_once();
            }
            result = &mut shutdown => {
                if let Err(e) = result {
                    tracing::error!("Failed to listen for Ctrl+C: {}", e);
                }
                break;
            }
        }

        // Periodic stats
        if last_stats_time.elapsed() >= Duration::from_secs(5) {
            last_stats_time = Instant::now();

            let recv_stats = manager.receiver_stats();
            let queue_stats = queue.stats();
            let frame = scene.latest();
            tracing::info!(
                "Receiver stats: {} datagrams, {} bytes, {} errors; queue {}/{} ({} dropped); {} objects in frame {}, {} decode errors",
                recv_stats.datagrams_received,
                recv_stats.bytes_received,
                recv_stats.receive_errors,
                queue_stats.len,
                queue_stats.capacity,
                queue_stats.dropped,
                frame.detections.len(),
                frame.sequence,
                frame.decode_errors
            );
        }
    }

    tracing::info!("Shutting down");
    tokio::task::spawn_blocking(move || manager.disconnect()).await?;

    Ok(())
}
