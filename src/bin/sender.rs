//! Detection Source Simulator
//!
//! Stands in for the perception daemon: streams synthetic detection frames
//! to a receiver in the daemon's exact text format.
//!
//! Usage: `sender [target] [bind] [fps]`, default `127.0.0.1:8081 0.0.0.0:8080 10`

use anyhow::{Context, Result};
use std::f32::consts::{FRAC_PI_2, TAU};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bev_link::protocol::WireRecord;

/// Object footprints: width, length, height in metres
const CLASSES: [(f32, f32, f32); 4] = [
    (1.9, 4.6, 1.6), // car
    (2.5, 9.0, 3.2), // truck
    (0.7, 0.7, 1.8), // pedestrian
    (0.6, 1.8, 1.4), // bicycle
];

const OBJECT_COUNT: i32 = 8;

/// One frame of objects circling the ego vehicle
fn synthesize_frame(t: f32) -> Vec<WireRecord> {
    (0..OBJECT_COUNT)
        .map(|id| {
            let (width, length, height) = CLASSES[id as usize % CLASSES.len()];
            let radius = 8.0 + 3.0 * id as f32;
            let speed = 0.3 / (1.0 + id as f32 * 0.2);
            let angle = t * speed + id as f32 * TAU / OBJECT_COUNT as f32;

            WireRecord {
                x: radius * angle.cos(),
                z: radius * angle.sin(),
                y: 0.0,
                width,
                length,
                height,
                pivot: angle + FRAC_PI_2,
                id,
                confidence: 0.55 + 0.05 * (id % 8) as f32,
            }
        })
        .collect()
}

/// Encode a frame the way the daemon does: a trailing space on every record
fn encode_frame(records: &[WireRecord]) -> String {
    records.iter().map(|r| format!("{} \n", r)).collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let target: SocketAddr = args
        .next()
        .unwrap_or_else(|| "127.0.0.1:8081".to_string())
        .parse()
        .context("Invalid target address")?;
    let bind: SocketAddr = args
        .next()
        .unwrap_or_else(|| "0.0.0.0:8080".to_string())
        .parse()
        .context("Invalid bind address")?;
    let fps: f64 = args
        .next()
        .map(|s| s.parse())
        .transpose()
        .context("Invalid frame rate")?
        .unwrap_or(10.0);

    let socket = UdpSocket::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    tracing::info!("Detection source on {}, streaming to {} at {} fps", socket.local_addr()?, target, fps);

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / fps.max(0.1)));
    let start_time = Instant::now();
    let mut frames: u64 = 0;
    let mut reply_buf = vec![0u8; 2048];

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let payload = encode_frame(&synthesize_frame(start_time.elapsed().as_secs_f32()));

                match socket.send_to(payload.as_bytes(), target).await {
                    Ok(sent) => {
                        frames += 1;
                        if frames % 100 == 0 {
                            tracing::info!("Sent {} frames ({} bytes last)", frames, sent);
                        }
                    }
                    Err(e) => tracing::warn!("Failed to send frame: {}", e),
                }
            }
            received = socket.recv_from(&mut reply_buf) => {
                match received {
                    Ok((len, from)) => {
                        tracing::info!("Reply from {}: {}", from, String::from_utf8_lossy(&reply_buf[..len]));
                    }
                    Err(e) => tracing::debug!("Receive error: {}", e),
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Stopping after {} frames", frames);
                break;
            }
        }
    }

    Ok(())
}
