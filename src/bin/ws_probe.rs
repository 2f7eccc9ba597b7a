//! Websocket probe
//!
//! Connects to the endpoint described by the socket config, sends the
//! configured subscriptions and prints every application frame until Ctrl+C.
//! Reconnections and pong misses are logged as they happen.
//!
//! Usage:
//!   cargo run --bin ws_probe [config.yaml]
//!
//! Environment variables:
//!   SOCKET_CONFIG_PATH - config file when no argument is given (default config/socket.yaml)
//!   LIVESOCKET_HOST    - overrides the host from the config file
//!   RUST_LOG           - log filter

use anyhow::{Context, Result};
use livesocket::{ClientEvent, Frame, SocketClient, SocketClientBuilder, SocketConfig, SocketError};
use livesocket_tools::bin_common::{init_tracing, load_config_from_env, parse_args, ConfigType};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenv::dotenv().ok();
    init_tracing("livesocket=info");

    let config_type = match parse_args().into_iter().next() {
        Some(path) => ConfigType::Custom(path),
        None => ConfigType::Socket,
    };
    let config_path = load_config_from_env(config_type);
    let config = SocketConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    info!("Connecting to {}", config.url()?);
    let client = SocketClientBuilder::from_config(&config)?
        .on_disconnected(|generation, reason| match generation {
            Some(generation) => warn!("Generation {} lost: {}", generation, reason),
            None => warn!("Dial failed: {}", reason),
        })
        .connect()
        .await
        .context("initial connection failed")?;
    let client = Arc::new(client);

    println!("Connected (generation {})", client.generation());
    println!("Press Ctrl+C to stop\n");

    let reader = {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            loop {
                match client.read().await {
                    Ok(Frame::Text(text)) => println!("{}", text),
                    Ok(Frame::Binary(data)) => println!("<{} binary bytes>", data.len()),
                    Err(SocketError::Closed) => break,
                    Err(e) => {
                        warn!("Read stopped: {}", e);
                        break;
                    }
                }
            }
        })
    };

    tokio::select! {
        signal = tokio::signal::ctrl_c() => signal.context("waiting for Ctrl+C")?,
        _ = wait_terminal(Arc::clone(&client)) => warn!("Connection lost for good"),
    }

    client.close().await?;
    let _ = reader.await;

    let metrics = client.metrics();
    println!(
        "\nShutdown complete: {} frames received, {} sent, {} pongs, {} reconnects",
        metrics.frames_received, metrics.frames_sent, metrics.pongs_filtered, metrics.reconnect_count
    );
    Ok(())
}

/// Resolves once the client reports a terminal lifecycle event
async fn wait_terminal(client: Arc<SocketClient>) {
    let result = tokio::task::spawn_blocking(move || loop {
        match client.recv_event() {
            Ok(ClientEvent::ConnectionLost { attempts }) => {
                warn!("Gave up after {} attempts", attempts);
                return;
            }
            Ok(ClientEvent::Closed) | Err(_) => return,
            Ok(event) => info!("{:?}", event),
        }
    })
    .await;
    if let Err(e) = result {
        warn!("Event watcher failed: {}", e);
    }
}
