//! Leaseline presence service -- real-time chat relay.
//!
//! An axum WebSocket server that tracks which platform user is online and
//! relays direct messages between them. Message payloads are opaque to the
//! service; it only reads routing metadata. Delivery is best-effort: users
//! without a live connection simply miss the message.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:4500
//! cargo run --bin leaseline-presence
//!
//! # Run on custom address
//! cargo run --bin leaseline-presence -- --bind 127.0.0.1:8080
//!
//! # Or via environment variable
//! LEASELINE_PRESENCE_ADDR=127.0.0.1:8080 cargo run --bin leaseline-presence
//! ```

use std::sync::Arc;

use clap::Parser;
use leaseline_presence::config::{PresenceCliArgs, PresenceConfig};
use leaseline_presence::relay::{self, PresenceState};

#[tokio::main]
async fn main() {
    let cli = PresenceCliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match PresenceConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing with the resolved log level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, "starting leaseline presence service");

    let state = Arc::new(PresenceState::with_config(config.max_message_size));

    match relay::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "presence service listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "server task failed");
                std::process::exit(1);
            }
        }
        Err(e) => {
            tracing::error!(addr = %config.bind_addr, error = %e, "failed to start server");
            std::process::exit(1);
        }
    }
}
