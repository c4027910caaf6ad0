//! Multi-room Texas Hold'em WebSocket server.
//!
//! Rooms are in-memory only and vanish on restart; clients holding a
//! stored session get `ROOM_NOT_FOUND` with the clear-session flag on
//! reconnect.

mod api;
mod config;
mod logging;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use pico_args::Arguments;
use pocket_holdem::room::RoomManager;
use tracing::info;

use config::ServerConfig;

const HELP: &str = "\
Run a multi-room Texas Hold'em server

USAGE:
  ph_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:7070]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  ROOM_INITIAL_CHIPS       Default starting stack           [default: 1000]
  ROOM_SMALL_BLIND         Default small blind              [default: 5]
  ROOM_BIG_BLIND           Default big blind                [default: 10]
  ROOM_MAX_PLAYERS         Default seats per room (2-9)     [default: 6]
  ROOM_TURN_TIMEOUT_SECS   Per-turn action deadline         [default: 30]
  ROOM_INTER_HAND_DELAY_MS Pause between hands              [default: 3000]
  RUST_LOG                 Log filter (e.g., debug)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists.
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind_override: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;

    logging::init();

    let server_config = ServerConfig::from_env(bind_override)?;
    info!(
        "room defaults: {} chips, blinds {}/{}, {} seats, {}s turns",
        server_config.room_defaults.initial_chips,
        server_config.room_defaults.small_blind,
        server_config.room_defaults.big_blind,
        server_config.room_defaults.max_players,
        server_config.room_defaults.turn_timeout_secs,
    );

    let rooms = Arc::new(RoomManager::new(server_config.room_defaults.clone()));
    let app = api::create_router(api::AppState { rooms });

    info!("starting WebSocket server on {}", server_config.bind);
    let listener = tokio::net::TcpListener::bind(server_config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind to {}: {e}", server_config.bind))?;

    info!(
        "server is running at ws://{}/ws, press Ctrl+C to stop",
        server_config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("server error: {e}"))?;

    info!("shutting down");
    Ok(())
}

/// Graceful shutdown signal.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
}
