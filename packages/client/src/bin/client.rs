//! Interactive Cups room client.
//!
//! Joins a room as a student or a teacher, prints the room state as it
//! changes and sends commands typed at the prompt.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin cups-client -- --room math
//! cargo run --bin cups-client -- -r math -t teacher -u ws://127.0.0.1:8000/ws
//! ```

use std::sync::Arc;

use clap::Parser;

use cups_client::{
    ClientConfig, Session, cli::run_client, protocol::ConnectionType,
    transport::WebSocketConnector,
};
use cups_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "cups-client")]
#[command(about = "Interactive client for a Cups classroom room", long_about = None)]
struct Args {
    /// Name of the room to join
    #[arg(short = 'r', long)]
    room: String,

    /// Join as a student or a teacher
    #[arg(short = 't', long, default_value = "student")]
    connection_type: ConnectionType,

    /// WebSocket endpoint; defaults to APP_ENVIRONMENT / APP_HOST / APP_PORT
    #[arg(short = 'u', long)]
    url: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_PKG_NAME"), env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let session = match args.url {
        Some(url) => Session::with_connector(
            Arc::new(WebSocketConnector),
            url,
            args.room,
            args.connection_type,
        ),
        None => match ClientConfig::from_env() {
            Ok(config) => Session::open(&config, args.room, args.connection_type),
            Err(e) => {
                tracing::error!("Invalid configuration: {}", e);
                std::process::exit(1);
            }
        },
    };

    if let Err(e) = run_client(session).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
