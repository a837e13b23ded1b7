//! # Relay Server Entry Point
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin server -- --config config/relay.toml
//! COMPRE_FACE_API_KEY=... cargo run --bin server -- --bind 127.0.0.1:5000
//! ```

use clap::Parser;
use log::info;

use face_relay::logging::init_logger;
use face_relay::{RelayConfig, RelayServer};

/// Command-line arguments for the relay binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file (optional; defaults and environment apply otherwise)
    #[arg(short, long)]
    config: Option<String>,

    /// Address to listen on, overriding the file and FACE_RELAY_BIND
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let args = Args::parse();

    let mut config = RelayConfig::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    info!("🚀 Initializing face relay...");

    let server = RelayServer::new(config)?;
    server.run().await
}
