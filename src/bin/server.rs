//! Game-session relay server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin boardroom-server -- --port 4000
//! ```

use clap::Parser;

use boardroom::{ServerConfig, logger::setup_logger};

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &config.log_level);

    // Run the server
    if let Err(e) = boardroom::run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
