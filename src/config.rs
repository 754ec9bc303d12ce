//! Server configuration.

use clap::Parser;

/// Command-line configuration for the relay server.
#[derive(Debug, Clone, Parser)]
#[command(name = "boardroom-server", about = "Real-time game-session relay server")]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 4000)]
    pub port: u16,

    /// Allowed CORS origin for the HTTP surface (`*` for any)
    #[arg(long = "cors-origin", default_value = "*")]
    pub cors_origin: String,

    /// How long a sync requester waits for peer data before the server
    /// reports `sync-failed`
    #[arg(long = "sync-timeout-ms", default_value_t = 10_000)]
    pub sync_timeout_ms: u64,

    /// Default log level when RUST_LOG is not set
    #[arg(long = "log-level", default_value = "debug")]
    pub log_level: String,
}
