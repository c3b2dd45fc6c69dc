//! Random-chat matchmaking and presence server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin deai-server
//! cargo run --bin deai-server -- --host 0.0.0.0 --port 3000 --grace-period-secs 30
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use deai_server::{
    config::{DEFAULT_MATCH_RETRY_JITTER, EngineConfig},
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryChatStore},
    ui::{AppState, Server},
};
use deai_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "deai-server")]
#[command(about = "Random-chat matchmaking and presence server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Seconds a dropped user keeps their room before the partner is notified
    #[arg(long, default_value = "60")]
    grace_period_secs: u64,

    /// Interval between match retries for a waiting searcher
    #[arg(long, default_value = "1000")]
    match_retry_ms: u64,

    /// Window within which identical messages from one sender are dropped
    #[arg(long, default_value = "1000")]
    dedup_window_ms: u64,

    /// Buffered messages kept per random room before the oldest are dropped
    #[arg(long, default_value = "1000")]
    max_buffered_messages: usize,

    /// Maximum inbound events per connection within the rate-limit window
    #[arg(long, default_value = "10")]
    rate_limit_events: usize,

    /// Sliding window of the per-connection event rate ceiling
    #[arg(long, default_value = "1000")]
    rate_limit_window_ms: u64,

    /// Default log level (overridden by RUST_LOG)
    #[arg(long, default_value = "debug")]
    log_level: String,
}

impl Args {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            grace_period: Duration::from_secs(self.grace_period_secs),
            match_retry_interval: Duration::from_millis(self.match_retry_ms),
            match_retry_jitter: DEFAULT_MATCH_RETRY_JITTER,
            dedup_window: Duration::from_millis(self.dedup_window_ms),
            max_buffered_messages: self.max_buffered_messages,
            rate_limit_max_events: self.rate_limit_events,
            rate_limit_window: Duration::from_millis(self.rate_limit_window_ms),
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let config = args.engine_config();
    tracing::info!("Engine config: {:?}", config);

    // Initialize dependencies in order:
    // 1. ChatStore
    // 2. MessagePusher
    // 3. UseCases (AppState)
    // 4. Server

    // 1. Create ChatStore (in-memory database)
    let store = Arc::new(InMemoryChatStore::new());

    // 2. Create MessagePusher (WebSocket implementation)
    let pusher = Arc::new(WebSocketMessagePusher::new());

    // 3. Create UseCases
    let state = Arc::new(AppState::new(store, pusher, Arc::new(SystemClock), config));

    // 4. Create and run the server
    let server = Server::new(state);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
