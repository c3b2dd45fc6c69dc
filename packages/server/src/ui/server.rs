//! Server execution logic.

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::{
    handler::{
        add_friend, create_user, debug_state, get_chat_history, get_friends, health_check,
        mark_message_seen, remove_friend, send_friend_message, validate_random_message,
        websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Matchmaking and chat server
///
/// # Example
///
/// ```ignore
/// let state = Arc::new(AppState::new(store, pusher, clock, EngineConfig::default()));
/// Server::new(state).run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Build the router with every endpoint
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/chats/send", post(send_friend_message))
            .route("/api/chats/send-random", post(validate_random_message))
            .route("/api/chats/seen", post(mark_message_seen))
            .route("/api/chats/{user_id}/{friend_id}", get(get_chat_history))
            .route("/api/users/create", post(create_user))
            .route("/api/users/add-friend", post(add_friend))
            .route(
                "/api/users/remove-friend/{user_id}/{friend_id}",
                delete(remove_friend),
            )
            .route("/api/users/friends/{user_id}", get(get_friends))
            .route("/debug/state", get(debug_state))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind to `host:port` and serve until a shutdown signal arrives
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<(), Box<dyn std::error::Error>> {
        let addr = listener.local_addr()?;
        tracing::info!("Matchmaking server listening on {}", addr);
        tracing::info!("Connect to: ws://{}/ws", addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}
