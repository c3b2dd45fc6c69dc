//! Axum router, handlers and shared application state.

mod handler;
mod rate_limit;
mod server;
mod signal;
pub mod state;

pub use server::Server;
pub use state::AppState;
