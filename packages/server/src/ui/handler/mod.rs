//! Request handlers.

mod http;
mod websocket;

pub use http::{
    add_friend, create_user, debug_state, get_chat_history, get_friends, health_check,
    mark_message_seen, remove_friend, send_friend_message, validate_random_message,
};
pub use websocket::websocket_handler;
