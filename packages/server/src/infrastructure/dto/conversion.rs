//! Conversion logic between domain entities and DTOs.

use deai_shared::time::timestamp_to_rfc3339;

use crate::domain::entity::{ChatMessage, User};
use crate::infrastructure::dto::{http, websocket};

// ========================================
// Domain Entity → DTO
// ========================================

impl From<ChatMessage> for websocket::HistoryMessage {
    fn from(model: ChatMessage) -> Self {
        Self {
            sender_id: model.sender_id.into_string(),
            text: model.text.into_string(),
            timestamp: model.timestamp.value(),
            seen: model.seen,
        }
    }
}

impl From<ChatMessage> for http::ChatMessageDto {
    fn from(model: ChatMessage) -> Self {
        let timestamp = model.timestamp.value();
        Self {
            sender_id: model.sender_id.into_string(),
            text: model.text.into_string(),
            timestamp,
            sent_at: timestamp_to_rfc3339(timestamp),
            seen: model.seen,
        }
    }
}

impl From<User> for http::UserDto {
    fn from(model: User) -> Self {
        Self {
            id: model.id.into_string(),
            user_name: model.name,
            friends: model
                .friends
                .into_iter()
                .map(|friend| friend.into_string())
                .collect(),
        }
    }
}
