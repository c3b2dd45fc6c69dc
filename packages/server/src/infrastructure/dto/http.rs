//! HTTP API request and response DTOs.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/chats/send`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendFriendMessageRequest {
    pub user_id: String,
    pub friend_id: String,
    pub message: String,
}

/// Body of `POST /api/chats/send-random`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRandomMessageRequest {
    pub user_id: String,
    pub partner_id: String,
    pub message: String,
}

/// Body of `POST /api/chats/seen`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSeenRequest {
    pub user_id: String,
    pub friend_id: String,
    pub timestamp: i64,
}

/// Body of `POST /api/users/create`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    #[serde(alias = "userName")]
    pub user_name: String,
}

/// Body of `POST /api/users/add-friend`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendPairRequest {
    pub user_id: String,
    pub friend_id: String,
}

/// Generic acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error body returned with a non-2xx status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: String,
}

/// Transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageDto {
    pub sender_id: String,
    pub text: String,
    /// Unix milliseconds
    pub timestamp: i64,
    /// RFC 3339
    pub sent_at: String,
    pub seen: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatHistoryResponse {
    pub messages: Vec<ChatMessageDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub user_name: String,
    pub friends: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUserResponse {
    pub user: UserDto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendsResponse {
    pub friends: Vec<UserDto>,
}
