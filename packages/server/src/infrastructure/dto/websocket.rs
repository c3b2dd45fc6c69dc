//! WebSocket event DTOs.
//!
//! Every frame is a JSON object whose `type` field names the event.
//! Ids are carried as raw strings and validated when converted into
//! value objects.

use serde::{Deserialize, Serialize};

/// Inbound events sent by a client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    SetUsername(SetUsernamePayload),
    StartSearch(UserPayload),
    StopSearch(UserPayload),
    StartFriendChat(FriendPairPayload),
    LeaveFriendChat(FriendPairPayload),
    LeaveChat(LeaveChatPayload),
    SendMessage(SendMessagePayload),
    Typing(TypingPayload),
    MessageSeen(MessageSeenPayload),
    FriendRequestSent(FriendRequestSentPayload),
    FriendRequestAccepted(FriendPairPayload),
    FriendRequestRejected(FriendPairPayload),
}

impl ClientEvent {
    /// Event name as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::SetUsername(_) => "set_username",
            ClientEvent::StartSearch(_) => "start_search",
            ClientEvent::StopSearch(_) => "stop_search",
            ClientEvent::StartFriendChat(_) => "start_friend_chat",
            ClientEvent::LeaveFriendChat(_) => "leave_friend_chat",
            ClientEvent::LeaveChat(_) => "leave_chat",
            ClientEvent::SendMessage(_) => "send_message",
            ClientEvent::Typing(_) => "typing",
            ClientEvent::MessageSeen(_) => "message_seen",
            ClientEvent::FriendRequestSent(_) => "friend_request_sent",
            ClientEvent::FriendRequestAccepted(_) => "friend_request_accepted",
            ClientEvent::FriendRequestRejected(_) => "friend_request_rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetUsernamePayload {
    pub user_id: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendPairPayload {
    pub user_id: String,
    pub friend_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveChatPayload {
    pub to_user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub from_user_id: String,
    pub to_user_id: String,
    pub message: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub from_user_id: String,
    pub to_user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSeenPayload {
    pub from_user_id: String,
    pub to_user_id: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestSentPayload {
    pub from_user_id: String,
    pub to_user_id: String,
    #[serde(default)]
    pub from_username: Option<String>,
}

/// Transcript entry carried by `chat_history`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMessage {
    pub sender_id: String,
    pub text: String,
    pub timestamp: i64,
    pub seen: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendRequestState {
    Sent,
    Rejected,
}

/// Outbound events sent by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    MatchFound {
        partner_id: String,
        partner_name: String,
        room_id: String,
        kind: String,
    },
    ChatReady {
        room_id: String,
    },
    FriendChatStarted {
        partner_id: String,
        partner_name: String,
        room_id: String,
    },
    ChatHistory {
        messages: Vec<HistoryMessage>,
    },
    PartnerDisconnected {
        disconnected_user_id: String,
    },
    ReceiveMessage {
        message: String,
        from_user_id: String,
        timestamp: i64,
    },
    PartnerTyping {
        from_user_id: String,
    },
    MessageSeen {
        from_user_id: String,
        timestamp: i64,
    },
    FriendRequestStatus {
        from_user_id: String,
        to_user_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        from_username: Option<String>,
        status: FriendRequestState,
    },
    FriendRequestReceived {
        from_user_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        from_username: Option<String>,
    },
    FriendRequestAccepted {
        user_id: String,
        friend_id: String,
    },
    Error {
        message: String,
        code: String,
    },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>, code: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
            code: code.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
