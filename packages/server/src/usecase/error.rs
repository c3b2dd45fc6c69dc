//! UseCase 層のエラー定義
//!
//! 全てのエラーは回復可能でローカルに閉じます。操作は中止され、
//! 呼び出し元の接続にだけエラーが通知されます。

use thiserror::Error;

use crate::domain::{QueueError, RoomError, StoreError, ValueObjectError};

/// Errors surfaced to the originating connection or HTTP caller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// Malformed or missing identity or payload
    #[error("{0}")]
    Validation(String),
    /// Duplicate search or room start
    #[error("{0}")]
    AlreadyActive(String),
    /// Target is not a valid partner (already friends, not friends, ...)
    #[error("{0}")]
    NotEligible(String),
    /// Event references a room or partner that no longer matches
    #[error("{0}")]
    StaleRoom(String),
    /// Matched partner has no live connection
    #[error("{0}")]
    PartnerUnavailable(String),
    #[error("{0}")]
    NotFound(String),
    /// Durable store unreachable
    #[error("{0}")]
    Store(String),
}

impl ChatError {
    /// Machine readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::Validation(_) => "validation_error",
            ChatError::AlreadyActive(_) => "already_active",
            ChatError::NotEligible(_) => "not_eligible",
            ChatError::StaleRoom(_) => "stale_room",
            ChatError::PartnerUnavailable(_) => "partner_unavailable",
            ChatError::NotFound(_) => "not_found",
            ChatError::Store(_) => "server_error",
        }
    }
}

impl From<ValueObjectError> for ChatError {
    fn from(e: ValueObjectError) -> Self {
        ChatError::Validation(e.to_string())
    }
}

impl From<StoreError> for ChatError {
    fn from(e: StoreError) -> Self {
        tracing::error!("Store failure: {}", e);
        ChatError::Store("Server error".to_string())
    }
}

impl From<QueueError> for ChatError {
    fn from(_: QueueError) -> Self {
        ChatError::AlreadyActive("Already in a search or chat".to_string())
    }
}

impl From<RoomError> for ChatError {
    fn from(e: RoomError) -> Self {
        match e {
            RoomError::AlreadyInRoom(_) => {
                ChatError::AlreadyActive("Already in a search or chat".to_string())
            }
            RoomError::SelfPairing(_) => {
                ChatError::Validation("Cannot chat with yourself".to_string())
            }
        }
    }
}
