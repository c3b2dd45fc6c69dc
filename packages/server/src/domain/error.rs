//! Domain error types.

use thiserror::Error;

use super::value_object::UserId;

/// Value object construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("Invalid userId: '{0}'")]
    InvalidUserId(String),
    #[error("Message must not be empty")]
    EmptyMessage,
    #[error("Message is too long ({len} > {max} characters)")]
    MessageTooLong { len: usize, max: usize },
}

/// Room Registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("User '{0}' is already in a room")]
    AlreadyInRoom(UserId),
    #[error("User '{0}' cannot be paired with themselves")]
    SelfPairing(UserId),
}

/// Search Queue errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("User '{0}' is already searching")]
    AlreadySearching(UserId),
    #[error("User '{0}' is already in a room")]
    AlreadyInRoom(UserId),
}

/// Reasons a match commit is aborted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("User '{0}' is no longer searching")]
    NotSearching(UserId),
    #[error("Matched user '{0}' has no live connection")]
    PartnerUnavailable(UserId),
    #[error(transparent)]
    Room(#[from] RoomError),
}

/// Durable store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Realtime transport errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),
    #[error("Failed to push message: {0}")]
    PushFailed(String),
}
