//! Value objects
//!
//! 境界で検証済みの値だけがドメイン層に入るよう、生成時に検証を行います。

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use super::error::ValueObjectError;

/// Length of a user identifier in hex characters
pub const USER_ID_LENGTH: usize = 24;

/// Maximum length of a chat message in characters
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Stable user identity (24 hex characters, stored lowercase)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// 新しい UserId を作成（24 桁の 16 進数のみ許可）
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.len() == USER_ID_LENGTH && value.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(value.to_ascii_lowercase()))
        } else {
            Err(ValueObjectError::InvalidUserId(value))
        }
    }

    /// ランダムな UserId を生成
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(hex[..USER_ID_LENGTH].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a single realtime connection (one tab or device)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a chat room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    /// Ephemeral chat between two matched strangers
    Random,
    /// Chat between confirmed friends, backed by the durable store
    Friend,
}

impl RoomKind {
    /// Separator used when deriving the room id. Differs per kind so that a
    /// random and a friend room between the same two users never collide.
    pub fn separator(self) -> char {
        match self {
            RoomKind::Random => '-',
            RoomKind::Friend => '_',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoomKind::Random => "random",
            RoomKind::Friend => "friend",
        }
    }
}

/// Deterministic room identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Derive the room id from the two member ids.
    ///
    /// The ids are sorted so both parties (and any replaying client) compute
    /// the same value.
    pub fn derive(kind: RoomKind, a: &UserId, b: &UserId) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{}{}{}", first, kind.separator(), second))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Chat message body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MessageText(String);

impl MessageText {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyMessage);
        }
        let len = value.chars().count();
        if len > MAX_MESSAGE_LENGTH {
            return Err(ValueObjectError::MessageTooLong {
                len,
                max: MAX_MESSAGE_LENGTH,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageText {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Unix timestamp in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Absolute distance to another timestamp in milliseconds
    pub fn distance_millis(&self, other: &Timestamp) -> i64 {
        self.0.abs_diff(other.0).try_into().unwrap_or(i64::MAX)
    }
}
