//! Domain entities.

use std::collections::BTreeSet;

use serde::Serialize;

use super::value_object::{MessageText, RoomId, RoomKind, Timestamp, UserId};

/// A one-to-one chat room.
///
/// Members are stored in sorted order so that the same pair always yields an
/// identical value, independent of who initiated the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Room {
    pub id: RoomId,
    pub kind: RoomKind,
    pub member_a: UserId,
    pub member_b: UserId,
}

impl Room {
    pub fn new(a: UserId, b: UserId, kind: RoomKind) -> Self {
        let id = RoomId::derive(kind, &a, &b);
        let (member_a, member_b) = if a <= b { (a, b) } else { (b, a) };
        Self {
            id,
            kind,
            member_a,
            member_b,
        }
    }

    /// The other member of the room, or `None` if `user_id` is not a member
    pub fn partner_of(&self, user_id: &UserId) -> Option<&UserId> {
        if &self.member_a == user_id {
            Some(&self.member_b)
        } else if &self.member_b == user_id {
            Some(&self.member_a)
        } else {
            None
        }
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.partner_of(user_id).is_some()
    }

    pub fn members(&self) -> [&UserId; 2] {
        [&self.member_a, &self.member_b]
    }
}

/// A chat message.
///
/// Used both for the ephemeral buffer of random rooms and for transcripts in
/// the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub sender_id: UserId,
    pub text: MessageText,
    pub timestamp: Timestamp,
    pub seen: bool,
}

impl ChatMessage {
    pub fn new(sender_id: UserId, text: MessageText, timestamp: Timestamp) -> Self {
        Self {
            sender_id,
            text,
            timestamp,
            seen: false,
        }
    }

    /// Same sender and identical text
    pub fn is_same_delivery(&self, other: &ChatMessage) -> bool {
        self.sender_id == other.sender_id && self.text == other.text
    }
}

/// A registered user as seen through the durable store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub friends: BTreeSet<UserId>,
}

impl User {
    pub fn new(id: UserId, name: String) -> Self {
        Self {
            id,
            name,
            friends: BTreeSet::new(),
        }
    }

    pub fn is_friend_of(&self, other: &UserId) -> bool {
        self.friends.contains(other)
    }
}

/// Persistent transcript between two friends
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chat {
    pub participants: [UserId; 2],
    pub messages: Vec<ChatMessage>,
}

impl Chat {
    pub fn new(a: UserId, b: UserId) -> Self {
        let participants = if a <= b { [a, b] } else { [b, a] };
        Self {
            participants,
            messages: Vec::new(),
        }
    }
}
