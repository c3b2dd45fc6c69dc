//! Room Registry
//!
//! "誰と誰が話しているか" の唯一の情報源です。
//! Room は両メンバーそれぞれのキーで登録され、常に対称であることを保証します。

use std::collections::HashMap;

use super::{
    entity::Room,
    error::RoomError,
    value_object::{RoomId, RoomKind, UserId},
};

/// Authoritative map from user identity to their current room
#[derive(Debug, Default)]
pub struct RoomRegistry {
    /// user -> room assignment (two entries per room)
    assignments: HashMap<UserId, RoomId>,
    /// room id -> room
    rooms: HashMap<RoomId, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room for `a` and `b`.
    ///
    /// Both entries are inserted together; on error nothing is inserted.
    pub fn create_room(&mut self, a: UserId, b: UserId, kind: RoomKind) -> Result<Room, RoomError> {
        if a == b {
            return Err(RoomError::SelfPairing(a));
        }
        for member in [&a, &b] {
            if self.assignments.contains_key(member) {
                return Err(RoomError::AlreadyInRoom(member.clone()));
            }
        }

        let room = Room::new(a, b, kind);
        self.assignments
            .insert(room.member_a.clone(), room.id.clone());
        self.assignments
            .insert(room.member_b.clone(), room.id.clone());
        self.rooms.insert(room.id.clone(), room.clone());

        Ok(room)
    }

    pub fn get(&self, user_id: &UserId) -> Option<&Room> {
        self.assignments
            .get(user_id)
            .and_then(|room_id| self.rooms.get(room_id))
    }

    pub fn partner_of(&self, user_id: &UserId) -> Option<&UserId> {
        self.get(user_id).and_then(|room| room.partner_of(user_id))
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.assignments.contains_key(user_id)
    }

    /// Remove both entries of `user_id`'s room.
    ///
    /// Returns the closed room, or `None` when there was nothing to close.
    pub fn close(&mut self, user_id: &UserId) -> Option<Room> {
        let room_id = self.assignments.get(user_id)?.clone();
        let room = self.rooms.remove(&room_id)?;
        self.assignments.remove(&room.member_a);
        self.assignments.remove(&room.member_b);
        Some(room)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Number of rooms (not entries)
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Every assignment resolves to a room whose partner resolves back to it.
    pub fn is_symmetric(&self) -> bool {
        self.assignments.iter().all(|(user_id, room_id)| {
            self.rooms.get(room_id).is_some_and(|room| {
                room.partner_of(user_id)
                    .is_some_and(|partner| self.assignments.get(partner) == Some(room_id))
            })
        }) && self.assignments.len() == self.rooms.len() * 2
    }
}
