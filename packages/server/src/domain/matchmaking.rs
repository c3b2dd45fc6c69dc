//! Matchmaking engine aggregate
//!
//! Room Registry, Search Queue, Message Buffer and Presence Tracker are
//! owned together so that every multi-step read-modify-write (match commit,
//! room close, grace expiry) happens under a single lock acquisition.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use super::{
    entity::{ChatMessage, Room},
    error::{MatchError, QueueError, RoomError},
    message_buffer::{AppendOutcome, MessageBuffer},
    presence::PresenceTracker,
    room_registry::RoomRegistry,
    search_queue::SearchQueue,
    value_object::{ConnectionId, RoomId, RoomKind, Timestamp, UserId},
};

/// Engine state shared between handlers and background tasks
pub type SharedMatchmakingState = Arc<Mutex<MatchmakingState>>;

/// Result of binding a connection to a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindResult {
    /// The user had no other live connection
    pub first_connection: bool,
    /// The room the user currently belongs to, if any
    pub room: Option<Room>,
    /// A pending grace period was cancelled by this bind
    pub grace_cancelled: bool,
}

/// Result of unbinding a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnbindResult {
    pub user_id: UserId,
    pub remaining_connections: usize,
    /// The user was removed from the search queue
    pub left_queue: bool,
    /// A new grace period was armed and must be scheduled by the caller
    pub grace_armed: bool,
}

/// Outcome of a grace period expiring
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraceOutcome {
    /// The user came back before expiry
    Reconnected,
    /// The room was already gone
    AlreadyClosed,
    /// Confirmed disconnect; the room has been closed
    Disconnected(Room),
}

/// Result of opening a friend room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendRoomOpened {
    pub room: Room,
    /// The identical room already existed
    pub reopened: bool,
    /// Users removed from the search queue by this call
    pub dequeued: Vec<UserId>,
}

/// Point-in-time view of the engine, for diagnostics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub searching: Vec<UserId>,
    pub rooms: Vec<Room>,
    pub buffered_messages: usize,
    pub online_users: usize,
    pub connections: usize,
    pub pending_grace: usize,
}

#[derive(Debug)]
pub struct MatchmakingState {
    registry: RoomRegistry,
    queue: SearchQueue,
    buffer: MessageBuffer,
    presence: PresenceTracker,
}

impl MatchmakingState {
    pub fn new(dedup_window_millis: i64, max_buffered_messages: usize) -> Self {
        Self {
            registry: RoomRegistry::new(),
            queue: SearchQueue::new(),
            buffer: MessageBuffer::new(dedup_window_millis, max_buffered_messages),
            presence: PresenceTracker::new(),
        }
    }

    pub fn shared(dedup_window_millis: i64, max_buffered_messages: usize) -> SharedMatchmakingState {
        Arc::new(Mutex::new(Self::new(dedup_window_millis, max_buffered_messages)))
    }

    // --- search queue ---

    /// Enqueue `user_id` as a searcher
    pub fn start_search(&mut self, user_id: &UserId) -> Result<(), QueueError> {
        if self.registry.contains(user_id) {
            return Err(QueueError::AlreadyInRoom(user_id.clone()));
        }
        if !self.queue.enqueue(user_id.clone()) {
            return Err(QueueError::AlreadySearching(user_id.clone()));
        }
        Ok(())
    }

    /// Idempotent removal from the search queue
    pub fn stop_search(&mut self, user_id: &UserId) -> bool {
        self.queue.dequeue(user_id)
    }

    pub fn is_searching(&self, user_id: &UserId) -> bool {
        self.queue.contains(user_id)
    }

    /// Candidates for `user_id` in queue order, excluding self and anyone
    /// already holding a room. Friendship is checked by the caller.
    pub fn match_candidates(&self, user_id: &UserId) -> Vec<UserId> {
        if !self.queue.contains(user_id) {
            return Vec::new();
        }
        self.queue
            .iter()
            .filter(|candidate| *candidate != user_id && !self.registry.contains(candidate))
            .cloned()
            .collect()
    }

    /// Pair `user_id` with `candidate` after re-validating both are still queued.
    ///
    /// When the candidate has no live connection it is dropped from the queue
    /// and `user_id` stays queued.
    pub fn commit_match(&mut self, user_id: &UserId, candidate: &UserId) -> Result<Room, MatchError> {
        for party in [user_id, candidate] {
            if !self.queue.contains(party) {
                return Err(MatchError::NotSearching(party.clone()));
            }
        }
        if !self.presence.is_online(candidate) {
            self.queue.dequeue(candidate);
            return Err(MatchError::PartnerUnavailable(candidate.clone()));
        }

        let room = self
            .registry
            .create_room(user_id.clone(), candidate.clone(), RoomKind::Random)?;
        self.queue.dequeue(user_id);
        self.queue.dequeue(candidate);
        self.buffer.open(room.id.clone());

        Ok(room)
    }

    // --- rooms ---

    /// Open (or re-open) the friend room of `user_id` and `friend_id`.
    ///
    /// Both users leave the search queue.
    pub fn open_friend_room(
        &mut self,
        user_id: &UserId,
        friend_id: &UserId,
    ) -> Result<FriendRoomOpened, RoomError> {
        if let Some(existing) = self.registry.get(user_id) {
            if existing.kind == RoomKind::Friend && existing.contains(friend_id) {
                return Ok(FriendRoomOpened {
                    room: existing.clone(),
                    reopened: true,
                    dequeued: Vec::new(),
                });
            }
            return Err(RoomError::AlreadyInRoom(user_id.clone()));
        }

        let room = self
            .registry
            .create_room(user_id.clone(), friend_id.clone(), RoomKind::Friend)?;
        let dequeued = [user_id, friend_id]
            .into_iter()
            .filter(|u| self.queue.dequeue(u))
            .cloned()
            .collect();

        Ok(FriendRoomOpened {
            room,
            reopened: false,
            dequeued,
        })
    }

    pub fn room_of(&self, user_id: &UserId) -> Option<&Room> {
        self.registry.get(user_id)
    }

    /// The room of `user_id` if its recorded partner is `claimed_partner`
    pub fn resolve_room(&self, user_id: &UserId, claimed_partner: &UserId) -> Option<&Room> {
        self.registry
            .get(user_id)
            .filter(|room| room.partner_of(user_id) == Some(claimed_partner))
    }

    /// Close the room of `user_id`, clearing the buffer of a random room
    pub fn close_room(&mut self, user_id: &UserId) -> Option<Room> {
        let room = self.registry.close(user_id)?;
        if room.kind == RoomKind::Random {
            self.buffer.clear(&room.id);
        }
        Some(room)
    }

    // --- message buffer ---

    pub fn buffer_message(&mut self, room_id: &RoomId, message: ChatMessage) -> AppendOutcome {
        self.buffer.append(room_id, message)
    }

    pub fn drain_messages(&self, room_id: &RoomId) -> Vec<ChatMessage> {
        self.buffer.drain(room_id)
    }

    pub fn mark_buffered_seen(
        &mut self,
        room_id: &RoomId,
        sender_id: &UserId,
        timestamp: Timestamp,
    ) -> bool {
        self.buffer.mark_seen(room_id, sender_id, timestamp)
    }

    // --- presence ---

    /// Bind `connection_id` to `user_id`, cancelling any pending grace period
    pub fn bind(&mut self, connection_id: ConnectionId, user_id: &UserId) -> BindResult {
        let first_connection = self.presence.bind(connection_id, user_id.clone());
        let grace_cancelled = self.presence.clear_grace(user_id);
        BindResult {
            first_connection,
            room: self.registry.get(user_id).cloned(),
            grace_cancelled,
        }
    }

    /// Unbind `connection_id`.
    ///
    /// When it was the user's last connection the user leaves the search
    /// queue, and a grace period is armed if they still hold a room.
    pub fn unbind(&mut self, connection_id: &ConnectionId) -> Option<UnbindResult> {
        let (user_id, remaining_connections) = self.presence.unbind(connection_id)?;

        let mut left_queue = false;
        let mut grace_armed = false;
        if remaining_connections == 0 {
            left_queue = self.queue.dequeue(&user_id);
            if self.registry.contains(&user_id) {
                grace_armed = self.presence.arm_grace(user_id.clone());
            }
        }

        Some(UnbindResult {
            user_id,
            remaining_connections,
            left_queue,
            grace_armed,
        })
    }

    /// Grace period of `user_id` elapsed: confirm or discard the disconnect
    pub fn expire_grace(&mut self, user_id: &UserId) -> GraceOutcome {
        self.presence.clear_grace(user_id);
        if self.presence.is_online(user_id) {
            return GraceOutcome::Reconnected;
        }

        self.queue.dequeue(user_id);
        match self.close_room(user_id) {
            Some(room) => GraceOutcome::Disconnected(room),
            None => GraceOutcome::AlreadyClosed,
        }
    }

    pub fn connections_of(&self, user_id: &UserId) -> Vec<ConnectionId> {
        self.presence.connections_of(user_id)
    }

    pub fn user_of(&self, connection_id: &ConnectionId) -> Option<&UserId> {
        self.presence.user_of(connection_id)
    }

    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.presence.is_online(user_id)
    }

    pub fn has_pending_grace(&self, user_id: &UserId) -> bool {
        self.presence.has_pending_grace(user_id)
    }

    // --- diagnostics ---

    pub fn snapshot(&self) -> StateSnapshot {
        let mut rooms: Vec<Room> = self.registry.rooms().cloned().collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        StateSnapshot {
            searching: self.queue.iter().cloned().collect(),
            rooms,
            buffered_messages: self.buffer.message_count(),
            online_users: self.presence.online_user_count(),
            connections: self.presence.connection_count(),
            pending_grace: self.presence.pending_grace_count(),
        }
    }

    /// Queue and registry are disjoint, the registry is symmetric, and every
    /// open buffer belongs to a live random room.
    pub fn is_consistent(&self) -> bool {
        let disjoint = self.queue.iter().all(|u| !self.registry.contains(u));
        let buffers_owned = self.buffer.room_ids().all(|room_id| {
            self.registry
                .rooms()
                .any(|room| &room.id == room_id && room.kind == RoomKind::Random)
        });
        disjoint && buffers_owned && self.registry.is_symmetric()
    }
}
