//! Serializes outbound events and hands them to the MessagePusher.
//!
//! Delivery failures are logged, never propagated: a closed tab must not
//! abort the operation that produced the event.

use std::sync::Arc;

use crate::{
    domain::{ConnectionId, GroupId, MessagePusher, RoomId, UserId},
    infrastructure::dto::websocket::ServerEvent,
};

#[derive(Clone)]
pub struct EventEmitter {
    pusher: Arc<dyn MessagePusher>,
}

impl EventEmitter {
    pub fn new(pusher: Arc<dyn MessagePusher>) -> Self {
        Self { pusher }
    }

    pub fn pusher(&self) -> &Arc<dyn MessagePusher> {
        &self.pusher
    }

    fn encode(event: &ServerEvent) -> Option<String> {
        match event.to_json() {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::error!("Failed to serialize event {:?}: {}", event, e);
                None
            }
        }
    }

    pub async fn to_connection(&self, connection_id: &ConnectionId, event: &ServerEvent) {
        let Some(json) = Self::encode(event) else {
            return;
        };
        if let Err(e) = self.pusher.push_to(connection_id, &json).await {
            tracing::warn!("Failed to push to connection '{}': {}", connection_id, e);
        }
    }

    pub async fn to_user(&self, user_id: &UserId, event: &ServerEvent) {
        let Some(json) = Self::encode(event) else {
            return;
        };
        if let Err(e) = self.pusher.emit_to_user(user_id, &json).await {
            tracing::warn!("Failed to emit to user '{}': {}", user_id, e);
        }
    }

    pub async fn to_room(&self, room_id: &RoomId, event: &ServerEvent) {
        let Some(json) = Self::encode(event) else {
            return;
        };
        if let Err(e) = self.pusher.emit_to_group(&GroupId::room(room_id), &json).await {
            tracing::warn!("Failed to emit to room '{}': {}", room_id, e);
        }
    }

    /// Join every listed connection to the room's group
    pub async fn join_room(&self, connections: &[ConnectionId], room_id: &RoomId) {
        let group = GroupId::room(room_id);
        for connection_id in connections {
            self.pusher.join_group(connection_id, &group).await;
        }
    }

    pub async fn dissolve_room(&self, room_id: &RoomId) {
        self.pusher.remove_group(&GroupId::room(room_id)).await;
    }
}
