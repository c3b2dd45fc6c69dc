//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの `UnboundedSender` を管理
//! - 接続のグループ（ユーザー単位・Room 単位）への参加・退出
//! - 接続・グループ単位でのメッセージ送信
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行われ、
//! この実装は生成された sender を受け取って送信にだけ使用します。

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, GroupId, MessagePushError, MessagePusher, PusherChannel};

#[derive(Default)]
struct Channels {
    /// connection -> outbound sender
    senders: HashMap<ConnectionId, PusherChannel>,
    /// group -> member connections
    groups: HashMap<GroupId, HashSet<ConnectionId>>,
    /// connection -> joined groups (for cleanup on unregister)
    memberships: HashMap<ConnectionId, HashSet<GroupId>>,
}

impl Channels {
    fn detach(&mut self, connection_id: &ConnectionId, group: &GroupId) {
        if let Some(members) = self.groups.get_mut(group) {
            members.remove(connection_id);
            if members.is_empty() {
                self.groups.remove(group);
            }
        }
    }
}

/// WebSocket を使った MessagePusher 実装
#[derive(Default)]
pub struct WebSocketMessagePusher {
    channels: Mutex<Channels>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }

    /// グループに参加している接続数
    pub async fn group_size(&self, group: &GroupId) -> usize {
        let channels = self.channels.lock().await;
        channels.groups.get(group).map_or(0, HashSet::len)
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_connection(&self, connection_id: ConnectionId, sender: PusherChannel) {
        let mut channels = self.channels.lock().await;
        channels.senders.insert(connection_id, sender);
        tracing::debug!("Connection '{}' registered to MessagePusher", connection_id);
    }

    async fn unregister_connection(&self, connection_id: &ConnectionId) {
        let mut channels = self.channels.lock().await;
        channels.senders.remove(connection_id);
        let groups = channels
            .memberships
            .remove(connection_id)
            .unwrap_or_default();
        for group in &groups {
            channels.detach(connection_id, group);
        }
        tracing::debug!(
            "Connection '{}' unregistered from MessagePusher ({} groups left)",
            connection_id,
            groups.len()
        );
    }

    async fn join_group(&self, connection_id: &ConnectionId, group: &GroupId) {
        let mut channels = self.channels.lock().await;
        if !channels.senders.contains_key(connection_id) {
            tracing::warn!(
                "Connection '{}' is not registered, cannot join '{}'",
                connection_id,
                group
            );
            return;
        }
        channels
            .groups
            .entry(group.clone())
            .or_default()
            .insert(*connection_id);
        channels
            .memberships
            .entry(*connection_id)
            .or_default()
            .insert(group.clone());
        tracing::debug!("Connection '{}' joined '{}'", connection_id, group);
    }

    async fn leave_group(&self, connection_id: &ConnectionId, group: &GroupId) {
        let mut channels = self.channels.lock().await;
        channels.detach(connection_id, group);
        if let Some(groups) = channels.memberships.get_mut(connection_id) {
            groups.remove(group);
        }
    }

    async fn remove_group(&self, group: &GroupId) {
        let mut channels = self.channels.lock().await;
        let members = channels.groups.remove(group).unwrap_or_default();
        for connection_id in &members {
            if let Some(groups) = channels.memberships.get_mut(connection_id) {
                groups.remove(group);
            }
        }
        tracing::debug!("Group '{}' removed ({} connections)", group, members.len());
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let channels = self.channels.lock().await;

        let sender = channels
            .senders
            .get(connection_id)
            .ok_or_else(|| MessagePushError::ConnectionNotFound(connection_id.to_string()))?;
        sender
            .send(content.to_string())
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
        tracing::debug!("Pushed message to connection '{}'", connection_id);
        Ok(())
    }

    async fn emit_to_group(&self, group: &GroupId, content: &str) -> Result<(), MessagePushError> {
        let channels = self.channels.lock().await;

        let Some(members) = channels.groups.get(group) else {
            tracing::debug!("Group '{}' has no connections, nothing to emit", group);
            return Ok(());
        };

        for connection_id in members {
            // グループ送信では一部の送信失敗を許容
            match channels.senders.get(connection_id) {
                Some(sender) => {
                    if let Err(e) = sender.send(content.to_string()) {
                        tracing::warn!(
                            "Failed to push message to connection '{}': {}",
                            connection_id,
                            e
                        );
                    }
                }
                None => tracing::warn!(
                    "Connection '{}' not found while emitting to '{}', skipping",
                    connection_id,
                    group
                ),
            }
        }
        tracing::debug!("Emitted message to '{}' ({} connections)", group, members.len());

        Ok(())
    }

    async fn connection_count(&self) -> usize {
        self.channels.lock().await.senders.len()
    }
}
