//! Session / Presence Tracker
//!
//! 接続 (ConnectionId) と論理ユーザー (UserId) の対応を管理します。
//! 1 ユーザーは複数の接続（タブ・端末）を持てます。
//! 最後の接続が切れたときに猶予期間を開始し、
//! 猶予期間中に再接続があればキャンセルできるよう保留中のユーザーを記録します。

use std::collections::{HashMap, HashSet};

use super::value_object::{ConnectionId, UserId};

#[derive(Debug, Default)]
pub struct PresenceTracker {
    connections: HashMap<ConnectionId, UserId>,
    bindings: HashMap<UserId, HashSet<ConnectionId>>,
    grace_pending: HashSet<UserId>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 接続をユーザーに紐付ける
    ///
    /// ユーザーの最初の接続であれば `true` を返す
    pub fn bind(&mut self, connection_id: ConnectionId, user_id: UserId) -> bool {
        if let Some(previous) = self.connections.insert(connection_id, user_id.clone()) {
            self.detach(&connection_id, &previous);
        }
        let connections = self.bindings.entry(user_id).or_default();
        connections.insert(connection_id);
        connections.len() == 1
    }

    /// 接続の紐付けを解除し、ユーザーと残りの接続数を返す
    pub fn unbind(&mut self, connection_id: &ConnectionId) -> Option<(UserId, usize)> {
        let user_id = self.connections.remove(connection_id)?;
        let remaining = self.detach(connection_id, &user_id);
        Some((user_id, remaining))
    }

    fn detach(&mut self, connection_id: &ConnectionId, user_id: &UserId) -> usize {
        let Some(connections) = self.bindings.get_mut(user_id) else {
            return 0;
        };
        connections.remove(connection_id);
        let remaining = connections.len();
        if remaining == 0 {
            self.bindings.remove(user_id);
        }
        remaining
    }

    pub fn user_of(&self, connection_id: &ConnectionId) -> Option<&UserId> {
        self.connections.get(connection_id)
    }

    /// ユーザーが 1 つ以上の接続を持っているか
    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.bindings.contains_key(user_id)
    }

    pub fn connections_of(&self, user_id: &UserId) -> Vec<ConnectionId> {
        self.bindings
            .get(user_id)
            .map(|connections| connections.iter().copied().collect())
            .unwrap_or_default()
    }

    /// 猶予期間を開始。既に保留中なら `false`
    pub fn arm_grace(&mut self, user_id: UserId) -> bool {
        self.grace_pending.insert(user_id)
    }

    /// 猶予期間を解除。保留中でなかったなら `false`
    pub fn clear_grace(&mut self, user_id: &UserId) -> bool {
        self.grace_pending.remove(user_id)
    }

    pub fn has_pending_grace(&self, user_id: &UserId) -> bool {
        self.grace_pending.contains(user_id)
    }

    pub fn online_user_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn pending_grace_count(&self) -> usize {
        self.grace_pending.len()
    }
}
