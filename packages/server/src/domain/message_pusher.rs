//! MessagePusher trait 定義
//!
//! 論理ユーザーへの到達手段（複数接続の多重化）はこのコアの外部にあります。
//! 接続をグループに参加させ、グループ・ユーザー・接続単位で送信する
//! インターフェースだけをここで定義します。

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    error::MessagePushError,
    value_object::{ConnectionId, RoomId, UserId},
};

/// Outbound channel of a single connection (serialized JSON events)
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// Logical fan-out group of connections
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupId(String);

impl GroupId {
    /// Group containing every connection bound to `user_id`
    pub fn user(user_id: &UserId) -> Self {
        Self(format!("user:{}", user_id))
    }

    /// Group containing every connection of both room members
    pub fn room(room_id: &RoomId) -> Self {
        Self(format!("room:{}", room_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Realtime transport multiplexer
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続を登録
    async fn register_connection(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// 接続を登録解除（参加中の全グループからも退出）
    async fn unregister_connection(&self, connection_id: &ConnectionId);

    /// 接続をグループに参加させる
    async fn join_group(&self, connection_id: &ConnectionId, group: &GroupId);

    /// 接続をグループから退出させる
    async fn leave_group(&self, connection_id: &ConnectionId, group: &GroupId);

    /// グループを解散（全接続を退出させる）
    async fn remove_group(&self, group: &GroupId);

    /// 特定の接続に送信
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// グループ内の全接続に送信
    async fn emit_to_group(&self, group: &GroupId, content: &str) -> Result<(), MessagePushError>;

    /// ユーザーの全接続に送信
    async fn emit_to_user(&self, user_id: &UserId, content: &str) -> Result<(), MessagePushError> {
        self.emit_to_group(&GroupId::user(user_id), content).await
    }

    /// 登録中の接続数
    async fn connection_count(&self) -> usize;
}
