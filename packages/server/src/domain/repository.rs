//! Durable store trait 定義
//!
//! ユーザー・フレンド関係・チャット履歴の永続化はこのコアの外部にあります。
//! ドメイン層が必要とするインターフェースだけをここで定義し、
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use std::collections::BTreeSet;

use async_trait::async_trait;

use super::{
    entity::{Chat, ChatMessage, User},
    error::StoreError,
    value_object::{Timestamp, UserId},
};

/// Durable store of users, friendships and friend-chat transcripts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// ユーザーを ID で取得
    async fn find_user(&self, user_id: &UserId) -> Result<Option<User>, StoreError>;

    /// ユーザーを保存（存在すれば上書き）
    async fn save_user(&self, user: User) -> Result<(), StoreError>;

    /// 2 人のフレンド関係を双方向に一括で設定・解除
    ///
    /// 片方だけが更新された状態は残さない。どちらかが未登録なら何も変更せず
    /// `Ok(false)` を返す
    async fn set_friendship(
        &self,
        a: &UserId,
        b: &UserId,
        friends: bool,
    ) -> Result<bool, StoreError>;

    /// フレンドの ID 一覧を取得（未登録ユーザーは空集合）
    async fn friends_of(&self, user_id: &UserId) -> Result<BTreeSet<UserId>, StoreError>;

    /// 2 人の間のチャット履歴を取得
    async fn find_chat_between(&self, a: &UserId, b: &UserId)
    -> Result<Option<Chat>, StoreError>;

    /// 2 人の間のチャット履歴にメッセージを追加（履歴がなければ作成）
    async fn append_messages(
        &self,
        a: &UserId,
        b: &UserId,
        messages: Vec<ChatMessage>,
    ) -> Result<(), StoreError>;

    /// `sender_id` が `timestamp` に送信したメッセージを既読にする
    ///
    /// 該当メッセージが存在しない場合は `Ok(false)` を返す
    async fn mark_seen(
        &self,
        a: &UserId,
        b: &UserId,
        sender_id: &UserId,
        timestamp: Timestamp,
    ) -> Result<bool, StoreError>;
}
