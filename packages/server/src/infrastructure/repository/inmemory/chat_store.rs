//! InMemory ChatStore 実装
//!
//! ドメイン層が定義する ChatStore trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。
//! チャット履歴は参加者 2 人のソート済みペアをキーとして保持します。

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Chat, ChatMessage, ChatStore, StoreError, Timestamp, User, UserId};

type ChatKey = (UserId, UserId);

fn chat_key(a: &UserId, b: &UserId) -> ChatKey {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// インメモリ ChatStore 実装
#[derive(Default)]
pub struct InMemoryChatStore {
    users: Mutex<HashMap<UserId, User>>,
    chats: Mutex<HashMap<ChatKey, Chat>>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// ユーザーを登録済みの状態で作成
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let users = users.into_iter().map(|u| (u.id.clone(), u)).collect();
        Self {
            users: Mutex::new(users),
            chats: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn find_user(&self, user_id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.lock().await.get(user_id).cloned())
    }

    async fn save_user(&self, user: User) -> Result<(), StoreError> {
        self.users.lock().await.insert(user.id.clone(), user);
        Ok(())
    }

    async fn set_friendship(
        &self,
        a: &UserId,
        b: &UserId,
        friends: bool,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.lock().await;
        if !users.contains_key(a) || !users.contains_key(b) {
            return Ok(false);
        }
        for (id, other) in [(a, b), (b, a)] {
            if let Some(user) = users.get_mut(id) {
                if friends {
                    user.friends.insert(other.clone());
                } else {
                    user.friends.remove(other);
                }
            }
        }
        Ok(true)
    }

    async fn friends_of(&self, user_id: &UserId) -> Result<BTreeSet<UserId>, StoreError> {
        let users = self.users.lock().await;
        Ok(users
            .get(user_id)
            .map(|u| u.friends.clone())
            .unwrap_or_default())
    }

    async fn find_chat_between(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Option<Chat>, StoreError> {
        Ok(self.chats.lock().await.get(&chat_key(a, b)).cloned())
    }

    async fn append_messages(
        &self,
        a: &UserId,
        b: &UserId,
        messages: Vec<ChatMessage>,
    ) -> Result<(), StoreError> {
        let mut chats = self.chats.lock().await;
        chats
            .entry(chat_key(a, b))
            .or_insert_with(|| Chat::new(a.clone(), b.clone()))
            .messages
            .extend(messages);
        Ok(())
    }

    async fn mark_seen(
        &self,
        a: &UserId,
        b: &UserId,
        sender_id: &UserId,
        timestamp: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut chats = self.chats.lock().await;
        let Some(chat) = chats.get_mut(&chat_key(a, b)) else {
            return Ok(false);
        };
        let found = chat
            .messages
            .iter_mut()
            .find(|m| &m.sender_id == sender_id && m.timestamp == timestamp);
        Ok(found.map(|m| m.seen = true).is_some())
    }
}
