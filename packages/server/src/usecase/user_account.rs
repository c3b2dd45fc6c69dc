//! UseCase: ユーザー登録とフレンド管理（HTTP 経由）

use std::sync::Arc;

use crate::domain::{ChatStore, User, UserId};

use super::error::ChatError;

/// ユーザー登録のユースケース
pub struct CreateUserUseCase {
    store: Arc<dyn ChatStore>,
}

impl CreateUserUseCase {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    /// 新しい ID でユーザーを作成
    pub async fn execute(&self, name: &str) -> Result<User, ChatError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChatError::Validation("userName is required".to_string()));
        }

        let user = User::new(UserId::generate(), name.to_string());
        self.store.save_user(user.clone()).await?;
        tracing::info!("Created user '{}' ({})", user.id, user.name);
        Ok(user)
    }
}

/// フレンド関係を双方向に設定・解除
async fn set_friendship(
    store: &dyn ChatStore,
    user_id: &UserId,
    friend_id: &UserId,
    friends: bool,
) -> Result<(), ChatError> {
    if user_id == friend_id {
        return Err(ChatError::Validation("Cannot befriend yourself".to_string()));
    }
    if !store.set_friendship(user_id, friend_id, friends).await? {
        return Err(ChatError::NotFound("User not found".to_string()));
    }
    Ok(())
}

/// フレンド追加のユースケース（相互に登録）
pub struct AddFriendUseCase {
    store: Arc<dyn ChatStore>,
}

impl AddFriendUseCase {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, user_id: &UserId, friend_id: &UserId) -> Result<(), ChatError> {
        set_friendship(self.store.as_ref(), user_id, friend_id, true).await
    }
}

/// フレンド解除のユースケース（相互に解除）
pub struct RemoveFriendUseCase {
    store: Arc<dyn ChatStore>,
}

impl RemoveFriendUseCase {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, user_id: &UserId, friend_id: &UserId) -> Result<(), ChatError> {
        set_friendship(self.store.as_ref(), user_id, friend_id, false).await
    }
}

/// フレンド一覧取得のユースケース
pub struct GetFriendsUseCase {
    store: Arc<dyn ChatStore>,
}

impl GetFriendsUseCase {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    /// 登録済みのフレンドだけを返す（削除されたユーザーは含めない）
    pub async fn execute(&self, user_id: &UserId) -> Result<Vec<User>, ChatError> {
        let Some(user) = self.store.find_user(user_id).await? else {
            return Err(ChatError::NotFound("User not found".to_string()));
        };

        let mut friends = Vec::with_capacity(user.friends.len());
        for friend_id in &user.friends {
            if let Some(friend) = self.store.find_user(friend_id).await? {
                friends.push(friend);
            }
        }
        Ok(friends)
    }
}
