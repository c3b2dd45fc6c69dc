//! UseCase: フレンドチャットの開始と退出
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - StartFriendChatUseCase::execute() / LeaveFriendChatUseCase::execute()
//! - フレンド関係の確認、Room の作成、履歴の配信、退出時の通知
//!
//! ### なぜこのテストが必要か
//! - フレンドでないユーザー同士がフレンド Room を開けないことを保証する
//! - フレンドチャット開始で検索が取り消され、不変条件が保たれることを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：フレンド同士のチャット開始、同じペアでの再開始、退出
//! - 異常系：フレンドでない相手、自分自身、別の Room を保持中
//! - エッジケース：検索中のユーザーがフレンドチャットを開始する

use std::sync::Arc;

use crate::{
    domain::{ChatStore, Room, RoomKind, SharedMatchmakingState, UserId},
    infrastructure::{
        dto::websocket::{HistoryMessage, ServerEvent},
        scheduler::TaskScheduler,
    },
};

use super::{emitter::EventEmitter, error::ChatError};

/// フレンドチャット開始のユースケース
pub struct StartFriendChatUseCase {
    state: SharedMatchmakingState,
    store: Arc<dyn ChatStore>,
    emitter: EventEmitter,
    retries: Arc<TaskScheduler>,
}

impl StartFriendChatUseCase {
    pub fn new(
        state: SharedMatchmakingState,
        store: Arc<dyn ChatStore>,
        emitter: EventEmitter,
        retries: Arc<TaskScheduler>,
    ) -> Self {
        Self {
            state,
            store,
            emitter,
            retries,
        }
    }

    /// フレンドチャットを開始
    ///
    /// # Arguments
    ///
    /// * `user_id` - 開始するユーザー
    /// * `friend_id` - 相手のユーザー（相互にフレンドであること）
    ///
    /// # Returns
    ///
    /// * `Ok(Room)` - 作成された（または既存の）フレンド Room
    /// * `Err(ChatError::NotEligible)` - ユーザーが存在しない、またはフレンドでない
    /// * `Err(ChatError::AlreadyActive)` - どちらかが別の Room を保持している
    pub async fn execute(&self, user_id: &UserId, friend_id: &UserId) -> Result<Room, ChatError> {
        if user_id == friend_id {
            return Err(ChatError::Validation("Cannot chat with yourself".to_string()));
        }

        let user = self.store.find_user(user_id).await?;
        let friend = self.store.find_user(friend_id).await?;
        let (user, friend) = match (user, friend) {
            (Some(u), Some(f)) if u.is_friend_of(friend_id) && f.is_friend_of(user_id) => (u, f),
            _ => {
                return Err(ChatError::NotEligible(
                    "User or friend not found or not friends".to_string(),
                ));
            }
        };
        let history = self
            .store
            .find_chat_between(user_id, friend_id)
            .await?
            .map(|chat| chat.messages)
            .unwrap_or_default();

        let opened = {
            let mut state = self.state.lock().await;
            let opened = state.open_friend_room(user_id, friend_id)?;
            let mut connections = state.connections_of(user_id);
            connections.extend(state.connections_of(friend_id));
            self.emitter.join_room(&connections, &opened.room.id).await;
            opened
        };

        for dequeued in &opened.dequeued {
            self.retries.cancel(dequeued).await;
        }

        let room = opened.room;
        for (member, partner) in [(&user, &friend), (&friend, &user)] {
            let event = ServerEvent::FriendChatStarted {
                partner_id: partner.id.to_string(),
                partner_name: partner.name.clone(),
                room_id: room.id.to_string(),
            };
            self.emitter.to_user(&member.id, &event).await;
        }
        let history = ServerEvent::ChatHistory {
            messages: history.into_iter().map(HistoryMessage::from).collect(),
        };
        self.emitter.to_room(&room.id, &history).await;

        tracing::info!(
            "Friend chat '{}' {} between '{}' and '{}'",
            room.id,
            if opened.reopened { "resumed" } else { "started" },
            user_id,
            friend_id
        );
        Ok(room)
    }
}

/// フレンドチャット退出のユースケース
pub struct LeaveFriendChatUseCase {
    state: SharedMatchmakingState,
    emitter: EventEmitter,
}

impl LeaveFriendChatUseCase {
    pub fn new(state: SharedMatchmakingState, emitter: EventEmitter) -> Self {
        Self { state, emitter }
    }

    /// フレンド Room を閉じ、相手に partner_disconnected を通知する
    ///
    /// `friend_id` とのフレンド Room にいなければ何もせず `false` を返します。
    pub async fn execute(&self, user_id: &UserId, friend_id: &UserId) -> bool {
        let mut state = self.state.lock().await;
        let in_friend_room = state
            .resolve_room(user_id, friend_id)
            .is_some_and(|room| room.kind == RoomKind::Friend);
        if !in_friend_room {
            return false;
        }
        let Some(room) = state.close_room(user_id) else {
            return false;
        };

        let event = ServerEvent::PartnerDisconnected {
            disconnected_user_id: user_id.to_string(),
        };
        self.emitter.to_user(friend_id, &event).await;
        self.emitter.dissolve_room(&room.id).await;
        tracing::info!("User '{}' left friend chat '{}'", user_id, room.id);
        true
    }
}
