//! UseCase: ランダムチャット中のフレンド申請承認
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - BecomeFriendsUseCase::execute()
//! - 相互フレンド関係の保存、バッファ内容の履歴への移送、ランダム Room のクローズ
//!
//! ### なぜこのテストが必要か
//! - フレンドになった時点までの会話が失われないことを保証する
//! - 承認後にランダム Room が残らないことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：会話のあるランダム Room で承認
//! - 異常系：Room を共有していない相手の承認、未登録ユーザー、ストア障害（状態は変更されない）
//! - エッジケース：フレンド Room での承認

use std::sync::Arc;

use crate::{
    domain::{ChatStore, Room, RoomKind, SharedMatchmakingState, UserId},
    infrastructure::dto::websocket::ServerEvent,
};

use super::{emitter::EventEmitter, error::ChatError};

const NOT_IN_RANDOM_CHAT: &str = "Not in a random chat with this user";

/// Result of accepting a friend request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BecameFriends {
    /// The random room that was closed, unless it closed concurrently
    pub closed_room: Option<Room>,
    /// Buffered messages written to the persistent transcript
    pub transferred: usize,
}

/// フレンド申請承認のユースケース
pub struct BecomeFriendsUseCase {
    state: SharedMatchmakingState,
    store: Arc<dyn ChatStore>,
    emitter: EventEmitter,
}

impl BecomeFriendsUseCase {
    pub fn new(state: SharedMatchmakingState, store: Arc<dyn ChatStore>, emitter: EventEmitter) -> Self {
        Self {
            state,
            store,
            emitter,
        }
    }

    /// `user_id` がランダム Room の相手 `friend_id` からの申請を承認する
    ///
    /// 1. 2 人が同じランダム Room にいることを確認
    /// 2. 相互のフレンド関係を保存
    /// 3. ランダム Room のバッファを履歴に追加
    /// 4. Room を閉じて双方に通知
    ///
    /// バッファの読み出しから Room のクローズまでの間に届いたメッセージは
    /// 履歴に残りません。
    ///
    /// # Returns
    ///
    /// * `Err(ChatError::StaleRoom)` - 2 人がランダム Room を共有していない（ストアは変更しない）
    pub async fn execute(&self, user_id: &UserId, friend_id: &UserId) -> Result<BecameFriends, ChatError> {
        if user_id == friend_id {
            return Err(ChatError::Validation("Cannot befriend yourself".to_string()));
        }
        let room = self
            .state
            .lock()
            .await
            .resolve_room(user_id, friend_id)
            .filter(|room| room.kind == RoomKind::Random)
            .cloned()
            .ok_or_else(|| ChatError::StaleRoom(NOT_IN_RANDOM_CHAT.to_string()))?;

        if !self.store.set_friendship(user_id, friend_id, true).await? {
            return Err(ChatError::NotFound("User not found".to_string()));
        }

        let buffered = {
            let state = self.state.lock().await;
            if state.room_of(user_id).is_some_and(|r| r.id == room.id) {
                state.drain_messages(&room.id)
            } else {
                Vec::new()
            }
        };
        let transferred = buffered.len();
        if !buffered.is_empty() {
            self.store.append_messages(user_id, friend_id, buffered).await?;
        }

        let closed_room = {
            let mut state = self.state.lock().await;
            let still_open = state.room_of(user_id).is_some_and(|r| r.id == room.id);
            if still_open {
                state.close_room(user_id);
                let accepted = ServerEvent::FriendRequestAccepted {
                    user_id: user_id.to_string(),
                    friend_id: friend_id.to_string(),
                };
                self.emitter.to_room(&room.id, &accepted).await;
                for member in [user_id, friend_id] {
                    let event = ServerEvent::PartnerDisconnected {
                        disconnected_user_id: member.to_string(),
                    };
                    self.emitter.to_room(&room.id, &event).await;
                }
                self.emitter.dissolve_room(&room.id).await;
                Some(room)
            } else {
                None
            }
        };

        tracing::info!(
            "'{}' and '{}' became friends, {} buffered messages persisted",
            user_id,
            friend_id,
            transferred
        );
        Ok(BecameFriends {
            closed_room,
            transferred,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ChatMessage, MessageText, StoreError, Timestamp, repository::MockChatStore},
        usecase::test_support::{Harness, event_types, received, user},
    };

    fn usecase(harness: &Harness) -> BecomeFriendsUseCase {
        BecomeFriendsUseCase::new(harness.state.clone(), harness.store.clone(), harness.emitter.clone())
    }

    #[tokio::test]
    async fn test_accept_drains_buffer_and_closes_room() {
        // テスト項目: ランダム Room 内で承認すると、バッファが履歴に移り、Room が閉じる
        // given (前提条件):
        let harness = Harness::new();
        let alice = harness.add_user('a', "alice").await;
        let bob = harness.add_user('b', "bob").await;
        let (_conn_a, mut rx_a) = harness.connect(&alice).await;
        let (_conn_b, mut rx_b) = harness.connect(&bob).await;
        let room = harness.pair(&alice, &bob).await;
        {
            let mut state = harness.state.lock().await;
            for (sender, body, ts) in [(&alice, "hi", 1), (&bob, "hey", 2)] {
                let text = MessageText::new(body.to_string()).unwrap();
                state.buffer_message(&room.id, ChatMessage::new(sender.clone(), text, Timestamp::new(ts)));
            }
        }

        // when (操作):
        let result = usecase(&harness).execute(&bob, &alice).await.unwrap();

        // then (期待する結果):
        assert_eq!(result.closed_room, Some(room.clone()));
        assert_eq!(result.transferred, 2);

        let chat = harness.store.find_chat_between(&alice, &bob).await.unwrap().unwrap();
        let texts: Vec<&str> = chat.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["hi", "hey"]);
        assert!(harness.store.friends_of(&alice).await.unwrap().contains(&bob));
        assert!(harness.store.friends_of(&bob).await.unwrap().contains(&alice));

        let expected = vec!["friend_request_accepted", "partner_disconnected", "partner_disconnected"];
        assert_eq!(event_types(&received(&mut rx_a)), expected);
        assert_eq!(event_types(&received(&mut rx_b)), expected);

        let state = harness.state.lock().await;
        assert!(state.room_of(&alice).is_none());
        assert!(state.drain_messages(&room.id).is_empty());
        assert!(state.is_consistent());
    }

    #[tokio::test]
    async fn test_accept_without_shared_room_is_rejected() {
        // テスト項目: ランダム Room を共有していない相手の承認は StaleRoom で拒否され、フレンド関係は保存されない
        // given (前提条件):
        let harness = Harness::new();
        let alice = harness.add_user('a', "alice").await;
        let bob = harness.add_user('b', "bob").await;
        let carol = harness.add_user('c', "carol").await;
        let (_conn_a, _rx_a) = harness.connect(&alice).await;
        let (_conn_b, mut rx_b) = harness.connect(&bob).await;
        let (_conn_c, mut rx_c) = harness.connect(&carol).await;
        let room = harness.pair(&alice, &bob).await;

        // when (操作):
        let stranger = usecase(&harness).execute(&alice, &carol).await;
        let no_room = usecase(&harness).execute(&carol, &bob).await;

        // then (期待する結果):
        let expected = Err(ChatError::StaleRoom(NOT_IN_RANDOM_CHAT.to_string()));
        assert_eq!(stranger, expected);
        assert_eq!(no_room, expected);
        assert!(harness.store.friends_of(&alice).await.unwrap().is_empty());
        assert!(harness.store.friends_of(&carol).await.unwrap().is_empty());
        assert!(received(&mut rx_b).is_empty());
        assert!(received(&mut rx_c).is_empty());
        assert_eq!(harness.state.lock().await.room_of(&alice), Some(&room));
    }

    #[tokio::test]
    async fn test_accept_in_friend_room_is_rejected() {
        // テスト項目: フレンド Room での承認は StaleRoom で拒否される
        // given (前提条件):
        let harness = Harness::new();
        let alice = harness.add_user('a', "alice").await;
        let bob = harness.add_user('b', "bob").await;
        harness.store.set_friendship(&alice, &bob, true).await.unwrap();
        harness.state.lock().await.open_friend_room(&alice, &bob).unwrap();

        // when (操作):
        let result = usecase(&harness).execute(&alice, &bob).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ChatError::StaleRoom(_))));
        assert!(harness.state.lock().await.room_of(&alice).is_some());
    }

    #[tokio::test]
    async fn test_unknown_user_is_rejected() {
        // テスト項目: 未登録のユーザーとはフレンドになれず、Room も閉じない
        // given (前提条件):
        let harness = Harness::new();
        let alice = harness.add_user('a', "alice").await;
        let ghost = user('f');
        let (_conn_a, _rx_a) = harness.connect(&alice).await;
        let (_conn_f, _rx_f) = harness.connect(&ghost).await;
        let room = harness.pair(&alice, &ghost).await;

        // when (操作):
        let result = usecase(&harness).execute(&alice, &ghost).await;

        // then (期待する結果):
        assert_eq!(result, Err(ChatError::NotFound("User not found".to_string())));
        assert!(harness.store.friends_of(&alice).await.unwrap().is_empty());
        assert_eq!(harness.state.lock().await.room_of(&alice), Some(&room));
    }

    #[tokio::test]
    async fn test_store_failure_keeps_room_open() {
        // テスト項目: ストア障害時はエラーを返し、Room は開いたまま
        // given (前提条件):
        let harness = Harness::new();
        let alice = user('a');
        let bob = user('b');
        let (_conn_a, _rx_a) = harness.connect(&alice).await;
        let (_conn_b, _rx_b) = harness.connect(&bob).await;
        let room = harness.pair(&alice, &bob).await;
        let mut store = MockChatStore::new();
        store
            .expect_set_friendship()
            .returning(|_, _, _| Err(StoreError::Unavailable("write timeout".to_string())));
        let usecase = BecomeFriendsUseCase::new(harness.state.clone(), Arc::new(store), harness.emitter.clone());

        // when (操作):
        let result = usecase.execute(&alice, &bob).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ChatError::Store(_))));
        assert_eq!(harness.state.lock().await.room_of(&alice), Some(&room));
    }
}
