//! UseCase: 永続化されるフレンドメッセージ（HTTP 経由）
//!
//! ストアに触れる前に、フレンド関係やランダム Room の検証を済ませます。

use std::sync::Arc;

use deai_shared::time::Clock;

use crate::{
    domain::{
        ChatMessage, ChatStore, MessageText, RoomId, RoomKind, SharedMatchmakingState, Timestamp,
        UserId,
    },
    infrastructure::dto::websocket::ServerEvent,
};

use super::{emitter::EventEmitter, error::ChatError};

const NOT_FRIENDS: &str = "Users are not friends.";

/// フレンドへのメッセージ送信のユースケース
pub struct SendFriendMessageUseCase {
    store: Arc<dyn ChatStore>,
    emitter: EventEmitter,
    clock: Arc<dyn Clock>,
}

impl SendFriendMessageUseCase {
    pub fn new(store: Arc<dyn ChatStore>, emitter: EventEmitter, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            emitter,
            clock,
        }
    }

    /// メッセージを履歴に保存し、フレンド Room に中継する
    pub async fn execute(
        &self,
        user_id: &UserId,
        friend_id: &UserId,
        text: MessageText,
    ) -> Result<ChatMessage, ChatError> {
        if !self.store.friends_of(user_id).await?.contains(friend_id) {
            return Err(ChatError::NotEligible(NOT_FRIENDS.to_string()));
        }

        let message = ChatMessage::new(
            user_id.clone(),
            text,
            Timestamp::new(self.clock.now_millis()),
        );
        self.store
            .append_messages(user_id, friend_id, vec![message.clone()])
            .await?;

        let room_id = RoomId::derive(RoomKind::Friend, user_id, friend_id);
        let event = ServerEvent::ReceiveMessage {
            message: message.text.as_str().to_string(),
            from_user_id: user_id.to_string(),
            timestamp: message.timestamp.value(),
        };
        self.emitter.to_room(&room_id, &event).await;
        Ok(message)
    }
}

/// フレンドとのチャット履歴取得のユースケース
pub struct GetChatHistoryUseCase {
    store: Arc<dyn ChatStore>,
}

impl GetChatHistoryUseCase {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    /// 履歴がなければ空のリストを返す。フレンドでなければ履歴を読まない
    pub async fn execute(&self, user_id: &UserId, friend_id: &UserId) -> Result<Vec<ChatMessage>, ChatError> {
        if !self.store.friends_of(user_id).await?.contains(friend_id) {
            return Err(ChatError::NotEligible(NOT_FRIENDS.to_string()));
        }
        Ok(self
            .store
            .find_chat_between(user_id, friend_id)
            .await?
            .map(|chat| chat.messages)
            .unwrap_or_default())
    }
}

/// フレンドのメッセージを既読にするユースケース
pub struct MarkMessageSeenUseCase {
    store: Arc<dyn ChatStore>,
    emitter: EventEmitter,
}

impl MarkMessageSeenUseCase {
    pub fn new(store: Arc<dyn ChatStore>, emitter: EventEmitter) -> Self {
        Self { store, emitter }
    }

    /// `friend_id` が `timestamp` に送ったメッセージを既読にする
    pub async fn execute(
        &self,
        user_id: &UserId,
        friend_id: &UserId,
        timestamp: Timestamp,
    ) -> Result<(), ChatError> {
        if self.store.find_chat_between(user_id, friend_id).await?.is_none() {
            return Err(ChatError::NotFound("Chat not found.".to_string()));
        }
        if !self.store.mark_seen(user_id, friend_id, friend_id, timestamp).await? {
            return Err(ChatError::NotFound("Message not found.".to_string()));
        }

        let room_id = RoomId::derive(RoomKind::Friend, user_id, friend_id);
        let event = ServerEvent::MessageSeen {
            from_user_id: user_id.to_string(),
            timestamp: timestamp.value(),
        };
        self.emitter.to_room(&room_id, &event).await;
        Ok(())
    }
}

/// ランダムチャットへの送信可否を確認するユースケース
///
/// 永続化はしません。クライアントはこの確認の後に WebSocket で送信します。
pub struct ValidateRandomMessageUseCase {
    state: SharedMatchmakingState,
}

impl ValidateRandomMessageUseCase {
    pub fn new(state: SharedMatchmakingState) -> Self {
        Self { state }
    }

    pub async fn execute(&self, user_id: &UserId, partner_id: &UserId) -> Result<(), ChatError> {
        let state = self.state.lock().await;
        match state.resolve_room(user_id, partner_id) {
            Some(room) if room.kind == RoomKind::Random => Ok(()),
            _ => Err(ChatError::StaleRoom(
                "Not in a random chat with this user.".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{GroupId, MessagePusher, StoreError, repository::MockChatStore},
        usecase::test_support::{Harness, event_types, received, user},
    };
    use deai_shared::time::FixedClock;

    const NOW: i64 = 1_700_000_000_000;

    fn text(value: &str) -> MessageText {
        MessageText::new(value.to_string()).unwrap()
    }

    fn send_usecase(harness: &Harness) -> SendFriendMessageUseCase {
        SendFriendMessageUseCase::new(
            harness.store.clone(),
            harness.emitter.clone(),
            Arc::new(FixedClock::new(NOW)),
        )
    }

    #[tokio::test]
    async fn test_send_friend_message_persists_and_relays() {
        // テスト項目: フレンドへのメッセージは履歴に保存され、フレンド Room に中継される
        // given (前提条件):
        let harness = Harness::new();
        let alice = harness.add_user('a', "alice").await;
        let bob = harness.add_user('b', "bob").await;
        harness.befriend(&alice, &bob).await;
        let (conn_b, mut rx_b) = harness.connect(&bob).await;
        let room_id = RoomId::derive(RoomKind::Friend, &alice, &bob);
        harness.pusher.join_group(&conn_b, &GroupId::room(&room_id)).await;

        // when (操作):
        let message = send_usecase(&harness).execute(&alice, &bob, text("hello")).await.unwrap();

        // then (期待する結果):
        assert_eq!(message.timestamp, Timestamp::new(NOW));
        let history = GetChatHistoryUseCase::new(harness.store.clone())
            .execute(&bob, &alice)
            .await
            .unwrap();
        assert_eq!(history, vec![message]);
        let events = received(&mut rx_b);
        assert_eq!(event_types(&events), vec!["receive_message"]);
        assert_eq!(events[0]["timestamp"], NOW);
    }

    #[tokio::test]
    async fn test_send_to_non_friend_is_rejected() {
        // テスト項目: フレンドでない相手へのメッセージは保存されない
        // given (前提条件):
        let harness = Harness::new();
        let alice = harness.add_user('a', "alice").await;
        let bob = harness.add_user('b', "bob").await;

        // when (操作):
        let result = send_usecase(&harness).execute(&alice, &bob, text("hello")).await;

        // then (期待する結果):
        assert_eq!(result, Err(ChatError::NotEligible(NOT_FRIENDS.to_string())));
        assert!(harness.store.find_chat_between(&alice, &bob).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_history_between_non_friends_is_rejected() {
        // テスト項目: フレンドでない相手との履歴は取得できず、ストアの履歴も読まない
        // given (前提条件):
        let harness = Harness::new();
        let alice = harness.add_user('a', "alice").await;
        let bob = harness.add_user('b', "bob").await;
        let carol = harness.add_user('c', "carol").await;
        harness.befriend(&alice, &bob).await;
        send_usecase(&harness).execute(&alice, &bob, text("secret")).await.unwrap();
        let mut store = MockChatStore::new();
        store.expect_friends_of().returning(|_| Ok(Default::default()));
        store.expect_find_chat_between().never();

        // when (操作):
        let stranger = GetChatHistoryUseCase::new(harness.store.clone())
            .execute(&carol, &alice)
            .await;
        let without_store_read = GetChatHistoryUseCase::new(Arc::new(store))
            .execute(&carol, &bob)
            .await;

        // then (期待する結果):
        assert_eq!(stranger, Err(ChatError::NotEligible(NOT_FRIENDS.to_string())));
        assert_eq!(without_store_read, Err(ChatError::NotEligible(NOT_FRIENDS.to_string())));
    }

    #[tokio::test]
    async fn test_mark_seen_errors() {
        // テスト項目: 履歴がない場合とメッセージがない場合で異なる NotFound を返す
        // given (前提条件):
        let harness = Harness::new();
        let alice = harness.add_user('a', "alice").await;
        let bob = harness.add_user('b', "bob").await;
        harness.befriend(&alice, &bob).await;
        let usecase = MarkMessageSeenUseCase::new(harness.store.clone(), harness.emitter.clone());

        // when (操作):
        let no_chat = usecase.execute(&alice, &bob, Timestamp::new(NOW)).await;
        send_usecase(&harness).execute(&bob, &alice, text("hi")).await.unwrap();
        let wrong_timestamp = usecase.execute(&alice, &bob, Timestamp::new(NOW - 1)).await;
        let seen = usecase.execute(&alice, &bob, Timestamp::new(NOW)).await;

        // then (期待する結果):
        assert_eq!(no_chat, Err(ChatError::NotFound("Chat not found.".to_string())));
        assert_eq!(wrong_timestamp, Err(ChatError::NotFound("Message not found.".to_string())));
        assert_eq!(seen, Ok(()));
        let history = harness.store.find_chat_between(&alice, &bob).await.unwrap().unwrap();
        assert!(history.messages[0].seen);
    }

    #[tokio::test]
    async fn test_history_store_failure() {
        // テスト項目: ストア障害は汎用のサーバーエラーになる
        // given (前提条件):
        let mut store = MockChatStore::new();
        store
            .expect_friends_of()
            .returning(|_| Ok([user('b')].into_iter().collect()));
        store
            .expect_find_chat_between()
            .returning(|_, _| Err(StoreError::Unavailable("disk full".to_string())));
        let usecase = GetChatHistoryUseCase::new(Arc::new(store));

        // when (操作):
        let result = usecase.execute(&user('a'), &user('b')).await;

        // then (期待する結果):
        assert_eq!(result, Err(ChatError::Store("Server error".to_string())));
    }

    #[tokio::test]
    async fn test_validate_random_message() {
        // テスト項目: ランダム Room を共有する相手だけが送信先として認められる
        // given (前提条件):
        let harness = Harness::new();
        let alice = harness.add_user('a', "alice").await;
        let bob = harness.add_user('b', "bob").await;
        let carol = harness.add_user('c', "carol").await;
        let (_conn_a, _rx_a) = harness.connect(&alice).await;
        let (_conn_b, _rx_b) = harness.connect(&bob).await;
        harness.pair(&alice, &bob).await;
        let usecase = ValidateRandomMessageUseCase::new(harness.state.clone());

        // when (操作):
        let partner = usecase.execute(&alice, &bob).await;
        let stranger = usecase.execute(&alice, &carol).await;

        // then (期待する結果):
        assert_eq!(partner, Ok(()));
        assert!(matches!(stranger, Err(ChatError::StaleRoom(_))));
    }
}
