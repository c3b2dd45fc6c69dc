//! UseCase: Room 内イベントの中継
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RelayEventUseCase の send_message / typing / message_seen / friend_request_*
//! - 送信者の Room 解決、相手の照合、ランダム Room のバッファ追加と重複排除
//!
//! ### なぜこのテストが必要か
//! - Room を共有していない相手にメッセージが届かないことを保証する
//! - クライアントの再送で同じメッセージがバッファに 2 回記録されないことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：Room 内でのメッセージ送受信、入力中通知、既読通知、フレンド申請
//! - 異常系：Room 外からの送信、記録と異なる相手の指定
//! - エッジケース：重複排除ウィンドウ内外の同一メッセージ

use crate::{
    domain::{
        AppendOutcome, ChatMessage, MessageText, Room, RoomKind, SharedMatchmakingState,
        Timestamp, UserId,
    },
    infrastructure::dto::websocket::{FriendRequestState, ServerEvent},
};

use super::{emitter::EventEmitter, error::ChatError};

const STALE_ROOM: &str = "Not in a valid chat room";

/// Result of relaying a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Delivered,
    /// Relayed, but not buffered again: same sender and text within the dedup window
    Duplicate,
}

/// Room 内イベント中継のユースケース
pub struct RelayEventUseCase {
    state: SharedMatchmakingState,
    emitter: EventEmitter,
}

impl RelayEventUseCase {
    pub fn new(state: SharedMatchmakingState, emitter: EventEmitter) -> Self {
        Self { state, emitter }
    }

    fn stale() -> ChatError {
        ChatError::StaleRoom(STALE_ROOM.to_string())
    }

    /// Room 内にメッセージを送信
    ///
    /// ランダム Room ではバッファに追加してから中継します。追加と送信は同じロックの
    /// 中で行うため、Room 内の到着順が保たれます。重複排除はバッファへの追加だけに
    /// 効き、中継は常に行います。
    ///
    /// # Returns
    ///
    /// * `Ok(RelayOutcome)` - 中継した（重複ならバッファには追加していない）
    /// * `Err(ChatError::StaleRoom)` - 送信者が `partner_id` と Room を共有していない
    pub async fn send_message(
        &self,
        user_id: &UserId,
        partner_id: &UserId,
        text: MessageText,
        timestamp: Timestamp,
    ) -> Result<RelayOutcome, ChatError> {
        let mut state = self.state.lock().await;
        let room = state
            .resolve_room(user_id, partner_id)
            .cloned()
            .ok_or_else(Self::stale)?;

        let mut outcome = RelayOutcome::Delivered;
        if room.kind == RoomKind::Random {
            let message = ChatMessage::new(user_id.clone(), text.clone(), timestamp);
            match state.buffer_message(&room.id, message) {
                AppendOutcome::Duplicate => {
                    tracing::debug!("Skipped buffering duplicate from '{}' in '{}'", user_id, room.id);
                    outcome = RelayOutcome::Duplicate;
                }
                AppendOutcome::NoBuffer => {
                    tracing::warn!("Random room '{}' has no message buffer", room.id);
                }
                AppendOutcome::Appended => {}
            }
        }

        let event = ServerEvent::ReceiveMessage {
            message: text.into_string(),
            from_user_id: user_id.to_string(),
            timestamp: timestamp.value(),
        };
        self.emitter.to_room(&room.id, &event).await;
        Ok(outcome)
    }

    /// 入力中通知を相手にだけ送信
    pub async fn typing(&self, user_id: &UserId, partner_id: &UserId) -> Result<(), ChatError> {
        self.resolve(user_id, partner_id).await?;
        let event = ServerEvent::PartnerTyping {
            from_user_id: user_id.to_string(),
        };
        self.emitter.to_user(partner_id, &event).await;
        Ok(())
    }

    /// 既読通知
    ///
    /// `timestamp` は相手が送信したメッセージのもの。ランダム Room では
    /// バッファ内の該当メッセージも既読にします。
    pub async fn message_seen(
        &self,
        user_id: &UserId,
        partner_id: &UserId,
        timestamp: Timestamp,
    ) -> Result<(), ChatError> {
        let mut state = self.state.lock().await;
        let room = state
            .resolve_room(user_id, partner_id)
            .cloned()
            .ok_or_else(Self::stale)?;
        if room.kind == RoomKind::Random {
            state.mark_buffered_seen(&room.id, partner_id, timestamp);
        }

        let event = ServerEvent::MessageSeen {
            from_user_id: user_id.to_string(),
            timestamp: timestamp.value(),
        };
        self.emitter.to_room(&room.id, &event).await;
        Ok(())
    }

    /// ランダム Room 内でのフレンド申請
    ///
    /// Room には申請状態を、相手には申請の受信通知を送ります。
    pub async fn friend_request_sent(
        &self,
        user_id: &UserId,
        partner_id: &UserId,
        username: Option<String>,
    ) -> Result<(), ChatError> {
        let room = self.resolve_random(user_id, partner_id).await?;

        let status = ServerEvent::FriendRequestStatus {
            from_user_id: user_id.to_string(),
            to_user_id: partner_id.to_string(),
            from_username: username.clone(),
            status: FriendRequestState::Sent,
        };
        self.emitter.to_room(&room.id, &status).await;
        let notice = ServerEvent::FriendRequestReceived {
            from_user_id: user_id.to_string(),
            from_username: username,
        };
        self.emitter.to_user(partner_id, &notice).await;
        tracing::info!("Friend request from '{}' to '{}'", user_id, partner_id);
        Ok(())
    }

    /// `user_id` が `requester_id` からの申請を拒否した
    pub async fn friend_request_rejected(
        &self,
        user_id: &UserId,
        requester_id: &UserId,
    ) -> Result<(), ChatError> {
        let room = self.resolve_random(user_id, requester_id).await?;
        let status = ServerEvent::FriendRequestStatus {
            from_user_id: requester_id.to_string(),
            to_user_id: user_id.to_string(),
            from_username: None,
            status: FriendRequestState::Rejected,
        };
        self.emitter.to_room(&room.id, &status).await;
        Ok(())
    }

    async fn resolve(&self, user_id: &UserId, partner_id: &UserId) -> Result<Room, ChatError> {
        self.state
            .lock()
            .await
            .resolve_room(user_id, partner_id)
            .cloned()
            .ok_or_else(Self::stale)
    }

    async fn resolve_random(&self, user_id: &UserId, partner_id: &UserId) -> Result<Room, ChatError> {
        let room = self.resolve(user_id, partner_id).await?;
        if room.kind != RoomKind::Random {
            return Err(ChatError::NotEligible("Already friends".to_string()));
        }
        Ok(room)
    }
}
