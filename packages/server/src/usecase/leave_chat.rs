//! UseCase: ランダムチャットからの退出

use crate::{
    domain::{RoomKind, SharedMatchmakingState, UserId},
    infrastructure::dto::websocket::ServerEvent,
};

use super::emitter::EventEmitter;

/// ランダムチャット退出のユースケース
pub struct LeaveChatUseCase {
    state: SharedMatchmakingState,
    emitter: EventEmitter,
}

impl LeaveChatUseCase {
    pub fn new(state: SharedMatchmakingState, emitter: EventEmitter) -> Self {
        Self { state, emitter }
    }

    /// `partner_id` とのランダム Room を閉じる
    ///
    /// Room グループ全体に partner_disconnected を送ってからグループを解散します。
    /// 該当する Room がなければ `false` を返します。
    pub async fn execute(&self, user_id: &UserId, partner_id: &UserId) -> bool {
        let mut state = self.state.lock().await;
        let Some(room) = state
            .resolve_room(user_id, partner_id)
            .filter(|room| room.kind == RoomKind::Random)
            .cloned()
        else {
            return false;
        };

        let event = ServerEvent::PartnerDisconnected {
            disconnected_user_id: user_id.to_string(),
        };
        self.emitter.to_room(&room.id, &event).await;
        state.close_room(user_id);
        self.emitter.dissolve_room(&room.id).await;

        tracing::info!("User '{}' left random chat '{}'", user_id, room.id);
        true
    }
}
