//! UseCase: 接続とユーザーの紐付け
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectUserUseCase::execute() / ensure_bound()
//! - 接続の紐付け、ユーザーグループ・Room グループへの参加、猶予期間のキャンセル
//!
//! ### なぜこのテストが必要か
//! - リロード後の再接続で Room を失わないことを保証する
//! - 1 つの接続が別ユーザーになりすませないことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：初回接続、複数タブでの接続、Room 保持中の再接続
//! - 異常系：既に別ユーザーに紐付いた接続での操作

use std::sync::Arc;

use crate::{
    domain::{BindResult, ConnectionId, GroupId, PusherChannel, SharedMatchmakingState, UserId},
    infrastructure::scheduler::TaskScheduler,
};

use super::{emitter::EventEmitter, error::ChatError};

/// 接続とユーザー紐付けのユースケース
pub struct ConnectUserUseCase {
    state: SharedMatchmakingState,
    emitter: EventEmitter,
    /// 猶予期間タイマー
    grace_timers: Arc<TaskScheduler>,
}

impl ConnectUserUseCase {
    pub fn new(
        state: SharedMatchmakingState,
        emitter: EventEmitter,
        grace_timers: Arc<TaskScheduler>,
    ) -> Self {
        Self {
            state,
            emitter,
            grace_timers,
        }
    }

    /// 新しい接続の送信チャンネルを登録
    pub async fn register(&self, connection_id: ConnectionId, sender: PusherChannel) {
        self.emitter
            .pusher()
            .register_connection(connection_id, sender)
            .await;
    }

    /// 接続をユーザーに紐付ける
    ///
    /// ユーザーグループに参加し、Room を保持していれば Room グループにも再参加します。
    /// 保留中の猶予期間はキャンセルされます。
    ///
    /// # Returns
    ///
    /// * `Ok(BindResult)` - 紐付け成功
    /// * `Err(ChatError::Validation)` - 接続が既に別ユーザーに紐付いている
    pub async fn execute(
        &self,
        connection_id: ConnectionId,
        user_id: &UserId,
        username: Option<&str>,
    ) -> Result<BindResult, ChatError> {
        let result = {
            let mut state = self.state.lock().await;
            if let Some(bound) = state.user_of(&connection_id) {
                if bound != user_id {
                    return Err(ChatError::Validation(
                        "Connection is already bound to another user".to_string(),
                    ));
                }
            }

            let result = state.bind(connection_id, user_id);
            let pusher = self.emitter.pusher();
            pusher
                .join_group(&connection_id, &GroupId::user(user_id))
                .await;
            if let Some(room) = &result.room {
                pusher
                    .join_group(&connection_id, &GroupId::room(&room.id))
                    .await;
            }
            result
        };

        if result.grace_cancelled {
            self.grace_timers.cancel(user_id).await;
            tracing::info!("User '{}' reconnected within the grace period", user_id);
        }
        if let Some(room) = &result.room {
            tracing::info!("User '{}' rejoined room '{}'", user_id, room.id);
        }
        tracing::info!(
            "Connection '{}' bound to user '{}' ({})",
            connection_id,
            user_id,
            username.unwrap_or("Anonymous")
        );

        Ok(result)
    }

    /// 接続が `user_id` として振る舞えることを確認する
    ///
    /// 未紐付けの接続であればその場で紐付けます。
    pub async fn ensure_bound(
        &self,
        connection_id: ConnectionId,
        user_id: &UserId,
    ) -> Result<(), ChatError> {
        match self.bound_user(&connection_id).await {
            Some(bound) if &bound == user_id => Ok(()),
            Some(_) => Err(ChatError::Validation(
                "userId does not match this connection".to_string(),
            )),
            None => self.execute(connection_id, user_id, None).await.map(|_| ()),
        }
    }

    pub async fn bound_user(&self, connection_id: &ConnectionId) -> Option<UserId> {
        self.state.lock().await.user_of(connection_id).cloned()
    }
}
