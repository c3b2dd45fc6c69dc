//! UseCase: 接続の切断と猶予期間
//!
//! 切断は 2 段階で処理します。最後の接続が切れた時点では猶予期間を開始するだけで、
//! 猶予期間が満了しても再接続がなければ Room を閉じて相手に通知します。

use std::{sync::Arc, time::Duration};

use crate::{
    domain::{ConnectionId, GraceOutcome, SharedMatchmakingState, UnbindResult, UserId},
    infrastructure::{dto::websocket::ServerEvent, scheduler::TaskScheduler},
};

use super::emitter::EventEmitter;

/// 猶予期間満了時の処理
#[derive(Clone)]
pub struct GraceReconciler {
    state: SharedMatchmakingState,
    emitter: EventEmitter,
}

impl GraceReconciler {
    pub fn new(state: SharedMatchmakingState, emitter: EventEmitter) -> Self {
        Self { state, emitter }
    }

    /// 再接続していなければ Room を閉じ、Room グループに partner_disconnected を通知
    pub async fn expire(&self, user_id: &UserId) -> GraceOutcome {
        let mut state = self.state.lock().await;
        let outcome = state.expire_grace(user_id);

        match &outcome {
            GraceOutcome::Disconnected(room) => {
                let event = ServerEvent::PartnerDisconnected {
                    disconnected_user_id: user_id.to_string(),
                };
                self.emitter.to_room(&room.id, &event).await;
                self.emitter.dissolve_room(&room.id).await;
                tracing::info!(
                    "User '{}' confirmed disconnected, room '{}' closed",
                    user_id,
                    room.id
                );
            }
            GraceOutcome::Reconnected => {
                tracing::debug!("User '{}' is back online, keeping room", user_id);
            }
            GraceOutcome::AlreadyClosed => {
                tracing::debug!("Room of user '{}' was already closed", user_id);
            }
        }

        outcome
    }
}

/// 接続切断のユースケース
pub struct DisconnectUserUseCase {
    reconciler: GraceReconciler,
    match_retries: Arc<TaskScheduler>,
    grace_timers: Arc<TaskScheduler>,
    grace_period: Duration,
}

impl DisconnectUserUseCase {
    pub fn new(
        reconciler: GraceReconciler,
        match_retries: Arc<TaskScheduler>,
        grace_timers: Arc<TaskScheduler>,
        grace_period: Duration,
    ) -> Self {
        Self {
            reconciler,
            match_retries,
            grace_timers,
            grace_period,
        }
    }

    /// 接続切断を実行
    ///
    /// # Returns
    ///
    /// * `Some(UnbindResult)` - 接続がユーザーに紐付いていた
    /// * `None` - 紐付け前に切断された
    pub async fn execute(&self, connection_id: &ConnectionId) -> Option<UnbindResult> {
        self.reconciler
            .emitter
            .pusher()
            .unregister_connection(connection_id)
            .await;

        let result = self.reconciler.state.lock().await.unbind(connection_id)?;
        let user_id = result.user_id.clone();

        if result.left_queue {
            self.match_retries.cancel(&user_id).await;
            tracing::info!("User '{}' left the search queue on disconnect", user_id);
        }

        if result.grace_armed {
            let reconciler = self.reconciler.clone();
            let grace_period = self.grace_period;
            let expiring = user_id.clone();
            self.grace_timers
                .schedule(user_id.clone(), async move {
                    tokio::time::sleep(grace_period).await;
                    reconciler.expire(&expiring).await;
                })
                .await;
            tracing::info!(
                "User '{}' dropped their last connection, grace period of {:?} started",
                user_id,
                grace_period
            );
        }

        Some(result)
    }
}
