//! UseCase: パートナー検索の停止

use std::sync::Arc;

use crate::{
    domain::{SharedMatchmakingState, UserId},
    infrastructure::scheduler::TaskScheduler,
};

/// パートナー検索停止のユースケース
pub struct StopSearchUseCase {
    state: SharedMatchmakingState,
    retries: Arc<TaskScheduler>,
}

impl StopSearchUseCase {
    pub fn new(state: SharedMatchmakingState, retries: Arc<TaskScheduler>) -> Self {
        Self { state, retries }
    }

    /// 検索を停止（冪等）
    ///
    /// # Returns
    ///
    /// キューから外れた場合は `true`。検索していなかった場合は `false`
    pub async fn execute(&self, user_id: &UserId) -> bool {
        let removed = self.state.lock().await.stop_search(user_id);
        if removed {
            self.retries.cancel(user_id).await;
            tracing::info!("User '{}' stopped searching", user_id);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::Harness;

    #[tokio::test]
    async fn test_stop_search_removes_user_and_cancels_retry() {
        // テスト項目: 検索停止でキューから外れ、リトライも止まる
        // given (前提条件):
        let harness = Harness::new();
        let alice = harness.add_user('a', "alice").await;
        let (_conn, _rx) = harness.connect(&alice).await;
        harness.start_search_usecase().execute(&alice).await.unwrap();
        let usecase = StopSearchUseCase::new(harness.state.clone(), harness.retries.clone());

        // when (操作):
        let first = usecase.execute(&alice).await;
        let second = usecase.execute(&alice).await;

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert!(!harness.state.lock().await.is_searching(&alice));
        assert!(!harness.retries.is_scheduled(&alice).await);
    }

    #[tokio::test]
    async fn test_stop_search_keeps_room() {
        // テスト項目: Room 保持中の検索停止は何も変更しない
        // given (前提条件):
        let harness = Harness::new();
        let alice = harness.add_user('a', "alice").await;
        let bob = harness.add_user('b', "bob").await;
        let (_conn_a, _rx_a) = harness.connect(&alice).await;
        let (_conn_b, _rx_b) = harness.connect(&bob).await;
        let room = harness.pair(&alice, &bob).await;
        let usecase = StopSearchUseCase::new(harness.state.clone(), harness.retries.clone());

        // when (操作):
        let removed = usecase.execute(&alice).await;

        // then (期待する結果):
        assert!(!removed);
        assert_eq!(harness.state.lock().await.room_of(&alice), Some(&room));
    }
}
