//! UseCase: エンジン状態のスナップショット取得（診断用）

use crate::domain::{SharedMatchmakingState, StateSnapshot};

pub struct GetStateUseCase {
    state: SharedMatchmakingState,
}

impl GetStateUseCase {
    pub fn new(state: SharedMatchmakingState) -> Self {
        Self { state }
    }

    pub async fn execute(&self) -> StateSnapshot {
        self.state.lock().await.snapshot()
    }
}
