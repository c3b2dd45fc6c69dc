//! UseCase: パートナー検索とマッチング
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - StartSearchUseCase::execute() と Matcher::attempt_match()
//! - キュー順の候補走査、フレンド除外（双方向）、マッチ成立時の通知
//! - 候補がいない場合のリトライ（一定間隔 + ジッター）
//!
//! ### なぜこのテストが必要か
//! - 「フレンドとはマッチしない」「検索中と Room 保持は排他」という不変条件を保証する
//! - 検索者が取りこぼされず、いずれマッチすることを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：2 人が検索して互いにマッチ
//! - 異常系：重複検索、未登録ユーザー、相手の接続なし、ストア障害
//! - エッジケース：片方向だけのフレンド関係

use std::{sync::Arc, time::Duration};

use rand::Rng;

use crate::{
    config::EngineConfig,
    domain::{ChatStore, MatchError, Room, SharedMatchmakingState, UserId},
    infrastructure::{dto::websocket::ServerEvent, scheduler::TaskScheduler},
};

use super::{emitter::EventEmitter, error::ChatError};

const ANONYMOUS: &str = "Anonymous";

/// Result of one matching attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched(Room),
    /// No eligible candidate right now
    NoCandidate,
    /// The chosen candidate had no live connection
    PartnerUnavailable,
    /// The user is no longer in the queue
    NotSearching,
}

/// Drains the search queue for one user at a time
#[derive(Clone)]
pub struct Matcher {
    state: SharedMatchmakingState,
    store: Arc<dyn ChatStore>,
    emitter: EventEmitter,
    retries: Arc<TaskScheduler>,
    retry_interval: Duration,
    retry_jitter: Duration,
}

impl Matcher {
    pub fn new(
        state: SharedMatchmakingState,
        store: Arc<dyn ChatStore>,
        emitter: EventEmitter,
        retries: Arc<TaskScheduler>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            state,
            store,
            emitter,
            retries,
            retry_interval: config.match_retry_interval,
            retry_jitter: config.match_retry_jitter,
        }
    }

    /// Scan the queue for a partner of `user_id` and commit the first eligible one.
    ///
    /// Friendship is looked up without holding the state lock; the commit
    /// re-validates queue membership of both parties.
    pub async fn attempt_match(&self, user_id: &UserId) -> Result<MatchOutcome, ChatError> {
        let candidates = {
            let state = self.state.lock().await;
            if !state.is_searching(user_id) {
                return Ok(MatchOutcome::NotSearching);
            }
            state.match_candidates(user_id)
        };
        if candidates.is_empty() {
            return Ok(MatchOutcome::NoCandidate);
        }

        let friends = self.store.friends_of(user_id).await?;
        for candidate in candidates {
            if friends.contains(&candidate) {
                continue;
            }
            // 片方のデータが古い可能性があるため双方向で確認する
            if self.store.friends_of(&candidate).await?.contains(user_id) {
                continue;
            }

            let mut state = self.state.lock().await;
            match state.commit_match(user_id, &candidate) {
                Ok(room) => {
                    let mut connections = state.connections_of(user_id);
                    connections.extend(state.connections_of(&candidate));
                    self.emitter.join_room(&connections, &room.id).await;
                    drop(state);

                    tracing::info!(
                        "Matched '{}' with '{}' in room '{}'",
                        user_id,
                        candidate,
                        room.id
                    );
                    self.announce(&room).await;
                    return Ok(MatchOutcome::Matched(room));
                }
                Err(MatchError::NotSearching(who)) if &who == user_id => {
                    return Ok(MatchOutcome::NotSearching);
                }
                Err(MatchError::PartnerUnavailable(partner)) => {
                    drop(state);
                    tracing::warn!("Matched user '{}' is not connected", partner);
                    self.emitter
                        .to_user(user_id, &ServerEvent::error("Matched user not connected", "partner_unavailable"))
                        .await;
                    return Ok(MatchOutcome::PartnerUnavailable);
                }
                Err(e) => {
                    tracing::debug!("Candidate '{}' skipped: {}", candidate, e);
                }
            }
        }

        Ok(MatchOutcome::NoCandidate)
    }

    async fn display_name(&self, user_id: &UserId) -> String {
        match self.store.find_user(user_id).await {
            Ok(Some(user)) if !user.name.trim().is_empty() => user.name,
            Ok(_) => ANONYMOUS.to_string(),
            Err(e) => {
                tracing::warn!("Failed to look up name of '{}': {}", user_id, e);
                ANONYMOUS.to_string()
            }
        }
    }

    /// match_found to each member, then chat_ready to the room
    async fn announce(&self, room: &Room) {
        for member in room.members() {
            let Some(partner) = room.partner_of(member) else {
                continue;
            };
            let event = ServerEvent::MatchFound {
                partner_id: partner.to_string(),
                partner_name: self.display_name(partner).await,
                room_id: room.id.to_string(),
                kind: room.kind.as_str().to_string(),
            };
            self.emitter.to_user(member, &event).await;
        }
        let ready = ServerEvent::ChatReady {
            room_id: room.id.to_string(),
        };
        self.emitter.to_room(&room.id, &ready).await;
    }

    fn retry_delay(&self) -> Duration {
        let max_jitter = u64::try_from(self.retry_jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter = if max_jitter == 0 {
            0
        } else {
            rand::rng().random_range(0..=max_jitter)
        };
        self.retry_interval + Duration::from_millis(jitter)
    }

    /// Re-check periodically while `user_id` stays in the queue
    pub async fn schedule_retry(&self, user_id: &UserId) {
        let matcher = self.clone();
        let retrying = user_id.clone();
        self.retries
            .schedule(user_id.clone(), async move {
                matcher.retry_loop(&retrying).await;
            })
            .await;
    }

    async fn retry_loop(&self, user_id: &UserId) {
        loop {
            tokio::time::sleep(self.retry_delay()).await;
            match self.attempt_match(user_id).await {
                Ok(MatchOutcome::Matched(_)) | Ok(MatchOutcome::NotSearching) => break,
                Ok(MatchOutcome::NoCandidate) | Ok(MatchOutcome::PartnerUnavailable) => {}
                Err(e) => {
                    tracing::error!("Matching for '{}' failed: {}", user_id, e);
                    self.abandon_search(user_id).await;
                    self.emitter
                        .to_user(user_id, &ServerEvent::error("Server error during matching", e.code()))
                        .await;
                    break;
                }
            }
        }
    }

    /// Drop `user_id` from the queue after an unrecoverable failure
    pub async fn abandon_search(&self, user_id: &UserId) {
        self.state.lock().await.stop_search(user_id);
    }
}

/// パートナー検索開始のユースケース
pub struct StartSearchUseCase {
    state: SharedMatchmakingState,
    store: Arc<dyn ChatStore>,
    matcher: Matcher,
}

impl StartSearchUseCase {
    pub fn new(state: SharedMatchmakingState, store: Arc<dyn ChatStore>, matcher: Matcher) -> Self {
        Self {
            state,
            store,
            matcher,
        }
    }

    /// 検索を開始し、即座に 1 回マッチングを試みる
    ///
    /// 候補がいなければバックグラウンドでリトライを続けます。
    pub async fn execute(&self, user_id: &UserId) -> Result<MatchOutcome, ChatError> {
        if self.store.find_user(user_id).await?.is_none() {
            return Err(ChatError::NotFound("User not found".to_string()));
        }

        self.state.lock().await.start_search(user_id)?;
        tracing::info!("User '{}' started searching", user_id);

        match self.matcher.attempt_match(user_id).await {
            Ok(outcome @ (MatchOutcome::NoCandidate | MatchOutcome::PartnerUnavailable)) => {
                self.matcher.schedule_retry(user_id).await;
                Ok(outcome)
            }
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.matcher.abandon_search(user_id).await;
                Err(e)
            }
        }
    }
}
