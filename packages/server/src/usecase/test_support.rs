//! Test fixtures shared by the use case tests.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    config::EngineConfig,
    domain::{
        ChatStore, ConnectionId, MatchmakingState, Room, SharedMatchmakingState, User, UserId,
    },
    infrastructure::{
        message_pusher::WebSocketMessagePusher, repository::InMemoryChatStore,
        scheduler::TaskScheduler,
    },
};

use super::{
    connect_user::ConnectUserUseCase,
    disconnect_user::{DisconnectUserUseCase, GraceReconciler},
    emitter::EventEmitter,
    start_search::{Matcher, StartSearchUseCase},
};

pub fn user(hex: char) -> UserId {
    UserId::new(hex.to_string().repeat(24)).unwrap()
}

/// Parsed events received so far on a connection
pub fn received(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<serde_json::Value> {
    let mut events = Vec::new();
    while let Ok(json) = rx.try_recv() {
        events.push(serde_json::from_str(&json).unwrap());
    }
    events
}

pub fn event_types(events: &[serde_json::Value]) -> Vec<String> {
    events
        .iter()
        .map(|e| e["type"].as_str().unwrap_or_default().to_string())
        .collect()
}

pub struct Harness {
    pub config: EngineConfig,
    pub state: SharedMatchmakingState,
    pub store: Arc<InMemoryChatStore>,
    pub pusher: Arc<WebSocketMessagePusher>,
    pub emitter: EventEmitter,
    pub retries: Arc<TaskScheduler>,
    pub grace_timers: Arc<TaskScheduler>,
}

impl Harness {
    pub fn new() -> Self {
        let config = EngineConfig::default();
        let pusher = Arc::new(WebSocketMessagePusher::new());
        Self {
            state: MatchmakingState::shared(config.dedup_window_millis(), config.max_buffered_messages),
            store: Arc::new(InMemoryChatStore::new()),
            emitter: EventEmitter::new(pusher.clone()),
            pusher,
            retries: Arc::new(TaskScheduler::new("match-retry")),
            grace_timers: Arc::new(TaskScheduler::new("grace")),
            config,
        }
    }

    pub async fn add_user(&self, hex: char, name: &str) -> UserId {
        let id = user(hex);
        self.store
            .save_user(User::new(id.clone(), name.to_string()))
            .await
            .unwrap();
        id
    }

    pub async fn befriend(&self, a: &UserId, b: &UserId) {
        for (owner, friend) in [(a, b), (b, a)] {
            let mut u = self.store.find_user(owner).await.unwrap().unwrap();
            u.friends.insert(friend.clone());
            self.store.save_user(u).await.unwrap();
        }
    }

    pub async fn connect(&self, user_id: &UserId) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let usecase = self.connect_usecase();
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = ConnectionId::new();
        usecase.register(conn, tx).await;
        usecase.execute(conn, user_id, None).await.unwrap();
        (conn, rx)
    }

    /// Put two online users into a random room, bypassing the matcher
    pub async fn pair(&self, a: &UserId, b: &UserId) -> Room {
        let mut state = self.state.lock().await;
        state.start_search(a).unwrap();
        state.start_search(b).unwrap();
        let room = state.commit_match(a, b).unwrap();
        let mut connections = state.connections_of(a);
        connections.extend(state.connections_of(b));
        self.emitter.join_room(&connections, &room.id).await;
        room
    }

    pub fn connect_usecase(&self) -> ConnectUserUseCase {
        ConnectUserUseCase::new(
            self.state.clone(),
            self.emitter.clone(),
            self.grace_timers.clone(),
        )
    }

    pub fn disconnect_usecase(&self) -> DisconnectUserUseCase {
        DisconnectUserUseCase::new(
            GraceReconciler::new(self.state.clone(), self.emitter.clone()),
            self.retries.clone(),
            self.grace_timers.clone(),
            self.config.grace_period,
        )
    }

    pub fn matcher(&self) -> Matcher {
        Matcher::new(
            self.state.clone(),
            self.store.clone(),
            self.emitter.clone(),
            self.retries.clone(),
            &self.config,
        )
    }

    pub fn start_search_usecase(&self) -> StartSearchUseCase {
        StartSearchUseCase::new(self.state.clone(), self.store.clone(), self.matcher())
    }
}
