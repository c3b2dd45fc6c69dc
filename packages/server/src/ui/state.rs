//! Shared application state.

use std::sync::Arc;

use deai_shared::time::Clock;

use crate::{
    config::EngineConfig,
    domain::{ChatStore, MatchmakingState, MessagePusher},
    infrastructure::scheduler::TaskScheduler,
    usecase::{
        AddFriendUseCase, BecomeFriendsUseCase, ConnectUserUseCase, CreateUserUseCase,
        DisconnectUserUseCase, EventEmitter, GetChatHistoryUseCase, GetFriendsUseCase,
        GetStateUseCase, GraceReconciler, LeaveChatUseCase, LeaveFriendChatUseCase,
        MarkMessageSeenUseCase, Matcher, RelayEventUseCase, RemoveFriendUseCase,
        SendFriendMessageUseCase, StartFriendChatUseCase, StartSearchUseCase, StopSearchUseCase,
        ValidateRandomMessageUseCase,
    },
};

/// Shared application state
pub struct AppState {
    pub config: EngineConfig,
    /// 接続単位のエラー通知に使用
    pub emitter: EventEmitter,

    // realtime
    pub connect_user_usecase: Arc<ConnectUserUseCase>,
    pub disconnect_user_usecase: Arc<DisconnectUserUseCase>,
    pub start_search_usecase: Arc<StartSearchUseCase>,
    pub stop_search_usecase: Arc<StopSearchUseCase>,
    pub start_friend_chat_usecase: Arc<StartFriendChatUseCase>,
    pub leave_friend_chat_usecase: Arc<LeaveFriendChatUseCase>,
    pub leave_chat_usecase: Arc<LeaveChatUseCase>,
    pub relay_event_usecase: Arc<RelayEventUseCase>,
    pub become_friends_usecase: Arc<BecomeFriendsUseCase>,

    // http
    pub send_friend_message_usecase: Arc<SendFriendMessageUseCase>,
    pub get_chat_history_usecase: Arc<GetChatHistoryUseCase>,
    pub mark_message_seen_usecase: Arc<MarkMessageSeenUseCase>,
    pub validate_random_message_usecase: Arc<ValidateRandomMessageUseCase>,
    pub create_user_usecase: Arc<CreateUserUseCase>,
    pub add_friend_usecase: Arc<AddFriendUseCase>,
    pub remove_friend_usecase: Arc<RemoveFriendUseCase>,
    pub get_friends_usecase: Arc<GetFriendsUseCase>,
    pub get_state_usecase: Arc<GetStateUseCase>,
}

impl AppState {
    /// Wire every use case around one engine state
    ///
    /// # Arguments
    ///
    /// * `store` - Durable store of users, friendships and transcripts
    /// * `pusher` - Realtime transport multiplexer
    /// * `clock` - Timestamp source for persisted friend messages
    /// * `config` - Engine tunables
    pub fn new(
        store: Arc<dyn ChatStore>,
        pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        let state = MatchmakingState::shared(config.dedup_window_millis(), config.max_buffered_messages);
        let emitter = EventEmitter::new(pusher);
        let match_retries = Arc::new(TaskScheduler::new("match-retry"));
        let grace_timers = Arc::new(TaskScheduler::new("grace"));

        let matcher = Matcher::new(
            state.clone(),
            store.clone(),
            emitter.clone(),
            match_retries.clone(),
            &config,
        );
        let reconciler = GraceReconciler::new(state.clone(), emitter.clone());

        Self {
            connect_user_usecase: Arc::new(ConnectUserUseCase::new(
                state.clone(),
                emitter.clone(),
                grace_timers.clone(),
            )),
            disconnect_user_usecase: Arc::new(DisconnectUserUseCase::new(
                reconciler,
                match_retries.clone(),
                grace_timers,
                config.grace_period,
            )),
            start_search_usecase: Arc::new(StartSearchUseCase::new(
                state.clone(),
                store.clone(),
                matcher,
            )),
            stop_search_usecase: Arc::new(StopSearchUseCase::new(
                state.clone(),
                match_retries.clone(),
            )),
            start_friend_chat_usecase: Arc::new(StartFriendChatUseCase::new(
                state.clone(),
                store.clone(),
                emitter.clone(),
                match_retries,
            )),
            leave_friend_chat_usecase: Arc::new(LeaveFriendChatUseCase::new(
                state.clone(),
                emitter.clone(),
            )),
            leave_chat_usecase: Arc::new(LeaveChatUseCase::new(state.clone(), emitter.clone())),
            relay_event_usecase: Arc::new(RelayEventUseCase::new(state.clone(), emitter.clone())),
            become_friends_usecase: Arc::new(BecomeFriendsUseCase::new(
                state.clone(),
                store.clone(),
                emitter.clone(),
            )),
            send_friend_message_usecase: Arc::new(SendFriendMessageUseCase::new(
                store.clone(),
                emitter.clone(),
                clock,
            )),
            get_chat_history_usecase: Arc::new(GetChatHistoryUseCase::new(store.clone())),
            mark_message_seen_usecase: Arc::new(MarkMessageSeenUseCase::new(
                store.clone(),
                emitter.clone(),
            )),
            validate_random_message_usecase: Arc::new(ValidateRandomMessageUseCase::new(
                state.clone(),
            )),
            create_user_usecase: Arc::new(CreateUserUseCase::new(store.clone())),
            add_friend_usecase: Arc::new(AddFriendUseCase::new(store.clone())),
            remove_friend_usecase: Arc::new(RemoveFriendUseCase::new(store.clone())),
            get_friends_usecase: Arc::new(GetFriendsUseCase::new(store)),
            get_state_usecase: Arc::new(GetStateUseCase::new(state)),
            emitter,
            config,
        }
    }
}
