//! UseCase 層
//!
//! 1 操作につき 1 つの構造体（`new` + `execute`）。エンジン状態のロックは
//! ストアへの I/O をまたいで保持しません。

mod become_friends;
mod connect_user;
mod disconnect_user;
mod emitter;
mod error;
mod friend_chat;
mod friend_message;
mod get_state;
mod leave_chat;
mod relay_event;
mod start_search;
mod stop_search;
mod user_account;

#[cfg(test)]
mod test_support;

pub use become_friends::{BecameFriends, BecomeFriendsUseCase};
pub use connect_user::ConnectUserUseCase;
pub use disconnect_user::{DisconnectUserUseCase, GraceReconciler};
pub use emitter::EventEmitter;
pub use error::ChatError;
pub use friend_chat::{LeaveFriendChatUseCase, StartFriendChatUseCase};
pub use friend_message::{
    GetChatHistoryUseCase, MarkMessageSeenUseCase, SendFriendMessageUseCase,
    ValidateRandomMessageUseCase,
};
pub use get_state::GetStateUseCase;
pub use leave_chat::LeaveChatUseCase;
pub use relay_event::{RelayEventUseCase, RelayOutcome};
pub use start_search::{MatchOutcome, Matcher, StartSearchUseCase};
pub use stop_search::StopSearchUseCase;
pub use user_account::{AddFriendUseCase, CreateUserUseCase, GetFriendsUseCase, RemoveFriendUseCase};
