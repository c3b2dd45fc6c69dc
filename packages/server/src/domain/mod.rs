//! Domain layer.
//!
//! Value objects, entities, the matchmaking engine aggregate and the traits
//! for the external collaborators (durable store and realtime transport).
//! Nothing in here performs I/O.

pub mod entity;
pub mod error;
pub mod matchmaking;
pub mod message_buffer;
pub mod message_pusher;
pub mod presence;
pub mod repository;
pub mod room_registry;
pub mod search_queue;
pub mod value_object;

pub use entity::{Chat, ChatMessage, Room, User};
pub use error::{
    MatchError, MessagePushError, QueueError, RoomError, StoreError, ValueObjectError,
};
pub use matchmaking::{
    BindResult, GraceOutcome, FriendRoomOpened, MatchmakingState, SharedMatchmakingState,
    StateSnapshot, UnbindResult,
};
pub use message_buffer::{AppendOutcome, MessageBuffer};
pub use message_pusher::{GroupId, MessagePusher, PusherChannel};
pub use presence::PresenceTracker;
pub use repository::ChatStore;
pub use room_registry::RoomRegistry;
pub use search_queue::SearchQueue;
pub use value_object::{ConnectionId, MessageText, RoomId, RoomKind, Timestamp, UserId};
