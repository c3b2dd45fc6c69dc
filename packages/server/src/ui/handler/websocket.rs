//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::{sync::mpsc, time::Instant};

use crate::{
    domain::{ConnectionId, MessageText, Timestamp, UserId},
    infrastructure::dto::websocket::{ClientEvent, ServerEvent},
    ui::{rate_limit::EventRateLimiter, state::AppState},
    usecase::ChatError,
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectQuery {
    /// Bind the connection right away instead of waiting for `set_username`
    #[serde(default)]
    pub user_id: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let user_id = match query.user_id {
        Some(raw) => match UserId::new(raw.clone()) {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!("Invalid userId format: '{}'", raw);
                return Err(StatusCode::BAD_REQUEST);
            }
        },
        None => None,
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

/// Forward events queued for this connection to the WebSocket sink
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: Option<UserId>) {
    let connection_id = ConnectionId::new();
    let (tx, rx) = mpsc::unbounded_channel();
    state.connect_user_usecase.register(connection_id, tx).await;
    tracing::info!("Connection '{}' opened", connection_id);

    if let Some(user_id) = &user_id {
        if let Err(e) = state
            .connect_user_usecase
            .execute(connection_id, user_id, None)
            .await
        {
            reject(&state, connection_id, "connect", &e).await;
        }
    }

    let (sender, mut receiver) = socket.split();
    let mut send_task = pusher_loop(rx, sender);

    let state_clone = state.clone();
    let mut recv_task = tokio::spawn(async move {
        let mut limiter = EventRateLimiter::new(
            state_clone.config.rate_limit_max_events,
            state_clone.config.rate_limit_window,
        );

        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error on '{}': {}", connection_id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    if !limiter.try_acquire(Instant::now()) {
                        tracing::warn!("Connection '{}' exceeded the event rate", connection_id);
                        let event = ServerEvent::error("Rate limit exceeded", "rate_limited");
                        state_clone.emitter.to_connection(&connection_id, &event).await;
                        continue;
                    }

                    let event = match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => event,
                        Err(e) => {
                            let error = ChatError::Validation(format!("Invalid event: {}", e));
                            reject(&state_clone, connection_id, "unknown", &error).await;
                            continue;
                        }
                    };

                    let name = event.name();
                    tracing::debug!("Received '{}' on '{}'", name, connection_id);
                    if let Err(e) = dispatch(&state_clone, connection_id, event).await {
                        reject(&state_clone, connection_id, name, &e).await;
                    }
                }
                Message::Ping(_) => {
                    tracing::debug!("Received ping");
                }
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", connection_id);
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    match state.disconnect_user_usecase.execute(&connection_id).await {
        Some(result) => tracing::info!(
            "Connection '{}' of user '{}' closed ({} remaining)",
            connection_id,
            result.user_id,
            result.remaining_connections
        ),
        None => tracing::info!("Unbound connection '{}' closed", connection_id),
    }
}

/// Send a single `error` event back to the originating connection
async fn reject(state: &AppState, connection_id: ConnectionId, event_name: &str, error: &ChatError) {
    tracing::warn!(
        "Rejected '{}' from connection '{}': {}",
        event_name,
        connection_id,
        error
    );
    let event = ServerEvent::error(error.to_string(), error.code());
    state.emitter.to_connection(&connection_id, &event).await;
}

fn parse_user(raw: String) -> Result<UserId, ChatError> {
    Ok(UserId::new(raw)?)
}

/// Resolve the acting user of an event carrying an explicit id
async fn acting_user(
    state: &AppState,
    connection_id: ConnectionId,
    raw: String,
) -> Result<UserId, ChatError> {
    let user_id = parse_user(raw)?;
    state
        .connect_user_usecase
        .ensure_bound(connection_id, &user_id)
        .await?;
    Ok(user_id)
}

async fn dispatch(
    state: &AppState,
    connection_id: ConnectionId,
    event: ClientEvent,
) -> Result<(), ChatError> {
    match event {
        ClientEvent::SetUsername(p) => {
            let user_id = parse_user(p.user_id)?;
            state
                .connect_user_usecase
                .execute(connection_id, &user_id, p.username.as_deref())
                .await?;
        }
        ClientEvent::StartSearch(p) => {
            let user_id = acting_user(state, connection_id, p.user_id).await?;
            state.start_search_usecase.execute(&user_id).await?;
        }
        ClientEvent::StopSearch(p) => {
            let user_id = acting_user(state, connection_id, p.user_id).await?;
            state.stop_search_usecase.execute(&user_id).await;
        }
        ClientEvent::StartFriendChat(p) => {
            let user_id = acting_user(state, connection_id, p.user_id).await?;
            let friend_id = parse_user(p.friend_id)?;
            state
                .start_friend_chat_usecase
                .execute(&user_id, &friend_id)
                .await?;
        }
        ClientEvent::LeaveFriendChat(p) => {
            let user_id = acting_user(state, connection_id, p.user_id).await?;
            let friend_id = parse_user(p.friend_id)?;
            state
                .leave_friend_chat_usecase
                .execute(&user_id, &friend_id)
                .await;
        }
        ClientEvent::LeaveChat(p) => {
            let partner_id = parse_user(p.to_user_id)?;
            let Some(user_id) = state.connect_user_usecase.bound_user(&connection_id).await else {
                return Err(ChatError::Validation(
                    "Connection is not identified".to_string(),
                ));
            };
            state.leave_chat_usecase.execute(&user_id, &partner_id).await;
        }
        ClientEvent::SendMessage(p) => {
            let user_id = acting_user(state, connection_id, p.from_user_id).await?;
            let partner_id = parse_user(p.to_user_id)?;
            let text = MessageText::new(p.message)?;
            state
                .relay_event_usecase
                .send_message(&user_id, &partner_id, text, Timestamp::new(p.timestamp))
                .await?;
        }
        ClientEvent::Typing(p) => {
            let user_id = acting_user(state, connection_id, p.from_user_id).await?;
            let partner_id = parse_user(p.to_user_id)?;
            state.relay_event_usecase.typing(&user_id, &partner_id).await?;
        }
        ClientEvent::MessageSeen(p) => {
            let user_id = acting_user(state, connection_id, p.from_user_id).await?;
            let partner_id = parse_user(p.to_user_id)?;
            state
                .relay_event_usecase
                .message_seen(&user_id, &partner_id, Timestamp::new(p.timestamp))
                .await?;
        }
        ClientEvent::FriendRequestSent(p) => {
            let user_id = acting_user(state, connection_id, p.from_user_id).await?;
            let partner_id = parse_user(p.to_user_id)?;
            state
                .relay_event_usecase
                .friend_request_sent(&user_id, &partner_id, p.from_username)
                .await?;
        }
        ClientEvent::FriendRequestAccepted(p) => {
            let user_id = acting_user(state, connection_id, p.user_id).await?;
            let friend_id = parse_user(p.friend_id)?;
            state
                .become_friends_usecase
                .execute(&user_id, &friend_id)
                .await?;
        }
        ClientEvent::FriendRequestRejected(p) => {
            let user_id = acting_user(state, connection_id, p.user_id).await?;
            let friend_id = parse_user(p.friend_id)?;
            state
                .relay_event_usecase
                .friend_request_rejected(&user_id, &friend_id)
                .await?;
        }
    }
    Ok(())
}
