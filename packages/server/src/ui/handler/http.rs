//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::{MessageText, StateSnapshot, Timestamp, UserId},
    infrastructure::dto::http::{
        ChatHistoryResponse, CreateUserRequest, CreateUserResponse, ErrorResponse,
        FriendPairRequest, FriendsResponse, MarkSeenRequest, MessageResponse,
        SendFriendMessageRequest, SendRandomMessageRequest,
    },
    ui::state::AppState,
    usecase::ChatError,
};

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn status_of(error: &ChatError) -> StatusCode {
    match error {
        ChatError::Validation(_) => StatusCode::BAD_REQUEST,
        ChatError::AlreadyActive(_) | ChatError::PartnerUnavailable(_) => StatusCode::CONFLICT,
        ChatError::NotEligible(_) | ChatError::StaleRoom(_) => StatusCode::FORBIDDEN,
        ChatError::NotFound(_) => StatusCode::NOT_FOUND,
        ChatError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(error: ChatError) -> ApiError {
    let status = status_of(&error);
    if status.is_server_error() {
        tracing::error!("Request failed: {}", error);
    } else {
        tracing::warn!("Request rejected: {}", error);
    }
    (
        status,
        Json(ErrorResponse {
            message: error.to_string(),
            code: error.code().to_string(),
        }),
    )
}

fn parse_user(raw: String) -> Result<UserId, ApiError> {
    UserId::new(raw).map_err(|e| api_error(e.into()))
}

/// Debug endpoint to get the current engine state
pub async fn debug_state(State(state): State<Arc<AppState>>) -> Json<StateSnapshot> {
    Json(state.get_state_usecase.execute().await)
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// `POST /api/chats/send`
pub async fn send_friend_message(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SendFriendMessageRequest>,
) -> ApiResult<MessageResponse> {
    let user_id = parse_user(body.user_id)?;
    let friend_id = parse_user(body.friend_id)?;
    let text = MessageText::new(body.message).map_err(|e| api_error(e.into()))?;

    state
        .send_friend_message_usecase
        .execute(&user_id, &friend_id, text)
        .await
        .map_err(api_error)?;
    Ok(Json(MessageResponse::new("Message sent")))
}

/// `POST /api/chats/send-random`
///
/// Validation only; the message itself travels over the WebSocket.
pub async fn validate_random_message(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SendRandomMessageRequest>,
) -> ApiResult<MessageResponse> {
    let user_id = parse_user(body.user_id)?;
    let partner_id = parse_user(body.partner_id)?;
    MessageText::new(body.message).map_err(|e| api_error(e.into()))?;

    state
        .validate_random_message_usecase
        .execute(&user_id, &partner_id)
        .await
        .map_err(api_error)?;
    Ok(Json(MessageResponse::new("Message can be sent")))
}

/// `GET /api/chats/{user_id}/{friend_id}`
pub async fn get_chat_history(
    State(state): State<Arc<AppState>>,
    Path((user_id, friend_id)): Path<(String, String)>,
) -> ApiResult<ChatHistoryResponse> {
    let user_id = parse_user(user_id)?;
    let friend_id = parse_user(friend_id)?;

    let messages = state
        .get_chat_history_usecase
        .execute(&user_id, &friend_id)
        .await
        .map_err(api_error)?;

    // Domain Model から DTO への変換
    Ok(Json(ChatHistoryResponse {
        messages: messages.into_iter().map(Into::into).collect(),
    }))
}

/// `POST /api/chats/seen`
pub async fn mark_message_seen(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MarkSeenRequest>,
) -> ApiResult<MessageResponse> {
    let user_id = parse_user(body.user_id)?;
    let friend_id = parse_user(body.friend_id)?;

    state
        .mark_message_seen_usecase
        .execute(&user_id, &friend_id, Timestamp::new(body.timestamp))
        .await
        .map_err(api_error)?;
    Ok(Json(MessageResponse::new("Message marked as seen")))
}

/// `POST /api/users/create`
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreateUserResponse>), ApiError> {
    let user = state
        .create_user_usecase
        .execute(&body.user_name)
        .await
        .map_err(api_error)?;
    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse { user: user.into() }),
    ))
}

/// `POST /api/users/add-friend`
pub async fn add_friend(
    State(state): State<Arc<AppState>>,
    Json(body): Json<FriendPairRequest>,
) -> ApiResult<MessageResponse> {
    let user_id = parse_user(body.user_id)?;
    let friend_id = parse_user(body.friend_id)?;

    state
        .add_friend_usecase
        .execute(&user_id, &friend_id)
        .await
        .map_err(api_error)?;
    Ok(Json(MessageResponse::new("Friend added")))
}

/// `DELETE /api/users/remove-friend/{user_id}/{friend_id}`
pub async fn remove_friend(
    State(state): State<Arc<AppState>>,
    Path((user_id, friend_id)): Path<(String, String)>,
) -> ApiResult<MessageResponse> {
    let user_id = parse_user(user_id)?;
    let friend_id = parse_user(friend_id)?;

    state
        .remove_friend_usecase
        .execute(&user_id, &friend_id)
        .await
        .map_err(api_error)?;
    Ok(Json(MessageResponse::new("Friend removed")))
}

/// `GET /api/users/friends/{user_id}`
pub async fn get_friends(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<FriendsResponse> {
    let user_id = parse_user(user_id)?;

    let friends = state
        .get_friends_usecase
        .execute(&user_id)
        .await
        .map_err(api_error)?;
    Ok(Json(FriendsResponse {
        friends: friends.into_iter().map(Into::into).collect(),
    }))
}
