use axum::{extract::State, response::IntoResponse};
use uuid::Uuid;

use crate::{
    auth::jwt,
    conversations::{ConversationResponse, CreateConversation},
    error::AppError,
    extract::{Json, Path},
    response::ApiResponse,
    SharedStore,
};

/// Get the conversation with a friend, creating it on first contact
/// POST /conversations
pub async fn get_or_create_conversation(
    State(store): State<SharedStore>,
    claims: jwt::Claims,
    Json(payload): Json<CreateConversation>,
) -> Result<impl IntoResponse, AppError> {
    if payload.friend_id == claims.sub {
        return Err(AppError::ValidationFailure(
            "You cannot start a conversation with yourself".to_string(),
        ));
    }

    let conversation = store
        .get_or_create_conversation(claims.sub, payload.friend_id)
        .await?;

    Ok(ApiResponse::success(ConversationResponse::from(
        conversation,
    )))
}

/// Every conversation the user is a member of
/// GET /conversations/:user_id
pub async fn get_conversations(
    State(store): State<SharedStore>,
    _claims: jwt::Claims,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let conversations = store.conversations_for(user_id).await?;

    let response: Vec<ConversationResponse> = conversations
        .into_iter()
        .map(ConversationResponse::from)
        .collect();

    Ok(ApiResponse::success(response))
}
