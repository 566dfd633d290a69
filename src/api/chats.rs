//! Conversation listing and retrieval, always scoped to the session user.

use crate::api::{ApiResponse, state::AppState};
use crate::auth::require_user;
use crate::error::ApiError;
use crate::models::{Chat, ChatSummary};
use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};

// GET /api/chats
pub async fn list_chats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<ChatSummary>>>, ApiError> {
    let user = require_user(&state, &headers)?;
    let summaries = state.storage.chats.list_recent_for_owner(&user.id)?;
    Ok(Json(ApiResponse::ok(summaries)))
}

// GET /api/chats/{id}
pub async fn get_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Chat>>, ApiError> {
    let user = require_user(&state, &headers)?;
    let chat = state
        .storage
        .chats
        .find_for_owner(&id, &user.id)?
        .ok_or_else(|| ApiError::not_found("Chat"))?;
    Ok(Json(ApiResponse::ok(chat)))
}

// DELETE /api/chats/{id}
pub async fn delete_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let user = require_user(&state, &headers)?;
    if !state.storage.chats.delete_for_owner(&id, &user.id)? {
        return Err(ApiError::not_found("Chat"));
    }
    Ok(Json(ApiResponse::message("Chat deleted successfully")))
}
