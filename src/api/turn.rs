//! The streaming chat endpoint.
//!
//! Failures detected before the stream opens (auth, unknown chat, bad
//! action) are plain JSON error responses. Once streaming has begun, errors
//! travel inside the stream as a terminal event.

use std::convert::Infallible;

use crate::api::state::AppState;
use crate::auth::require_user;
use crate::chat::prompts;
use crate::chat::{TurnPrompt, run_turn};
use crate::error::ApiError;
use crate::models::{Chat, ChatMessage};
use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::{Sse, sse::Event},
};
use futures::{Stream, StreamExt};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub message: String,
    pub language: String,
    pub action: String,
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub instruction: Option<String>,
}

// POST /api/chat
pub async fn stream_turn(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TurnRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let user = require_user(&state, &headers)?;

    prompts::validate(&request.action, request.instruction.as_deref())?;
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("Message must not be empty"));
    }

    let (mut chat, is_new_chat) = match &request.chat_id {
        Some(chat_id) => {
            let chat = state
                .storage
                .chats
                .find_for_owner(chat_id, &user.id)?
                .ok_or_else(|| ApiError::not_found("Chat"))?;
            (chat, false)
        }
        None => (
            Chat::new(user.id.clone(), request.language.clone()),
            true,
        ),
    };

    // The user's message is on disk before the upstream call starts, so an
    // interrupted turn still leaves a record of what was asked.
    chat.add_message(ChatMessage::user(request.message.as_str()));
    if is_new_chat {
        state.storage.chats.create(&chat)?;
    } else {
        state.storage.chats.save(&mut chat)?;
    }

    let prompt = TurnPrompt {
        system_prompt: prompts::build_system_prompt(
            request.system_prompt.as_deref(),
            &request.action,
            &request.language,
            request.instruction.as_deref(),
        ),
        action: request.action.clone(),
    };

    tracing::debug!(
        chat_id = %chat.id,
        action = %request.action,
        new_chat = is_new_chat,
        "starting turn"
    );

    let events = run_turn(state.clone(), chat, is_new_chat, prompt).map(|event| {
        let frame = Event::default()
            .json_data(&event)
            .unwrap_or_else(|_| Event::default().data("{}"));
        Ok::<_, Infallible>(frame)
    });

    Ok(Sse::new(events))
}
