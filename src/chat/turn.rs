//! The streaming relay: executes one chat turn end-to-end.
//!
//! A turn forwards upstream tokens to the client the moment they arrive
//! while accumulating the full response locally. Only after the upstream
//! stream ends is the accumulated text post-processed, persisted, and
//! acknowledged with a terminal completion event. Every exit path of the
//! stream ends with exactly one terminal event.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::AppCore;
use crate::chat::format::{format_code_fences, strip_title_quotes};
use crate::llm::{CompletionRequest, Message};
use crate::models::{Chat, ChatMessage, ChatRole};

/// One frame of the relay's event stream.
///
/// Exactly one `Completed` or `Error` frame terminates every stream; no
/// `Token` frame follows a terminal frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TurnEvent {
    Token {
        token: String,
    },
    #[serde(rename_all = "camelCase")]
    Completed {
        chat_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        new_chat_id: Option<String>,
        assistant_message: String,
    },
    Error {
        error: String,
    },
}

impl TurnEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TurnEvent::Token { .. })
    }
}

/// Prompt material for a turn, composed by the handler before streaming.
#[derive(Debug, Clone)]
pub struct TurnPrompt {
    pub system_prompt: String,
    pub action: String,
}

fn upstream_messages(chat: &Chat, prompt: &TurnPrompt) -> Vec<Message> {
    let mut messages = vec![Message::system(&prompt.system_prompt)];
    for msg in &chat.messages {
        messages.push(match msg.role {
            ChatRole::User => Message::user(&msg.content),
            ChatRole::Assistant => Message::assistant(&msg.content),
            ChatRole::System => Message::system(&msg.content),
        });
    }
    messages
}

/// Run one turn against the completion provider.
///
/// The caller has already recorded the user's message on `chat` and saved
/// it, so a crash mid-stream leaves a record of what was asked. The
/// returned stream yields token events in upstream arrival order, then one
/// terminal event. On upstream or persistence failure the assistant text is
/// not persisted; the chat keeps only the user message.
pub fn run_turn(
    core: Arc<AppCore>,
    mut chat: Chat,
    is_new_chat: bool,
    prompt: TurnPrompt,
) -> impl Stream<Item = TurnEvent> + Send {
    async_stream::stream! {
        let request = CompletionRequest::new(upstream_messages(&chat, &prompt))
            .with_temperature(core.config.llm.temperature)
            .with_max_tokens(core.config.llm.max_tokens);

        let mut upstream = core.llm.complete_stream(request);
        let mut assistant_response = String::new();

        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(chunk) => {
                    if !chunk.text.is_empty() {
                        assistant_response.push_str(&chunk.text);
                        yield TurnEvent::Token { token: chunk.text };
                    }
                    if let Some(usage) = chunk.usage {
                        tracing::debug!(
                            chat_id = %chat.id,
                            total_tokens = usage.total_tokens,
                            "turn token usage"
                        );
                    }
                }
                Err(e) => {
                    tracing::error!(chat_id = %chat.id, error = %e, "upstream stream failed");
                    yield TurnEvent::Error {
                        error: "The completion provider failed mid-stream".to_string(),
                    };
                    return;
                }
            }
        }

        // Fence markers can be split across token boundaries, so the
        // post-process runs once on the accumulated text.
        let formatted = format_code_fences(&assistant_response);
        chat.add_message(ChatMessage::assistant(formatted.clone()));

        if is_new_chat {
            chat.title = summarize_title(&core, &chat.messages, &prompt.action).await;
        }

        if let Err(e) = core.storage.chats.save(&mut chat) {
            tracing::error!(chat_id = %chat.id, error = %e, "failed to persist turn");
            yield TurnEvent::Error {
                error: "Failed to save the conversation".to_string(),
            };
            return;
        }

        yield TurnEvent::Completed {
            chat_id: chat.id.clone(),
            new_chat_id: is_new_chat.then(|| chat.id.clone()),
            assistant_message: formatted,
        };
    }
}

/// Generate a 2-word title for a fresh conversation with a secondary,
/// non-streaming completion call. Falls back to a timestamp title so a
/// failed summary never fails the turn.
async fn summarize_title(core: &AppCore, messages: &[ChatMessage], action: &str) -> String {
    let mut request_messages = vec![Message::system(format!(
        "Generate a concise 2-word title for the given coding conversation. The \
         conversation is about a {} action. Focus on the main programming topic discussed.",
        action.to_uppercase()
    ))];
    for msg in messages {
        request_messages.push(match msg.role {
            ChatRole::User => Message::user(&msg.content),
            ChatRole::Assistant => Message::assistant(&msg.content),
            ChatRole::System => Message::system(&msg.content),
        });
    }

    let request = CompletionRequest::new(request_messages).with_max_tokens(4);

    match core.title_llm.complete(request).await {
        Ok(response) => {
            let title = response
                .content
                .map(|content| strip_title_quotes(&content))
                .unwrap_or_default();
            if title.is_empty() {
                fallback_title()
            } else {
                title
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "title summary failed, using fallback");
            fallback_title()
        }
    }
}

fn fallback_title() -> String {
    format!("Chat {}", chrono::Utc::now().to_rfc3339())
}
