//! Deterministic scripted LLM client for tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::llm::client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Role, StreamChunk,
    StreamResult, TokenUsage,
};
use crate::llm::error::{LlmError, Result};

/// Deterministic step for scripted mock completions.
#[derive(Debug, Clone)]
pub enum MockStepKind {
    /// Return a plain assistant message (streamed as a single chunk).
    Text(String),
    /// Stream each token as its own chunk, then optionally fail.
    Stream {
        tokens: Vec<String>,
        error: Option<String>,
    },
    /// Return an LLM error.
    Error(String),
}

/// Scripted completion step.
#[derive(Debug, Clone)]
pub struct MockStep {
    pub kind: MockStepKind,
}

impl MockStep {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: MockStepKind::Text(content.into()),
        }
    }

    pub fn stream(tokens: &[&str]) -> Self {
        Self {
            kind: MockStepKind::Stream {
                tokens: tokens.iter().map(|t| t.to_string()).collect(),
                error: None,
            },
        }
    }

    pub fn stream_then_error(tokens: &[&str], error: impl Into<String>) -> Self {
        Self {
            kind: MockStepKind::Stream {
                tokens: tokens.iter().map(|t| t.to_string()).collect(),
                error: Some(error.into()),
            },
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: MockStepKind::Error(message.into()),
        }
    }
}

/// A deterministic mock LLM client driven by scripted steps.
///
/// Steps are consumed one per call, across both `complete` and
/// `complete_stream`. With an empty script the client echoes the last user
/// message.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    model: String,
    script: Arc<Mutex<VecDeque<MockStep>>>,
}

impl MockLlmClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            script: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn from_steps(model: impl Into<String>, steps: Vec<MockStep>) -> Self {
        Self {
            model: model.into(),
            script: Arc::new(Mutex::new(VecDeque::from(steps))),
        }
    }

    pub async fn push_step(&self, step: MockStep) {
        self.script.lock().await.push_back(step);
    }

    async fn next_step(&self) -> Option<MockStep> {
        self.script.lock().await.pop_front()
    }

    fn usage_for(content_len: usize) -> TokenUsage {
        let completion_tokens = content_len as u32;
        TokenUsage {
            prompt_tokens: 1,
            completion_tokens,
            total_tokens: 1 + completion_tokens,
        }
    }

    fn fallback_response(request: &CompletionRequest) -> CompletionResponse {
        let text = request
            .messages
            .iter()
            .rev()
            .find(|msg| matches!(msg.role, Role::User))
            .map(|msg| format!("mock-echo: {}", msg.content))
            .unwrap_or_else(|| "mock-ok".to_string());

        CompletionResponse {
            content: Some(text.clone()),
            finish_reason: FinishReason::Stop,
            usage: Some(Self::usage_for(text.len())),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let Some(step) = self.next_step().await else {
            return Ok(Self::fallback_response(&request));
        };

        match step.kind {
            MockStepKind::Text(content) => Ok(CompletionResponse {
                usage: Some(Self::usage_for(content.len())),
                content: Some(content),
                finish_reason: FinishReason::Stop,
            }),
            MockStepKind::Stream { tokens, error } => {
                if let Some(error) = error {
                    return Err(LlmError::Llm(error));
                }
                let content = tokens.concat();
                Ok(CompletionResponse {
                    usage: Some(Self::usage_for(content.len())),
                    content: Some(content),
                    finish_reason: FinishReason::Stop,
                })
            }
            MockStepKind::Error(message) => Err(LlmError::Llm(message)),
        }
    }

    fn complete_stream(&self, request: CompletionRequest) -> StreamResult {
        let client = self.clone();
        Box::pin(stream! {
            let Some(step) = client.next_step().await else {
                let response = Self::fallback_response(&request);
                if let Some(content) = response.content {
                    yield Ok(StreamChunk::text(content));
                }
                yield Ok(StreamChunk::final_chunk(FinishReason::Stop, response.usage));
                return;
            };

            match step.kind {
                MockStepKind::Text(content) => {
                    let usage = Self::usage_for(content.len());
                    if !content.is_empty() {
                        yield Ok(StreamChunk::text(content));
                    }
                    yield Ok(StreamChunk::final_chunk(FinishReason::Stop, Some(usage)));
                }
                MockStepKind::Stream { tokens, error } => {
                    let len: usize = tokens.iter().map(String::len).sum();
                    for token in tokens {
                        yield Ok(StreamChunk::text(token));
                    }
                    match error {
                        Some(error) => yield Err(LlmError::Llm(error)),
                        None => yield Ok(StreamChunk::final_chunk(
                            FinishReason::Stop,
                            Some(Self::usage_for(len)),
                        )),
                    }
                }
                MockStepKind::Error(message) => {
                    yield Err(LlmError::Llm(message));
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_scripted_text() {
        let client = MockLlmClient::from_steps("mock-model", vec![MockStep::text("hello")]);

        let response = client
            .complete(CompletionRequest::new(vec![Message::user("ping")]))
            .await
            .expect("mock response should succeed");

        assert_eq!(response.content.as_deref(), Some("hello"));
        assert_eq!(response.finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn test_stream_yields_each_token() {
        let client = MockLlmClient::from_steps(
            "mock-model",
            vec![MockStep::stream(&["Hel", "lo", " world"])],
        );

        let chunks: Vec<StreamChunk> = client
            .complete_stream(CompletionRequest::new(vec![Message::user("hi")]))
            .try_collect()
            .await
            .expect("stream should succeed");

        let texts: Vec<&str> = chunks
            .iter()
            .filter(|c| !c.text.is_empty())
            .map(|c| c.text.as_str())
            .collect();
        assert_eq!(texts, vec!["Hel", "lo", " world"]);
        assert!(chunks.last().unwrap().finish_reason.is_some());
    }

    #[tokio::test]
    async fn test_stream_then_error() {
        let client = MockLlmClient::from_steps(
            "mock-model",
            vec![MockStep::stream_then_error(&["partial"], "connection reset")],
        );

        let mut stream = client.complete_stream(CompletionRequest::new(vec![Message::user("hi")]));
        use futures::StreamExt;

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.text, "partial");

        let second = stream.next().await.unwrap();
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_fallback_echoes_user() {
        let client = MockLlmClient::new("mock-model");

        let response = client
            .complete(CompletionRequest::new(vec![Message::user("ping")]))
            .await
            .unwrap();

        assert_eq!(response.content.as_deref(), Some("mock-echo: ping"));
    }
}
