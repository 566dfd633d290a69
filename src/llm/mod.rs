//! LLM module - completion-provider client abstraction

mod client;
mod error;
mod mock;
mod openai;

pub use client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, Role, StreamChunk,
    StreamResult, TokenUsage,
};
pub use error::{LlmError, Result};
pub use mock::{MockLlmClient, MockStep, MockStepKind};
pub use openai::OpenAiClient;
