pub mod chat;
pub mod user;

pub use chat::{Chat, ChatMessage, ChatRole, ChatSummary};
pub use user::User;
