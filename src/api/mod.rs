pub mod auth;
pub mod chats;
pub mod response;
pub mod state;
pub mod turn;

pub use response::ApiResponse;
