pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod email;
pub mod error;
pub mod llm;
pub mod models;
pub mod storage;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use config::ServerConfig;
use email::Mailer;
use llm::{LlmClient, OpenAiClient};
use storage::Storage;

/// Core application state shared by every handler and by integration tests.
pub struct AppCore {
    pub config: ServerConfig,
    pub storage: Arc<Storage>,
    pub llm: Arc<dyn LlmClient>,
    pub title_llm: Arc<dyn LlmClient>,
    pub mailer: Option<Mailer>,
}

impl AppCore {
    /// Build production state from configuration: redb storage, the two
    /// completion clients (chat and title summaries), and SMTP if set up.
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let storage = Arc::new(Storage::new(&config.database_path)?);

        let llm = Arc::new(
            OpenAiClient::new(&config.llm.api_key)
                .with_base_url(&config.llm.base_url)
                .with_model(&config.llm.chat_model),
        );
        let title_llm = Arc::new(
            OpenAiClient::new(&config.llm.api_key)
                .with_base_url(&config.llm.base_url)
                .with_model(&config.llm.title_model),
        );

        let mailer = match &config.smtp {
            Some(smtp) => Some(Mailer::new(smtp)?),
            None => None,
        };

        Ok(Self {
            config,
            storage,
            llm,
            title_llm,
            mailer,
        })
    }
}

/// Assemble the application router over shared state.
pub fn build_router(core: Arc<AppCore>) -> Router {
    Router::new()
        .route("/health", get(health))
        // Accounts and sessions
        .route("/api/auth/register", post(api::auth::register))
        .route("/api/auth/verify/{token}", get(api::auth::verify))
        .route("/api/auth/login", post(api::auth::login))
        .route("/api/auth/logout", post(api::auth::logout))
        .route("/api/auth/me", get(api::auth::me))
        .route("/api/auth/account", axum::routing::delete(api::auth::delete_account))
        // Conversations
        .route("/api/chats", get(api::chats::list_chats))
        .route(
            "/api/chats/{id}",
            get(api::chats::get_chat).delete(api::chats::delete_chat),
        )
        // The streaming relay
        .route("/api/chat", post(api::turn::stream_turn))
        .with_state(core)
}

#[derive(serde::Serialize)]
struct Health {
    status: String,
}

async fn health() -> axum::Json<Health> {
    axum::Json(Health {
        status: "codemate is working!".to_string(),
    })
}
