#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use axum::http::{Method, header};
use codemate::{AppCore, build_router, config::ServerConfig};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,codemate=debug".into()),
        )
        .with_target(false)
        .init();

    tracing::info!("Starting codemate backend server");

    let config = ServerConfig::load()?;
    let addr = format!("{}:{}", config.host, config.port);
    let core = Arc::new(AppCore::new(config)?);

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = build_router(core).layer(cors);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("codemate running on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
