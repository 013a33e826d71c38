pub mod auth;
pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod session;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::clients::gemini::GeminiClient;
use crate::config::Config;
use crate::db::accounts::AccountStore;

/// Build the application router with fresh in-process state.
pub fn app(config: Config) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let gemini = GeminiClient::new(&config);

    Router::new()
        // Health
        .route("/health", get(routes::health::health_check))
        // Auth
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/me", get(routes::auth::me))
        // Board views
        .route("/api/board/ws", get(routes::board::ws_handler))
        // Analysis
        .route("/api/analysis", post(routes::analysis::analyze_game))
        .fallback(routes::not_found)
        // Shared state
        .layer(Extension(AccountStore::new()))
        .layer(Extension(config))
        .layer(Extension(gemini))
        .layer(cors)
}
