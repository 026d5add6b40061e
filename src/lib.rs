pub mod adapters;
pub mod app;
mod assets;
pub mod auth;
pub mod cache;
pub mod config;
pub mod errors;
pub mod password;
pub mod ports;
pub mod push;
pub mod reset;
pub mod state;
pub mod storage;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

pub async fn serve(addr: SocketAddr, config: config::AppConfig) {
    let auth = auth::AuthState::from_config(&config)
        .unwrap_or_else(|err| panic!("invalid auth configuration: {err}"));
    let db = storage::Database::open(&config.database_path)
        .await
        .unwrap_or_else(|err| panic!("failed to open database: {err}"));
    let cache = Arc::new(Mutex::new(cache::ResponseCache::new(
        adapters::SystemClock,
        config.cache_capacity,
    )));
    let state = state::AppState {
        config,
        auth,
        db,
        cache,
    };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app::app(state)).await.expect("server error");
}
