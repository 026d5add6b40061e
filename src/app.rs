use crate::assets;
use crate::state;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderValue, Request, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};

mod admin;
mod auth;
mod push;

pub fn app(state: state::AppState) -> Router {
    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/request-reset", post(auth::request_reset))
        .route("/api/auth/reset", post(auth::reset_password))
        .route("/api/push/subscribe", post(push::subscribe))
        .route("/api/push/unsubscribe", post(push::unsubscribe))
        .route("/api/push/public-key", get(push::public_key))
        .route("/api/push/test", post(push::send_test))
        .route("/api/admin/users", get(admin::list_users))
        .route("/sw.js", get(assets::service_worker))
        .route("/health", get(health))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(state, auth::auth_middleware))
        .layer(middleware::from_fn(cache_control))
}

/// Session-scoped data must never be cached by intermediaries, so every
/// response except the static assets carries no-store directives. Assets set
/// their own long-lived cache header.
async fn cache_control(req: Request<Body>, next: Next) -> Response {
    let static_asset = req.uri().path() == "/sw.js";
    let mut response = next.run(req).await;
    if static_asset {
        return response;
    }

    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate, proxy-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    response
}

pub(crate) async fn health() -> &'static str {
    "ok"
}
