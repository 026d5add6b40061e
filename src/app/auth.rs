use crate::auth::Role;
use crate::errors::{ApiError, ApiSuccess};
use crate::password;
use crate::reset;
use crate::state;
use crate::storage::models::User;

use axum::Json;
use axum::body::Body;
use axum::extract::{Extension, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::error;

/// Verified identity attached to the request by the session gateway.
#[derive(Debug, Clone)]
pub(crate) struct CurrentUser {
    pub(crate) id: String,
    pub(crate) role: Role,
}

pub(crate) async fn auth_middleware(
    State(state): State<state::AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path();
    if is_auth_bypass_path(path) {
        return next.run(req).await;
    }

    // Missing, tampered, and expired cookies all collapse into the same
    // response; the client learns nothing about why the token was rejected.
    if let Some(token) = auth_cookie(req.headers(), state.auth.cookie_name())
        && let Ok(claims) = state.auth.verify_token(token)
    {
        req.extensions_mut().insert(CurrentUser {
            id: claims.subject,
            role: claims.role,
        });
        return next.run(req).await;
    }

    ApiError::Unauthorized.into_response()
}

fn is_auth_bypass_path(path: &str) -> bool {
    path == "/health"
        || path == "/sw.js"
        || path == "/api/auth/login"
        || path == "/api/auth/logout"
        || path == "/api/auth/request-reset"
        || path == "/api/auth/reset"
}

fn auth_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    for header in headers.get_all(COOKIE).iter() {
        if let Ok(raw) = header.to_str()
            && let Some(value) = cookie_from_header(raw, name)
        {
            return Some(value);
        }
    }
    None
}

fn cookie_from_header<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    for part in header.split(';') {
        let trimmed = part.trim();
        if let Some((cookie_name, cookie_value)) = trimmed.split_once('=')
            && cookie_name == name
        {
            return Some(cookie_value);
        }
    }
    None
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    email: String,
    password: String,
}

pub(crate) async fn login(
    State(state): State<state::AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let email = request.email.trim();
    if email.is_empty() || request.password.is_empty() {
        return Err(ApiError::InvalidPayload("email and password are required."));
    }

    let Some(user) = state.db.get_user_by_email(email).await? else {
        return Err(ApiError::Unauthorized);
    };

    if !password::verify_password(&request.password, &user.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    let role = Role::parse(&user.role).ok_or_else(|| {
        error!("user {} has unknown role '{}'", user.id, user.role);
        ApiError::Internal
    })?;

    let token = state.auth.issue_token(&user.id, role).map_err(|err| {
        error!("failed to issue auth token: {err}");
        ApiError::Internal
    })?;

    let cookie = state.auth.auth_cookie(&token);
    let mut response = ApiSuccess::new(user).into_response();
    response.headers_mut().append(
        SET_COOKIE,
        HeaderValue::from_str(&cookie).expect("auth cookie header"),
    );
    Ok(response)
}

pub(crate) async fn logout(State(state): State<state::AppState>) -> Response {
    let cookie = state.auth.clear_cookie();
    let mut response = ApiSuccess::new(serde_json::Value::Null).into_response();
    response.headers_mut().append(
        SET_COOKIE,
        HeaderValue::from_str(&cookie).expect("logout cookie header"),
    );
    response
}

pub(crate) async fn me(
    State(state): State<state::AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ApiSuccess<User>>, ApiError> {
    let user = state
        .db
        .get_user(&current.id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(ApiSuccess::new(user))
}

#[derive(Debug, Deserialize)]
pub(crate) struct RequestResetRequest {
    email: String,
}

pub(crate) async fn request_reset(
    State(state): State<state::AppState>,
    Json(request): Json<RequestResetRequest>,
) -> Result<Json<ApiSuccess<serde_json::Value>>, ApiError> {
    let email = request.email.trim();
    if email.is_empty() {
        return Err(ApiError::InvalidPayload("email is required."));
    }

    reset::request_reset(&state.db, &state.config, email).await?;
    Ok(ApiSuccess::new(serde_json::Value::Null))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResetPasswordRequest {
    token: String,
    password: String,
}

pub(crate) async fn reset_password(
    State(state): State<state::AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<ApiSuccess<serde_json::Value>>, ApiError> {
    let token = request.token.trim();
    if token.is_empty() {
        return Err(ApiError::InvalidPayload("token is required."));
    }

    reset::redeem(&state.db, token, &request.password).await?;

    // The user's status changed; cached listings are stale now.
    state
        .cache
        .lock()
        .expect("cache lock")
        .invalidate(Some("users"));

    Ok(ApiSuccess::new(serde_json::Value::Null))
}
