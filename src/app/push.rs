use crate::adapters::WebPushSender;
use crate::app::auth::CurrentUser;
use crate::errors::{ApiError, ApiSuccess};
use crate::push as push_service;
use crate::push::{PushData, PushPayload, Subscription, VapidConfigStatus};
use crate::state;

use axum::Json;
use axum::extract::{Extension, State};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub(crate) struct SubscribeRequest {
    endpoint: String,
    keys: SubscriptionKeys,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubscriptionKeys {
    p256dh: String,
    auth: String,
}

pub(crate) async fn subscribe(
    State(state): State<state::AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<SubscribeRequest>,
) -> Result<Json<ApiSuccess<serde_json::Value>>, ApiError> {
    let endpoint = request.endpoint.trim();
    let p256dh = request.keys.p256dh.trim();
    let auth = request.keys.auth.trim();
    if endpoint.is_empty() || p256dh.is_empty() || auth.is_empty() {
        return Err(ApiError::InvalidPayload(
            "endpoint, p256dh, and auth are required.",
        ));
    }

    let id = Uuid::new_v4().to_string();
    state
        .db
        .upsert_subscription(&id, &current.id, endpoint, p256dh, auth)
        .await?;

    Ok(ApiSuccess::new(serde_json::Value::Null))
}

#[derive(Debug, Deserialize)]
pub(crate) struct UnsubscribeRequest {
    endpoint: Option<String>,
}

pub(crate) async fn unsubscribe(
    State(state): State<state::AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<UnsubscribeRequest>,
) -> Result<Json<ApiSuccess<serde_json::Value>>, ApiError> {
    let removed = match request.endpoint.as_deref().map(str::trim) {
        Some(endpoint) if !endpoint.is_empty() => {
            state.db.delete_subscription(&current.id, endpoint).await?
        }
        // No endpoint: drop every device registration for this user.
        _ => state.db.delete_all_subscriptions(&current.id).await?,
    };

    Ok(ApiSuccess::new(serde_json::json!({ "removed": removed })))
}

#[derive(Debug, Serialize)]
pub(crate) struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub(crate) public_key: String,
}

pub(crate) async fn public_key(
    State(state): State<state::AppState>,
) -> Result<Json<ApiSuccess<PublicKeyResponse>>, ApiError> {
    let vapid = match push_service::load_vapid_config(&state.config) {
        VapidConfigStatus::Ready(vapid) => vapid,
        VapidConfigStatus::Incomplete | VapidConfigStatus::Missing => {
            return Err(ApiError::ServiceUnavailable(
                "Push notifications are not configured.",
            ));
        }
    };

    Ok(ApiSuccess::new(PublicKeyResponse {
        public_key: vapid.public_key,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct TestPushRequest {
    message: Option<String>,
}

pub(crate) async fn send_test(
    State(state): State<state::AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<TestPushRequest>,
) -> Result<Json<ApiSuccess<serde_json::Value>>, ApiError> {
    let vapid = match push_service::load_vapid_config(&state.config) {
        VapidConfigStatus::Ready(vapid) => vapid,
        VapidConfigStatus::Incomplete | VapidConfigStatus::Missing => {
            return Err(ApiError::ServiceUnavailable(
                "Push notifications are not configured.",
            ));
        }
    };

    let body = request
        .message
        .as_deref()
        .unwrap_or("Test notification from Taskara")
        .trim()
        .to_string();
    if body.is_empty() {
        return Err(ApiError::InvalidPayload("message must not be empty."));
    }

    let sender = WebPushSender::new(vapid).map_err(|err| {
        error!("failed to init web-push: {err}");
        ApiError::Internal
    })?;

    let rows = state.db.subscriptions_for_user(&current.id).await?;
    let subscriptions: Vec<Subscription> = rows.iter().map(Subscription::from).collect();

    let payload = PushPayload {
        title: state.config.app_name.clone(),
        body,
        data: PushData::default(),
    };
    let sent = push_service::send_to_user(&sender, &current.id, &subscriptions, &payload).await;

    Ok(ApiSuccess::new(serde_json::json!({ "sent": sent })))
}
