use crate::app::auth::CurrentUser;
use crate::auth::Role;
use crate::cache;
use crate::errors::{ApiError, ApiSuccess};
use crate::state;

use axum::Json;
use axum::extract::{Extension, State};
use tracing::error;

const USERS_LIST_CACHE_KEY: &str = "users:list";

pub(crate) async fn list_users(
    State(state): State<state::AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ApiSuccess<serde_json::Value>>, ApiError> {
    if current.role != Role::Admin {
        return Err(ApiError::Forbidden);
    }

    let db = state.db.clone();
    let users = cache::with_cache(
        &state.cache,
        USERS_LIST_CACHE_KEY,
        time::Duration::seconds(30),
        move || async move {
            let users = db.list_users().await?;
            serde_json::to_value(&users).map_err(|err| {
                error!("failed to encode user list: {err}");
                ApiError::Internal
            })
        },
    )
    .await?;

    Ok(ApiSuccess::new(users))
}
