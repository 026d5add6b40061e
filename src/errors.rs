use crate::password::MIN_PASSWORD_LENGTH;
use crate::reset::ResetError;
use crate::storage::DatabaseError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

/// JSON envelope for successful responses: `{"success": true, "data": …}`.
#[derive(Debug, Serialize)]
pub struct ApiSuccess<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiSuccess<T> {
    pub fn new(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    success: bool,
    error: String,
}

/// Client-visible error kinds. Internal faults are logged server-side and
/// reach the client only as a generic 500.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Forbidden,
    InvalidPayload(&'static str),
    InvalidToken,
    WeakPassword,
    NotFound,
    ServiceUnavailable(&'static str),
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::InvalidPayload(_) | ApiError::InvalidToken | ApiError::WeakPassword => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Unauthorized => "unauthorized".to_string(),
            ApiError::Forbidden => "forbidden".to_string(),
            ApiError::InvalidPayload(message) => (*message).to_string(),
            ApiError::InvalidToken => "invalid or expired reset token".to_string(),
            ApiError::WeakPassword => {
                format!("password must be at least {MIN_PASSWORD_LENGTH} characters")
            }
            ApiError::NotFound => "not found".to_string(),
            ApiError::ServiceUnavailable(message) => (*message).to_string(),
            ApiError::Internal => "internal error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ApiErrorBody {
                success: false,
                error: self.message(),
            }),
        )
            .into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        error!("database error: {err}");
        ApiError::Internal
    }
}

impl From<ResetError> for ApiError {
    fn from(err: ResetError) -> Self {
        match err {
            ResetError::InvalidToken => ApiError::InvalidToken,
            ResetError::WeakPassword => ApiError::WeakPassword,
            ResetError::UserNotFound => ApiError::NotFound,
            ResetError::Hash | ResetError::Mail(_) => ApiError::Internal,
            ResetError::Storage(err) => {
                error!("database error: {err}");
                ApiError::Internal
            }
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[test]
    fn api_error__should_map_kinds_to_statuses() {
        // Then
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::InvalidToken.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::WeakPassword.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Internal.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn api_error__should_not_leak_internal_details() {
        // Given
        let err: ApiError = DatabaseError::Query("secret table is broken".to_string()).into();

        // Then
        assert_eq!(err.message(), "internal error");
    }
}
