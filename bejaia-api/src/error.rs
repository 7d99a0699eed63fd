use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bejaia_core::CoreError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// HTTP status carried by a core error, also used for rejected admissions
pub fn status_for(err: &CoreError) -> StatusCode {
    match err {
        CoreError::Validation { .. } => StatusCode::BAD_REQUEST,
        CoreError::BlockedDate { .. }
        | CoreError::Duplicate { .. }
        | CoreError::AlreadyBlocked { .. }
        | CoreError::InvalidTransition { .. } => StatusCode::CONFLICT,
        CoreError::RateLimited { .. } | CoreError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        CoreError::NotFound { .. } | CoreError::TokenNotFound => StatusCode::NOT_FOUND,
        CoreError::TokenExpired => StatusCode::GONE,
        CoreError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Authentication(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            AppError::Core(err) => {
                let status = status_for(&err);
                if status.is_server_error() {
                    tracing::error!("Internal Server Error: {}", err);
                    (status, "Internal Server Error".to_string())
                } else {
                    (status, err.to_string())
                }
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&CoreError::TokenExpired), StatusCode::GONE);
        assert_eq!(status_for(&CoreError::TokenNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&CoreError::Duplicate { count: 1 }), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&CoreError::QuotaExceeded { count: 5, limit: 5 }),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_storage_details_are_hidden() {
        let response = AppError::from(CoreError::Storage { message: "password=secret".to_string() }).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
