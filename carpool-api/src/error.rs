use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use carpool_core::CoreError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    Authentication(String),
    Core(CoreError),
    Anyhow(anyhow::Error),
}

impl AppError {
    pub fn forbidden(msg: &str) -> Self {
        AppError::Core(CoreError::Forbidden(msg.to_string()))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Core(CoreError::Validation(msg.into()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Authentication(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Core(err) => match err {
                CoreError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
                CoreError::Conflict(_) => (StatusCode::CONFLICT, err.to_string()),
                CoreError::Forbidden(_) => (StatusCode::FORBIDDEN, err.to_string()),
                CoreError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
                CoreError::Internal(msg) => {
                    tracing::error!("Internal Server Error: {}", msg);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
                }
            },
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        Self::Core(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}
