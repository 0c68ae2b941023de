use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dashboard_engine::EngineError;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Object credit not found: {0}")]
    OkNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Konto not found: {0}")]
    KontoNotFound(String),

    #[error("Saved view not found: {0}")]
    ViewNotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::OkNotFound(_)
            | ApiError::AccountNotFound(_)
            | ApiError::KontoNotFound(_)
            | ApiError::ViewNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(EngineError::InvalidParameter { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Engine(_)
            | ApiError::IoError(_)
            | ApiError::JsonError(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = self.to_string();
        if status.is_server_error() {
            tracing::error!("{}", error_message);
        } else {
            tracing::debug!("{}", error_message);
        }

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
