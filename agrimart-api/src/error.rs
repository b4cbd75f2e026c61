use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use agrimart_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("{0}")]
    AuthenticationError(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Core(err) => match err {
                CoreError::ValidationError(_) => StatusCode::BAD_REQUEST,
                CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                CoreError::InvalidStateTransition { .. } => StatusCode::CONFLICT,
                CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
                CoreError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
                CoreError::NoActivePolicy(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CoreError::NoAgentAvailable => StatusCode::SERVICE_UNAVAILABLE,
                CoreError::DuplicateOperation(_) => StatusCode::CONFLICT,
                CoreError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            AppError::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Core(err) => err.kind(),
            AppError::AuthenticationError(_) => "unauthorized",
            AppError::Anyhow(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal Server Error: {}", self);
            "Internal Server Error".to_string()
        } else {
            tracing::debug!(code = self.code(), "Request rejected: {}", self);
            self.to_string()
        };

        let body = Json(json!({
            "error": message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}
