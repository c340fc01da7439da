use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub error_code: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ErrorCode {
    // Validation errors (VALID_xxx)
    ValidInvalidInput,

    // Resource errors (RESOURCE_xxx)
    ResourceNotFound,
    ResourceConflict,

    // System errors (SYSTEM_xxx)
    SystemDatabaseError,
    SystemInternalError,
    SystemAiProviderError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidInvalidInput => "VALID_INVALID_INPUT",
            ErrorCode::ResourceNotFound => "RESOURCE_NOT_FOUND",
            ErrorCode::ResourceConflict => "RESOURCE_CONFLICT",
            ErrorCode::SystemDatabaseError => "SYSTEM_DATABASE_ERROR",
            ErrorCode::SystemInternalError => "SYSTEM_INTERNAL_ERROR",
            ErrorCode::SystemAiProviderError => "SYSTEM_AI_PROVIDER_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidInvalidInput => StatusCode::BAD_REQUEST,
            ErrorCode::ResourceNotFound => StatusCode::NOT_FOUND,
            ErrorCode::ResourceConflict => StatusCode::CONFLICT,
            ErrorCode::SystemAiProviderError => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::SystemDatabaseError | ErrorCode::SystemInternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    code: ErrorCode,
    message: String,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidInvalidInput, message)
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceNotFound, format!("{} not found", what.into()))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::Validation(_) => ErrorCode::ValidInvalidInput,
            CoreError::NotFound(_) => ErrorCode::ResourceNotFound,
            CoreError::Conflict(_) => ErrorCode::ResourceConflict,
            CoreError::TransientProvider(_) | CoreError::PermanentProvider(_) => {
                ErrorCode::SystemAiProviderError
            }
            CoreError::Database(_) => ErrorCode::SystemDatabaseError,
            CoreError::Configuration(_) => ErrorCode::SystemInternalError,
        };
        // Internal failure details stay in the log, not the response body.
        if matches!(
            code,
            ErrorCode::SystemDatabaseError | ErrorCode::SystemInternalError
        ) {
            tracing::error!("request failed: {}", err);
            return AppError::new(code, "Internal server error");
        }
        AppError::new(code, err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::from(CoreError::Database(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ApiError {
            error: self.message,
            error_code: self.code.as_str().to_string(),
        });

        (self.code.status_code(), body).into_response()
    }
}

pub type ApiResult<T> = Result<T, AppError>;
