use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::authz::Resource;
use crate::directory::DirectoryError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("unauthorized: {message}")]
    Unauthorized { message: String, redirect: Option<String> },
    #[error("access denied: {resource_name}")]
    AccessDenied { resource_name: String, home_path: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("token error: {0}")]
    Token(String),
    #[error("internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
            redirect: None,
        }
    }

    pub fn login_required(login_path: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: "login required".to_string(),
            redirect: Some(login_path.into()),
        }
    }

    pub fn access_denied(resource: Resource, home_path: impl Into<String>) -> Self {
        Self::AccessDenied {
            resource_name: resource.display_name().to_string(),
            home_path: home_path.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn token(err: impl Into<String>) -> Self {
        Self::Token(err.into())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::AccessDenied { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Token(_) => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = self.to_string();
        let (error, redirect) = match &self {
            AppError::Unauthorized { redirect, .. } => ("unauthorized", redirect.clone()),
            AppError::AccessDenied { home_path, .. } => ("access_denied", Some(home_path.clone())),
            AppError::NotFound(_) => ("not_found", None),
            AppError::Conflict(_) => ("conflict", None),
            AppError::BadRequest(_) => ("bad_request", None),
            AppError::Configuration(_) => ("configuration", None),
            AppError::Token(_) => ("token", None),
            AppError::Internal(_) => ("internal", None),
        };

        let payload = ErrorResponse {
            error: error.to_string(),
            message,
            redirect,
        };

        (status, Json(payload)).into_response()
    }
}

impl From<DirectoryError> for AppError {
    fn from(value: DirectoryError) -> Self {
        match value {
            DirectoryError::NotFound(what) => Self::not_found(what),
            DirectoryError::Conflict(msg) => Self::Conflict(msg),
            err @ DirectoryError::SystemRole(_) => Self::Conflict(err.to_string()),
            DirectoryError::Validation(msg) => Self::bad_request(msg),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}
