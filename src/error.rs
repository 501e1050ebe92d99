//! Failure taxonomy shared by the user and auth services, and its
//! translation into HTTP responses.
//!
//! Handlers dispatch on [`ErrorKind`] only; message text is for humans.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::jwt::TokenError,
    users::{repo::StoreError, validation::Violation},
};

pub const INTERNAL_MESSAGE: &str = "An internal error occurred";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidInput,
    AlreadyExists,
    NotFound,
    InvalidCredentials,
    TokenInvalid,
    Internal,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::AlreadyExists => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidCredentials | ErrorKind::TokenInvalid => StatusCode::UNAUTHORIZED,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Always non-empty; the first violation is the reported message.
    #[error("{}", first_message(.0))]
    InvalidInput(Vec<Violation>),

    /// Body or path that could not be decoded at all.
    #[error("{0}")]
    BadRequest(String),

    #[error("There is an user already created with that email.")]
    AlreadyExists,

    #[error("User not found with Id: {0}")]
    NotFound(Uuid),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    TokenInvalid(#[from] TokenError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

fn first_message(violations: &[Violation]) -> &str {
    violations
        .first()
        .map(|v| v.message.as_str())
        .unwrap_or("Invalid input")
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidInput(_) | AppError::BadRequest(_) => ErrorKind::InvalidInput,
            AppError::AlreadyExists => ErrorKind::AlreadyExists,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::InvalidCredentials => ErrorKind::InvalidCredentials,
            AppError::TokenInvalid(_) => ErrorKind::TokenInvalid,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to show to a caller.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) => INTERNAL_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { .. } => AppError::AlreadyExists,
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match &rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON data: {}", err.body_text()),
            JsonRejection::JsonSyntaxError(err) => format!("Invalid JSON syntax: {}", err.body_text()),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing Content-Type header. Expected 'application/json'.".to_string()
            }
            other => other.body_text(),
        };
        AppError::BadRequest(message)
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{err:#}"))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("blocking task failed: {err}"))
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    kind: ErrorKind,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    violations: Option<&'a [Violation]>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        if let AppError::Internal(detail) = &self {
            tracing::error!(error = %detail, "internal error");
        }
        let violations = match &self {
            AppError::InvalidInput(v) if !v.is_empty() => Some(v.as_slice()),
            _ => None,
        };
        let body = ErrorBody {
            timestamp: OffsetDateTime::now_utc(),
            kind,
            message: self.public_message(),
            violations,
        };
        (kind.status(), Json(body)).into_response()
    }
}
