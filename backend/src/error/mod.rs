use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

use crate::repositories::store::StoreError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
}

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    /// Terminal state of a resource the client may not retry against (HTTP 410).
    Gone {
        code: &'static str,
        message: String,
    },
    InternalServerError(anyhow::Error),
    Validation(Vec<String>),
}

/// Failures of the signature engine, before they are mapped to HTTP.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("signature token has expired")]
    Expired,
    #[error("signature token has already been used")]
    AlreadyUsed,
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Persistence(#[from] StoreError),
    #[error(transparent)]
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, code, details) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND".to_string(), None),
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                msg,
                "UNAUTHORIZED".to_string(),
                None,
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, "FORBIDDEN".to_string(), None),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                msg,
                "BAD_REQUEST".to_string(),
                None,
            ),
            AppError::Gone { code, message } => (StatusCode::GONE, message, code.to_string(), None),
            AppError::InternalServerError(err) => {
                tracing::error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_SERVER_ERROR".to_string(),
                    None,
                )
            }
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                "VALIDATION_ERROR".to_string(),
                Some(serde_json::json!({ "errors": errors })),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code,
            details,
        });

        (status, body).into_response()
    }
}

impl From<SignatureError> for AppError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            SignatureError::Expired => AppError::Gone {
                code: "TOKEN_EXPIRED",
                message: "This signature link has expired, request a new one".to_string(),
            },
            SignatureError::AlreadyUsed => AppError::Gone {
                code: "TOKEN_ALREADY_USED",
                message: "This signature link has already been used".to_string(),
            },
            SignatureError::Forbidden(msg) => AppError::Forbidden(msg),
            SignatureError::Persistence(err) => AppError::InternalServerError(err.into()),
            SignatureError::Internal(err) => AppError::InternalServerError(err),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::InternalServerError(err.into())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalServerError(err)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let code = e.code.as_ref();
                    format!("{}: {}", field, code)
                })
            })
            .collect();
        messages.sort();
        AppError::Validation(messages)
    }
}
