//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
    #[error("config load: {0}")]
    Load(String),
}

/// Dispatch error. Every variant carries a status; wrapping with call-site
/// context keeps the innermost status intact.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
    #[error("{context}: {source}")]
    Wrapped {
        context: String,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    pub fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        AppError::Internal(format!("{context}: {err}"))
    }

    /// Wrap with call-site context. The status of the innermost error wins.
    pub fn wrap(self, context: impl Into<String>) -> Self {
        AppError::Wrapped {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Wrapped { source, .. } => source.status(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Internal(_) => "internal_error",
            AppError::Wrapped { source, .. } => source.code(),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(status = %status, error = %self, "request failed");
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_preserves_innermost_status() {
        let err = AppError::Forbidden("no access".into())
            .wrap("run_hooks")
            .wrap("dispatch update");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.code(), "forbidden");
        assert_eq!(
            err.to_string(),
            "dispatch update: run_hooks: forbidden: no access"
        );
    }
}
