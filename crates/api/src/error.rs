//! Mapping of domain errors onto HTTP responses.
//!
//! Every failure leaves the API as `{ "error": <code>, "message": <text> }`
//! with the status its error kind prescribes. Server-side failures are
//! logged and answered with a generic message.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

use fintrack_core::auth::{PasswordError, SignupError};
use fintrack_core::ledger::LedgerError;
use fintrack_db::UserError;
use fintrack_shared::{AppError, JwtError};

/// Error returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Ledger operation failed.
    Ledger(LedgerError),
    /// Anything outside the ledger.
    App(AppError),
}

impl ApiError {
    fn parts(&self) -> (u16, &'static str, String) {
        match self {
            Self::Ledger(e) => (e.http_status_code(), e.error_code(), e.to_string()),
            Self::App(e) => (e.status_code(), e.error_code(), e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if status.is_server_error() {
            error!(error = %message, "Request failed");
            "An internal error occurred".to_string()
        } else {
            if status == StatusCode::CONFLICT {
                warn!(error = %message, "Request conflicted");
            }
            message
        };

        (
            status,
            Json(json!({
                "error": code.to_lowercase(),
                "message": message
            })),
        )
            .into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err.resolved())
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::App(AppError::Validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::App(AppError::Validation(rejection.body_text()))
    }
}

impl From<SignupError> for ApiError {
    fn from(err: SignupError) -> Self {
        Self::App(AppError::Validation(err.to_string()))
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::EmailTaken(email) => {
                Self::App(AppError::Conflict(format!("Email already registered: {email}")))
            }
            UserError::Database(db) => {
                error!(error = %db, "User store failed");
                Self::App(AppError::Internal("User store unavailable".to_string()))
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        Self::App(AppError::Internal(err.to_string()))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        Self::App(AppError::Internal(err.to_string()))
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
