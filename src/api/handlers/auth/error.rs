//! Auth failures, infrastructure errors and their JSON rendering.
//!
//! Expected credential problems are [`AuthFailure`] values and never carry
//! internal detail. Everything else is an [`AuthError`] and renders as a 500
//! whose detail is only exposed outside production.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use super::hasher::HashingError;
use super::principal::PrincipalKind;
use super::strategy::StrategyName;
use super::token::TokenError;

/// Why a strategy declined the supplied credentials.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthFailure {
    NotFound(PrincipalKind),
    NoPasswordSet,
    IncorrectPassword,
    MissingToken,
    TokenExpired,
    TokenInvalid,
    InvalidRoleInClaim,
    NoEntityFound,
    MissingEmail,
    IdentityMismatch,
    InvalidOrExpiredOtp,
}

impl AuthFailure {
    #[must_use]
    pub fn message(self) -> String {
        match self {
            Self::NotFound(kind) => format!("{kind} not found"),
            Self::NoPasswordSet => "No password set".to_string(),
            Self::IncorrectPassword => "Incorrect password".to_string(),
            Self::MissingToken => "No auth token".to_string(),
            Self::TokenExpired => "Token has expired!".to_string(),
            Self::TokenInvalid => "Invalid token!".to_string(),
            Self::InvalidRoleInClaim => "Invalid role in JWT!".to_string(),
            Self::NoEntityFound => "No entity found for the given ID".to_string(),
            Self::MissingEmail => "Email not provided by identity provider".to_string(),
            Self::IdentityMismatch => {
                "Account is already linked to a different Google identity".to_string()
            }
            Self::InvalidOrExpiredOtp => "Invalid or expired OTP".to_string(),
        }
    }
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

/// Configuration and infrastructure errors raised while authenticating.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("strategy {0} is not configured")]
    StrategyNotConfigured(StrategyName),
    #[error("strategy {strategy} does not accept {credentials} credentials")]
    CredentialMismatch {
        strategy: StrategyName,
        credentials: &'static str,
    },
    #[error(transparent)]
    Hashing(#[from] HashingError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
}

/// Error envelope shared by every endpoint.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub success: bool,
    pub message: String,
    #[schema(value_type = Option<Object>)]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_messages: Option<Vec<ErrorMessage>>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    details: Vec<ErrorMessage>,
    expose_details: bool,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: Vec::new(),
            expose_details: false,
        }
    }

    #[must_use]
    pub fn unauthorized(failure: AuthFailure) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, failure.message())
    }

    #[must_use]
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Forbidden!")
    }

    #[must_use]
    pub fn missing_principal() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized!")
    }

    #[must_use]
    pub fn validation(details: Vec<ErrorMessage>) -> Self {
        Self {
            details,
            expose_details: true,
            ..Self::new(StatusCode::BAD_REQUEST, "Validation error!")
        }
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Logs the error and hides it behind a safe message.
    #[must_use]
    pub fn internal(err: &AuthError) -> Self {
        error!("Authentication error: {err}");
        let message = match err {
            AuthError::StrategyNotConfigured(_) | AuthError::CredentialMismatch { .. } => {
                "Authentication is not configured"
            }
            AuthError::Token(_) => "Token generation failed.",
            AuthError::Hashing(_) | AuthError::Storage(_) => "Something went wrong!",
        };
        Self {
            details: vec![ErrorMessage {
                path: None,
                message: err.to_string(),
            }],
            ..Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }

    /// Internal detail is kept only when not running in production.
    #[must_use]
    pub fn expose_details(mut self, expose: bool) -> Self {
        self.expose_details = expose;
        self
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<AuthFailure> for ApiError {
    fn from(failure: AuthFailure) -> Self {
        Self::unauthorized(failure)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_messages = if self.expose_details && !self.details.is_empty() {
            Some(self.details)
        } else {
            None
        };
        let body = ErrorBody {
            status_code: self.status.as_u16(),
            success: false,
            message: self.message,
            data: None,
            error_messages,
        };
        (self.status, Json(body)).into_response()
    }
}
