//! Request/response types for auth endpoints.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::principal::{PrincipalKind, PrincipalView};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StoreSignUpRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    /// One of `store-admin`, `store-manager`, `store-staff`; defaults to `store-admin`.
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Token plus the principal it was issued for, keyed by kind (`admin`, `store` or `user`).
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<PrincipalView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<PrincipalView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PrincipalView>,
}

impl SessionData {
    #[must_use]
    pub fn new(access_token: String, kind: PrincipalKind, view: PrincipalView) -> Self {
        let mut data = Self {
            access_token,
            admin: None,
            store: None,
            user: None,
        };
        match kind {
            PrincipalKind::Admin => data.admin = Some(view),
            PrincipalKind::Store => data.store = Some(view),
            PrincipalKind::User => data.user = Some(view),
        }
        data
    }

    #[must_use]
    pub fn principal(&self) -> Option<&PrincipalView> {
        self.admin
            .as_ref()
            .or(self.store.as_ref())
            .or(self.user.as_ref())
    }
}

/// Success envelope shared by every endpoint.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status_code: status.as_u16(),
            success: true,
            message: message.into(),
            data,
        }
    }

    #[must_use]
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::new(StatusCode::OK, message, Some(data))
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// Envelope for endpoints that only answer with a message.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub status_code: u16,
    pub success: bool,
    pub message: String,
    #[schema(value_type = Option<Object>)]
    pub data: Option<serde_json::Value>,
}

impl MessageResponse {
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::OK.as_u16(),
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

impl IntoResponse for MessageResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
