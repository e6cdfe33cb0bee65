use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::auth::AuthState;
use super::auth::error::ErrorBody;
use super::auth::principal::PrincipalKind;
use super::auth::strategy::StrategyName;
use super::auth::types::{ApiResponse, SessionData, SignInRequest, SignUpRequest};
use super::{NewAccount, json_body, sign_in_credentials, sign_in_response, sign_up_response};

#[utoipa::path(
    post,
    path = "/api/v1/admins/signin",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Admin signed in", body = ApiResponse<SessionData>),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 401, description = "Unknown admin or wrong password", body = ErrorBody),
    ),
    tag = "admins"
)]
pub async fn signin(
    Extension(auth_state): Extension<Arc<AuthState>>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Response {
    let credentials = match json_body(payload).and_then(sign_in_credentials) {
        Ok(credentials) => credentials,
        Err(err) => return err.into_response(),
    };
    sign_in_response(&auth_state, StrategyName::AdminLocal, &credentials).await
}

#[utoipa::path(
    post,
    path = "/api/v1/admins/signup",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Admin created with the default role", body = ApiResponse<SessionData>),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody),
    ),
    tag = "admins"
)]
pub async fn signup(
    Extension(auth_state): Extension<Arc<AuthState>>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Response {
    let account = match json_body(payload).and_then(NewAccount::from_request) {
        Ok(account) => account,
        Err(err) => return err.into_response(),
    };
    sign_up_response(&auth_state, PrincipalKind::Admin, account).await
}
