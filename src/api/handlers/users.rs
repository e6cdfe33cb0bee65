use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::auth::AuthState;
use super::auth::error::ErrorBody;
use super::auth::principal::{PrincipalKind, PrincipalView};
use super::auth::strategy::StrategyName;
use super::auth::types::{ApiResponse, SessionData, SignInRequest, SignUpRequest};
use super::{
    NewAccount, find_response, json_body, sign_in_credentials, sign_in_response, sign_up_response,
};

#[utoipa::path(
    post,
    path = "/api/v1/users/signin",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "User signed in", body = ApiResponse<SessionData>),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 401, description = "Unknown user or wrong password", body = ErrorBody),
    ),
    tag = "users"
)]
pub async fn signin(
    Extension(auth_state): Extension<Arc<AuthState>>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Response {
    let credentials = match json_body(payload).and_then(sign_in_credentials) {
        Ok(credentials) => credentials,
        Err(err) => return err.into_response(),
    };
    sign_in_response(&auth_state, StrategyName::UserLocal, &credentials).await
}

#[utoipa::path(
    post,
    path = "/api/v1/users/signup",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "User created as normal-user", body = ApiResponse<SessionData>),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody),
    ),
    tag = "users"
)]
pub async fn signup(
    Extension(auth_state): Extension<Arc<AuthState>>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Response {
    let account = match json_body(payload).and_then(NewAccount::from_request) {
        Ok(account) => account,
        Err(err) => return err.into_response(),
    };
    sign_up_response(&auth_state, PrincipalKind::User, account).await
}

#[utoipa::path(
    get,
    path = "/api/v1/users/find/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User record", body = ApiResponse<PrincipalView>),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 403, description = "Role may not read users", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn find(
    Extension(auth_state): Extension<Arc<AuthState>>,
    Path(id): Path<String>,
) -> Response {
    find_response(&auth_state, PrincipalKind::User, &id).await
}
