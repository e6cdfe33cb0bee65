//! Store endpoints.
//!
//! Store password sign-in never yields a token directly: `signin` mails a
//! passcode and `verify` exchanges it for a session.

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::info;

use super::auth::{ApiError, AuthState};
use super::auth::error::{ErrorBody, ErrorMessage};
use super::auth::gate::{OTP_SENT, OTP_VERIFIED};
use super::auth::principal::{Principal, PrincipalKind, PrincipalView, Role};
use super::auth::strategy::{Credentials, StrategyName};
use super::auth::types::{
    ApiResponse, MessageResponse, SessionData, SignInRequest, StoreSignUpRequest,
    VerifyOtpRequest,
};
use super::auth::utils::valid_otp_code;
use super::{
    ALREADY_EXISTS, NewAccount, check_email, checked_sign_in, create_account, find_response,
    finish, json_body, session_response,
};

pub(crate) const STORE_CREATED: &str = "Store created successfully!";

#[utoipa::path(
    post,
    path = "/api/v1/stores/signin",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Passcode mailed to the store", body = MessageResponse),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 401, description = "Unknown store or wrong password", body = ErrorBody),
    ),
    tag = "stores"
)]
pub async fn signin(
    Extension(auth_state): Extension<Arc<AuthState>>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Response {
    let (email, password) = match json_body(payload).and_then(checked_sign_in) {
        Ok(checked) => checked,
        Err(err) => return err.into_response(),
    };

    match auth_state.gate().request_store_otp(&email, &password).await {
        Ok(Ok(())) => MessageResponse::ok(OTP_SENT).into_response(),
        Ok(Err(failure)) => ApiError::unauthorized(failure).into_response(),
        Err(err) => auth_state.internal_error(&err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/verify",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Passcode accepted", body = ApiResponse<SessionData>),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 401, description = "Invalid or expired passcode", body = ErrorBody),
    ),
    tag = "stores"
)]
pub async fn verify(
    Extension(auth_state): Extension<Arc<AuthState>>,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Response {
    let request = match json_body(payload) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };

    let mut problems = Vec::new();
    let email = check_email(&request.email, &mut problems);
    let code = request.otp.trim().to_string();
    if !valid_otp_code(&code) {
        problems.push(ErrorMessage {
            path: Some("otp".to_string()),
            message: "OTP must be 6 digits".to_string(),
        });
    }
    if let Err(err) = finish(problems) {
        return err.into_response();
    }

    session_response(
        &auth_state,
        StrategyName::StoreOtp,
        &Credentials::Otp { email, code },
        OTP_VERIFIED,
    )
    .await
}

fn store_role(requested: Option<&str>) -> Result<Role, ApiError> {
    let Some(requested) = requested else {
        return Ok(PrincipalKind::Store.default_role());
    };
    match requested.parse::<Role>() {
        Ok(role) if role.kind() == PrincipalKind::Store => Ok(role),
        _ => Err(ApiError::validation(vec![ErrorMessage {
            path: Some("role".to_string()),
            message: format!("{requested} is not a store role"),
        }])),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/signup",
    request_body = StoreSignUpRequest,
    responses(
        (status = 201, description = "Store created", body = ApiResponse<PrincipalView>),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 403, description = "Caller is not a super-admin", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "stores"
)]
pub async fn signup(
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(caller): Extension<Principal>,
    payload: Result<Json<StoreSignUpRequest>, JsonRejection>,
) -> Response {
    let request = match json_body(payload) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };
    let role = match store_role(request.role.as_deref()) {
        Ok(role) => role,
        Err(err) => return err.into_response(),
    };
    let account = match NewAccount::checked(
        request.full_name,
        &request.email,
        request.password,
        Vec::new(),
    ) {
        Ok(account) => account,
        Err(err) => return err.into_response(),
    };

    match create_account(&auth_state, role, account).await {
        Ok(Some(store)) => {
            info!(created_by = %caller.id, store = %store.id, "Store provisioned");
            ApiResponse::new(StatusCode::CREATED, STORE_CREATED, Some(store.view()))
                .into_response()
        }
        Ok(None) => ApiError::conflict(ALREADY_EXISTS).into_response(),
        Err(err) => auth_state.internal_error(&err).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/find/{id}",
    params(("id" = String, Path, description = "Store id")),
    responses(
        (status = 200, description = "Store record", body = ApiResponse<PrincipalView>),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 403, description = "Role may not read stores", body = ErrorBody),
        (status = 404, description = "No such store", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "stores"
)]
pub async fn find(
    Extension(auth_state): Extension<Arc<AuthState>>,
    Path(id): Path<String>,
) -> Response {
    find_response(&auth_state, PrincipalKind::Store, &id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::principal::StoreRole;

    #[test]
    fn store_role_defaults_to_store_admin() {
        assert!(matches!(store_role(None), Ok(Role::STORE_ADMIN)));
    }

    #[test]
    fn store_role_accepts_store_roles() {
        assert!(matches!(
            store_role(Some("store-staff")),
            Ok(Role::Store(StoreRole::StoreStaff))
        ));
    }

    #[test]
    fn store_role_rejects_other_kinds() {
        for role in ["super-admin", "normal-user", "root"] {
            let Err(err) = store_role(Some(role)) else {
                panic!("{role} should be rejected");
            };
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }
}
