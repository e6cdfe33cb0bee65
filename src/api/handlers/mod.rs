//! API handlers and the request plumbing they share.
//!
//! Each principal kind gets its own module with the sign-in surface it
//! supports; the auth core lives in [`auth`].

pub mod admins;
pub mod auth;
pub mod federated;
pub mod health;
pub mod me;
pub mod root;
pub mod stores;
pub mod users;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use self::auth::error::ErrorMessage;
use self::auth::gate::LOGGED_IN;
use self::auth::principal::{PrincipalKind, Role};
use self::auth::storage::{CreateOutcome, NewPrincipal};
use self::auth::strategy::{Credentials, StrategyName};
use self::auth::types::{ApiResponse, SignInRequest, SignUpRequest};
use self::auth::utils::{normalize_email, valid_email};
use self::auth::{ApiError, AuthError, AuthFailure, AuthState};

pub(crate) const SIGNED_UP: &str = "Signed up successfully!";
pub(crate) const ALREADY_EXISTS: &str = "Already exists!";

/// Unwrap a JSON body, turning a rejection into a 400 validation error.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            debug!("Rejected request body: {rejection}");
            Err(ApiError::validation(vec![ErrorMessage {
                path: None,
                message: rejection.body_text(),
            }]))
        }
    }
}

fn field_error(path: &str, message: &str) -> ErrorMessage {
    ErrorMessage {
        path: Some(path.to_string()),
        message: message.to_string(),
    }
}

/// Returns the normalized email, or the list of field problems.
pub(crate) fn check_email(email: &str, problems: &mut Vec<ErrorMessage>) -> String {
    let email = normalize_email(email);
    if !valid_email(&email) {
        problems.push(field_error("email", "Invalid email address"));
    }
    email
}

pub(crate) fn check_present(path: &str, value: &str, problems: &mut Vec<ErrorMessage>) {
    if value.trim().is_empty() {
        problems.push(field_error(path, &format!("{path} is required")));
    }
}

pub(crate) fn finish(problems: Vec<ErrorMessage>) -> Result<(), ApiError> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation(problems))
    }
}

/// Normalized email and password from a sign-in body.
pub(crate) fn checked_sign_in(request: SignInRequest) -> Result<(String, String), ApiError> {
    let mut problems = Vec::new();
    let email = check_email(&request.email, &mut problems);
    check_present("password", &request.password, &mut problems);
    finish(problems)?;
    Ok((email, request.password))
}

pub(crate) fn sign_in_credentials(request: SignInRequest) -> Result<Credentials, ApiError> {
    let (email, password) = checked_sign_in(request)?;
    Ok(Credentials::Password { email, password })
}

/// Run a sign-in strategy and render the session envelope.
pub(crate) async fn sign_in_response(
    auth_state: &AuthState,
    name: StrategyName,
    credentials: &Credentials,
) -> Response {
    session_response(auth_state, name, credentials, LOGGED_IN).await
}

pub(crate) async fn session_response(
    auth_state: &AuthState,
    name: StrategyName,
    credentials: &Credentials,
    message: &str,
) -> Response {
    match auth_state.gate().sign_in(name, credentials).await {
        Ok(Ok(session)) => ApiResponse::ok(message, session).into_response(),
        Ok(Err(failure)) => ApiError::unauthorized(failure).into_response(),
        Err(err) => auth_state.internal_error(&err).into_response(),
    }
}

/// Checked input for creating a password account.
#[derive(Debug)]
pub(crate) struct NewAccount {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

impl NewAccount {
    pub(crate) fn from_request(request: SignUpRequest) -> Result<Self, ApiError> {
        Self::checked(request.full_name, &request.email, request.password, Vec::new())
    }

    pub(crate) fn checked(
        full_name: String,
        email: &str,
        password: String,
        mut problems: Vec<ErrorMessage>,
    ) -> Result<Self, ApiError> {
        check_present("fullName", &full_name, &mut problems);
        let email = check_email(email, &mut problems);
        check_present("password", &password, &mut problems);
        finish(problems)?;
        Ok(Self {
            full_name: full_name.trim().to_string(),
            email,
            password,
        })
    }
}

/// Hash the password and persist a new account of `role`'s kind.
///
/// # Errors
/// `Ok(None)` when the email is taken; `Err` when hashing or storage fails.
pub(crate) async fn create_account(
    auth_state: &Arc<AuthState>,
    role: Role,
    account: NewAccount,
) -> Result<Option<auth::principal::Principal>, AuthError> {
    let password_hash = auth_state.hasher().hash_offload(account.password).await?;
    let outcome = auth_state
        .store()
        .create(
            role.kind(),
            NewPrincipal {
                email: account.email,
                full_name: account.full_name,
                role,
                password_hash: Some(password_hash),
                is_email_verified: false,
                google_id: None,
            },
        )
        .await?;
    Ok(match outcome {
        CreateOutcome::Created(principal) => Some(principal),
        CreateOutcome::Conflict => None,
    })
}

/// Self-service sign-up for admins and users: create, then sign in.
pub(crate) async fn sign_up_response(
    auth_state: &Arc<AuthState>,
    kind: PrincipalKind,
    account: NewAccount,
) -> Response {
    let created = match create_account(auth_state, kind.default_role(), account).await {
        Ok(Some(principal)) => principal,
        Ok(None) => return ApiError::conflict(ALREADY_EXISTS).into_response(),
        Err(err) => return auth_state.internal_error(&err).into_response(),
    };
    match auth_state.gate().issue_session(&created) {
        Ok(session) => {
            ApiResponse::new(StatusCode::CREATED, SIGNED_UP, Some(session)).into_response()
        }
        Err(err) => auth_state.internal_error(&err).into_response(),
    }
}

/// Look up one principal by id for the read endpoints.
pub(crate) async fn find_response(
    auth_state: &AuthState,
    kind: PrincipalKind,
    id: &str,
) -> Response {
    let Ok(id) = Uuid::parse_str(id) else {
        return ApiError::validation(vec![field_error("id", "Invalid id")]).into_response();
    };
    match auth_state.store().find_by_id(kind, id).await {
        Ok(Some(principal)) => {
            ApiResponse::ok(format!("Retrieved {kind} successfully!"), principal.view())
                .into_response()
        }
        Ok(None) => ApiError::new(StatusCode::NOT_FOUND, AuthFailure::NotFound(kind).message())
            .into_response(),
        Err(err) => auth_state
            .internal_error(&AuthError::Storage(err))
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};

    #[test]
    fn sign_in_credentials_normalize_email() -> Result<()> {
        let credentials = sign_in_credentials(SignInRequest {
            email: "  A@X.com ".to_string(),
            password: "secret1".to_string(),
        })
        .map_err(|err| anyhow::anyhow!(err.message().to_string()))?;
        let Credentials::Password { email, .. } = credentials else {
            bail!("expected password credentials");
        };
        assert_eq!(email, "a@x.com");
        Ok(())
    }

    #[test]
    fn sign_in_requires_password_and_valid_email() {
        let result = sign_in_credentials(SignInRequest {
            email: "nope".to_string(),
            password: " ".to_string(),
        });
        let Err(err) = result else {
            panic!("expected a validation error");
        };
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Validation error!");
    }

    #[test]
    fn new_account_trims_name() -> Result<()> {
        let account = NewAccount::from_request(SignUpRequest {
            full_name: " Ada ".to_string(),
            email: "ada@x.com".to_string(),
            password: "pw".to_string(),
        })
        .map_err(|err| anyhow::anyhow!(err.message().to_string()))?;
        assert_eq!(account.full_name, "Ada");
        Ok(())
    }

    #[test]
    fn new_account_rejects_blank_name() {
        let result = NewAccount::from_request(SignUpRequest {
            full_name: String::new(),
            email: "ada@x.com".to_string(),
            password: "pw".to_string(),
        });
        assert!(result.is_err());
    }
}
