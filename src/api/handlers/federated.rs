//! Google sign-in for every principal kind.
//!
//! Flow Overview:
//! 1) `GET /api/v1/{kind}s/auth/google` redirects the browser to Google.
//! 2) Google calls back with an authorization code.
//! 3) The code is exchanged for a verified email, then the `{kind}-google`
//!    strategy finds, links or provisions the principal and a token is issued.

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{error, instrument, warn};
use ulid::Ulid;

use super::auth::{ApiError, AuthState};
use super::auth::error::ErrorBody;
use super::auth::google::IdentityError;
use super::auth::principal::PrincipalKind;
use super::auth::strategy::{Credentials, StrategyName};
use super::auth::types::{ApiResponse, GoogleCallbackQuery, SessionData};
use super::sign_in_response;

fn not_configured() -> Response {
    ApiError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Google sign-in is not configured",
    )
    .into_response()
}

// TODO: bind `state` to a short-lived cookie and compare it on callback.
fn start(auth_state: &AuthState, kind: PrincipalKind) -> Response {
    let Some(provider) = auth_state.identity_provider() else {
        return not_configured();
    };
    match provider.authorize_url(kind, &Ulid::new().to_string()) {
        Ok(url) => Redirect::to(url.as_str()).into_response(),
        Err(err) => {
            error!("Failed to build Google authorization URL: {err:#}");
            not_configured()
        }
    }
}

#[instrument(skip(auth_state, query))]
async fn callback(
    auth_state: &AuthState,
    kind: PrincipalKind,
    query: GoogleCallbackQuery,
) -> Response {
    let Some(provider) = auth_state.identity_provider() else {
        return not_configured();
    };
    if let Some(reason) = query.error {
        warn!("Google sign-in declined: {reason}");
        return ApiError::new(StatusCode::UNAUTHORIZED, "Google sign-in was declined")
            .into_response();
    }
    let Some(code) = query.code.filter(|code| !code.is_empty()) else {
        return ApiError::new(StatusCode::BAD_REQUEST, "Missing authorization code")
            .into_response();
    };

    let assertion = match provider.exchange(kind, &code).await {
        Ok(assertion) => assertion,
        Err(IdentityError::Rejected(_)) => {
            return ApiError::new(StatusCode::UNAUTHORIZED, "Invalid authorization code")
                .into_response();
        }
        Err(err @ IdentityError::Unavailable(_)) => {
            error!("{err}");
            return ApiError::new(StatusCode::BAD_GATEWAY, "Google is unavailable")
                .into_response();
        }
    };

    sign_in_response(
        auth_state,
        StrategyName::google(kind),
        &Credentials::Federated(assertion),
    )
    .await
}

#[utoipa::path(
    get,
    path = "/api/v1/admins/auth/google",
    responses((status = 303, description = "Redirect to Google")),
    tag = "admins"
)]
pub async fn admin_start(Extension(auth_state): Extension<Arc<AuthState>>) -> Response {
    start(&auth_state, PrincipalKind::Admin)
}

#[utoipa::path(
    get,
    path = "/api/v1/admins/auth/google/callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code"),
        ("error" = Option<String>, Query, description = "Error reported by Google"),
    ),
    responses(
        (status = 200, description = "Admin signed in", body = ApiResponse<SessionData>),
        (status = 401, description = "Code rejected or account linked elsewhere", body = ErrorBody),
        (status = 502, description = "Google unreachable", body = ErrorBody),
    ),
    tag = "admins"
)]
pub async fn admin_callback(
    Extension(auth_state): Extension<Arc<AuthState>>,
    Query(query): Query<GoogleCallbackQuery>,
) -> Response {
    callback(&auth_state, PrincipalKind::Admin, query).await
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/auth/google",
    responses((status = 303, description = "Redirect to Google")),
    tag = "stores"
)]
pub async fn store_start(Extension(auth_state): Extension<Arc<AuthState>>) -> Response {
    start(&auth_state, PrincipalKind::Store)
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/auth/google/callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code"),
        ("error" = Option<String>, Query, description = "Error reported by Google"),
    ),
    responses(
        (status = 200, description = "Store signed in", body = ApiResponse<SessionData>),
        (status = 401, description = "Code rejected or account linked elsewhere", body = ErrorBody),
        (status = 502, description = "Google unreachable", body = ErrorBody),
    ),
    tag = "stores"
)]
pub async fn store_callback(
    Extension(auth_state): Extension<Arc<AuthState>>,
    Query(query): Query<GoogleCallbackQuery>,
) -> Response {
    callback(&auth_state, PrincipalKind::Store, query).await
}

#[utoipa::path(
    get,
    path = "/api/v1/users/auth/google",
    responses((status = 303, description = "Redirect to Google")),
    tag = "users"
)]
pub async fn user_start(Extension(auth_state): Extension<Arc<AuthState>>) -> Response {
    start(&auth_state, PrincipalKind::User)
}

#[utoipa::path(
    get,
    path = "/api/v1/users/auth/google/callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code"),
        ("error" = Option<String>, Query, description = "Error reported by Google"),
    ),
    responses(
        (status = 200, description = "User signed in", body = ApiResponse<SessionData>),
        (status = 401, description = "Code rejected or account linked elsewhere", body = ErrorBody),
        (status = 502, description = "Google unreachable", body = ErrorBody),
    ),
    tag = "users"
)]
pub async fn user_callback(
    Extension(auth_state): Extension<Arc<AuthState>>,
    Query(query): Query<GoogleCallbackQuery>,
) -> Response {
    callback(&auth_state, PrincipalKind::User, query).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::google::IdentityProvider;
    use crate::api::handlers::auth::strategy::IdentityAssertion;
    use crate::api::handlers::auth::{AuthConfig, MemoryOtpMailer, MemoryPrincipalStore};
    use anyhow::Result;
    use async_trait::async_trait;
    use secrecy::SecretString;
    use url::Url;

    #[derive(Debug)]
    struct StubProvider;

    #[async_trait]
    impl IdentityProvider for StubProvider {
        fn authorize_url(&self, kind: PrincipalKind, state: &str) -> Result<Url> {
            Ok(Url::parse_with_params(
                "https://idp.test/authorize",
                &[("kind", kind.as_str()), ("state", state)],
            )?)
        }

        async fn exchange(
            &self,
            _kind: PrincipalKind,
            code: &str,
        ) -> Result<IdentityAssertion, IdentityError> {
            match code {
                "good" => Ok(IdentityAssertion {
                    email: Some("b@x.com".to_string()),
                    external_id: "g-123".to_string(),
                    display_name: Some("B".to_string()),
                }),
                "down" => Err(IdentityError::Unavailable(anyhow::anyhow!("timeout"))),
                _ => Err(IdentityError::Rejected("invalid_grant".to_string())),
            }
        }
    }

    fn state(with_provider: bool) -> Result<AuthState> {
        let identity: Option<Arc<dyn IdentityProvider>> = if with_provider {
            Some(Arc::new(StubProvider))
        } else {
            None
        };
        AuthState::new(
            AuthConfig::new().with_hash_work_factor(1),
            SecretString::from("federated-secret".to_string()),
            Arc::new(MemoryPrincipalStore::new()),
            Arc::new(MemoryOtpMailer::new()),
            identity,
        )
    }

    fn query(code: Option<&str>, error: Option<&str>) -> GoogleCallbackQuery {
        GoogleCallbackQuery {
            code: code.map(str::to_string),
            state: None,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn start_redirects_to_provider() -> Result<()> {
        let response = start(&state(true)?, PrincipalKind::Store);
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get("location")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        assert!(location.starts_with("https://idp.test/authorize?kind=store"));
        Ok(())
    }

    #[test]
    fn start_without_provider_is_not_configured() -> Result<()> {
        let response = start(&state(false)?, PrincipalKind::User);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        Ok(())
    }

    #[tokio::test]
    async fn callback_signs_in_and_provisions() -> Result<()> {
        let auth_state = state(true)?;
        let response = callback(&auth_state, PrincipalKind::User, query(Some("good"), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let created = auth_state
            .store()
            .find_by_email(PrincipalKind::User, "b@x.com")
            .await?;
        assert!(created.is_some_and(|user| user.google_id.as_deref() == Some("g-123")));
        Ok(())
    }

    #[tokio::test]
    async fn callback_maps_provider_errors() -> Result<()> {
        let auth_state = state(true)?;
        let rejected =
            callback(&auth_state, PrincipalKind::User, query(Some("bad"), None)).await;
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
        let down = callback(&auth_state, PrincipalKind::User, query(Some("down"), None)).await;
        assert_eq!(down.status(), StatusCode::BAD_GATEWAY);
        let declined = callback(
            &auth_state,
            PrincipalKind::User,
            query(None, Some("access_denied")),
        )
        .await;
        assert_eq!(declined.status(), StatusCode::UNAUTHORIZED);
        let missing = callback(&auth_state, PrincipalKind::User, query(None, None)).await;
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
