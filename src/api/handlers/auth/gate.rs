//! Authentication gate: resolves named strategies, issues session tokens, and
//! guards routes with the bearer strategy.
//!
//! Flow Overview:
//! - password/federated/OTP sign-in: strategy -> principal -> signed token.
//! - store sign-in is two-step: `store-local` issues and mails an OTP, then
//!   `store-otp` exchanges it for a token.
//! - protected routes: `require_auth` runs `jwt` and attaches the `Principal`
//!   to request extensions for handlers and [`super::authorize`].

use anyhow::anyhow;
use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error, instrument};

use super::error::{ApiError, AuthError, AuthFailure};
use super::mailer::{OtpMailer, OtpMessage};
use super::otp::OtpIssuer;
use super::principal::{Principal, PrincipalKind};
use super::state::AuthState;
use super::storage::{PrincipalStore, PrincipalUpdate};
use super::strategy::{Credentials, StrategyName, StrategyRegistry, StrategyResult};
use super::token::{SessionClaims, TokenService};
use super::types::SessionData;
use super::utils::extract_bearer_token;

pub const LOGGED_IN: &str = "Logged in successfully!";
pub const OTP_SENT: &str = "OTP sent successfully!";
pub const OTP_VERIFIED: &str = "OTP verified successfully!";

#[derive(Debug)]
pub struct AuthGate {
    registry: StrategyRegistry,
    tokens: TokenService,
    store: Arc<dyn PrincipalStore>,
    otp: OtpIssuer,
    mailer: Arc<dyn OtpMailer>,
}

impl AuthGate {
    #[must_use]
    pub fn new(
        registry: StrategyRegistry,
        tokens: TokenService,
        store: Arc<dyn PrincipalStore>,
        otp: OtpIssuer,
        mailer: Arc<dyn OtpMailer>,
    ) -> Self {
        Self {
            registry,
            tokens,
            store,
            otp,
            mailer,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// # Errors
    /// Returns an error if the strategy is not registered or infrastructure fails.
    pub async fn authenticate(
        &self,
        name: StrategyName,
        credentials: &Credentials,
    ) -> StrategyResult {
        self.registry.get(name)?.authenticate(credentials).await
    }

    /// Sign a session token for an authenticated principal.
    ///
    /// # Errors
    /// Returns an error if the token cannot be issued.
    pub fn issue_session(&self, principal: &Principal) -> Result<SessionData, AuthError> {
        let access_token = self.tokens.issue(&SessionClaims {
            subject_id: principal.id.to_string(),
            email: principal.email.clone(),
            role: principal.role.to_string(),
        })?;
        Ok(SessionData::new(
            access_token,
            principal.kind,
            principal.view(),
        ))
    }

    /// Authenticate and, on success, issue a session token.
    ///
    /// # Errors
    /// Returns an error if the strategy is not registered, infrastructure fails,
    /// or the token cannot be issued.
    #[instrument(skip(self, credentials), fields(strategy = %name))]
    pub async fn sign_in(
        &self,
        name: StrategyName,
        credentials: &Credentials,
    ) -> Result<Result<SessionData, AuthFailure>, AuthError> {
        match self.authenticate(name, credentials).await? {
            Ok(principal) => {
                debug!("Issuing session for {}", principal.kind);
                Ok(Ok(self.issue_session(&principal)?))
            }
            Err(failure) => {
                debug!("Sign-in declined: {failure}");
                Ok(Err(failure))
            }
        }
    }

    /// First step of store sign-in: check the password, then issue, persist and
    /// mail a passcode. Mail failures are logged and do not fail the step.
    ///
    /// # Errors
    /// Returns an error if hashing or persistence fails.
    #[instrument(skip_all)]
    pub async fn request_store_otp(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Result<(), AuthFailure>, AuthError> {
        let credentials = Credentials::Password {
            email: email.to_string(),
            password: password.to_string(),
        };
        let store = match self.authenticate(StrategyName::StoreLocal, &credentials).await? {
            Ok(store) => store,
            Err(failure) => return Ok(Err(failure)),
        };

        let (code, record) = self.otp.issue_offload().await?;
        let expires_at = record.expires_at;
        self.store
            .update(PrincipalKind::Store, store.id, PrincipalUpdate::set_otp(record))
            .await?
            .ok_or_else(|| anyhow!("store vanished while issuing passcode"))?;

        let message = OtpMessage {
            to_email: store.email.clone(),
            display_name: store.full_name.clone(),
            code,
            expires_at,
        };
        if let Err(err) = self.mailer.send(&message).await {
            error!("Failed to deliver passcode: {err:#}");
        }

        Ok(Ok(()))
    }
}

/// Middleware that runs the `jwt` strategy and attaches the [`Principal`].
pub async fn require_auth(
    Extension(auth_state): Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let credentials = Credentials::Bearer(extract_bearer_token(request.headers()));
    match auth_state
        .gate()
        .authenticate(StrategyName::Jwt, &credentials)
        .await
    {
        Ok(Ok(principal)) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Ok(Err(failure)) => ApiError::unauthorized(failure).into_response(),
        Err(err) => auth_state.internal_error(&err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::mailer::MemoryOtpMailer;
    use crate::api::handlers::auth::principal::Role;
    use crate::api::handlers::auth::strategy::test_support::Fixture;
    use anyhow::{Context, Result, bail};

    fn gate(fixture: &Fixture, mailer: Arc<MemoryOtpMailer>) -> AuthGate {
        AuthGate::new(
            fixture.registry(false),
            fixture.tokens.clone(),
            fixture.store.clone(),
            fixture.otp.clone(),
            mailer,
        )
    }

    fn password(email: &str, password: &str) -> Credentials {
        Credentials::Password {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn sign_in_issues_verifiable_token() -> Result<()> {
        let fixture = Fixture::new()?;
        let admin = fixture.seed(Role::SUPER_ADMIN, "a@x.com", Some("secret1")).await?;
        let gate = gate(&fixture, Arc::new(MemoryOtpMailer::new()));

        let Ok(session) = gate
            .sign_in(StrategyName::AdminLocal, &password("a@x.com", "secret1"))
            .await?
        else {
            bail!("expected sign-in to succeed");
        };
        let claims = fixture.tokens.verify(&session.access_token)?;
        assert_eq!(claims.subject_id, admin.id.to_string());
        assert_eq!(claims.role, "super-admin");
        let view = session.admin.context("admin view missing")?;
        assert_eq!(view.email, "a@x.com");
        Ok(())
    }

    #[tokio::test]
    async fn sign_in_failure_carries_reason() -> Result<()> {
        let fixture = Fixture::new()?;
        fixture.seed(Role::SUPER_ADMIN, "a@x.com", Some("secret1")).await?;
        let gate = gate(&fixture, Arc::new(MemoryOtpMailer::new()));

        let outcome = gate
            .sign_in(StrategyName::AdminLocal, &password("a@x.com", "wrong"))
            .await?;
        assert!(matches!(outcome, Err(AuthFailure::IncorrectPassword)));
        Ok(())
    }

    #[tokio::test]
    async fn unregistered_strategy_is_configuration_error() -> Result<()> {
        let fixture = Fixture::new()?;
        let gate = gate(&fixture, Arc::new(MemoryOtpMailer::new()));
        let result = gate
            .authenticate(StrategyName::UserGoogle, &Credentials::Bearer(None))
            .await;
        assert!(matches!(
            result,
            Err(AuthError::StrategyNotConfigured(StrategyName::UserGoogle))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn store_otp_round_trip() -> Result<()> {
        let fixture = Fixture::new()?;
        fixture.seed(Role::STORE_ADMIN, "c@x.com", Some("pw")).await?;
        let mailer = Arc::new(MemoryOtpMailer::new());
        let gate = gate(&fixture, mailer.clone());

        assert!(gate.request_store_otp("c@x.com", "pw").await?.is_ok());
        let code = mailer.last_code_for("c@x.com").context("no code mailed")?;
        assert_eq!(code.len(), 6);

        let stored = fixture
            .store
            .find_by_email(PrincipalKind::Store, "c@x.com")
            .await?
            .context("store missing")?;
        let record = stored.otp.context("otp not persisted")?;
        assert_ne!(record.code_hash, code);

        let verify = Credentials::Otp {
            email: "c@x.com".to_string(),
            code: code.clone(),
        };
        let Ok(session) = gate.sign_in(StrategyName::StoreOtp, &verify).await? else {
            bail!("expected the passcode to verify");
        };
        assert!(session.store.is_some());

        let replay = gate.sign_in(StrategyName::StoreOtp, &verify).await?;
        assert!(matches!(replay, Err(AuthFailure::InvalidOrExpiredOtp)));
        Ok(())
    }

    #[tokio::test]
    async fn store_otp_not_sent_on_bad_password() -> Result<()> {
        let fixture = Fixture::new()?;
        fixture.seed(Role::STORE_ADMIN, "c@x.com", Some("pw")).await?;
        let mailer = Arc::new(MemoryOtpMailer::new());
        let gate = gate(&fixture, mailer.clone());

        let outcome = gate.request_store_otp("c@x.com", "nope").await?;
        assert_eq!(outcome, Err(AuthFailure::IncorrectPassword));
        assert_eq!(mailer.sent_count(), 0);
        Ok(())
    }
}
