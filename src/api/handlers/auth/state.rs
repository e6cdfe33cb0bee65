//! Auth state and configuration.

use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;

use super::error::{ApiError, AuthError};
use super::gate::AuthGate;
use super::google::IdentityProvider;
use super::hasher::{CredentialHasher, DEFAULT_WORK_FACTOR};
use super::mailer::OtpMailer;
use super::otp::{DEFAULT_OTP_TTL_SECONDS, OtpIssuer};
use super::storage::PrincipalStore;
use super::strategy::StrategyRegistry;
use super::token::{DEFAULT_TOKEN_TTL_SECONDS, TokenService};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthConfig {
    token_ttl_seconds: i64,
    otp_ttl_seconds: i64,
    hash_work_factor: u32,
    production: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            otp_ttl_seconds: DEFAULT_OTP_TTL_SECONDS,
            hash_work_factor: DEFAULT_WORK_FACTOR,
            production: false,
        }
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_otp_ttl_seconds(mut self, seconds: i64) -> Self {
        self.otp_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_hash_work_factor(mut self, work_factor: u32) -> Self {
        self.hash_work_factor = work_factor;
        self
    }

    #[must_use]
    pub fn with_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    #[must_use]
    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }

    #[must_use]
    pub fn otp_ttl_seconds(&self) -> i64 {
        self.otp_ttl_seconds
    }

    #[must_use]
    pub fn hash_work_factor(&self) -> u32 {
        self.hash_work_factor
    }

    /// Production mode hides internal error detail from responses.
    #[must_use]
    pub fn production(&self) -> bool {
        self.production
    }
}

/// Everything request handlers need, shared through an `Extension<Arc<AuthState>>`.
#[derive(Debug)]
pub struct AuthState {
    config: AuthConfig,
    store: Arc<dyn PrincipalStore>,
    hasher: CredentialHasher,
    gate: AuthGate,
    identity: Option<Arc<dyn IdentityProvider>>,
}

impl AuthState {
    /// Wire hasher, token service, OTP issuer and the strategy registry.
    ///
    /// # Errors
    /// Returns an error for a blank signing secret or an unusable work factor.
    pub fn new(
        config: AuthConfig,
        jwt_secret: SecretString,
        store: Arc<dyn PrincipalStore>,
        mailer: Arc<dyn OtpMailer>,
        identity: Option<Arc<dyn IdentityProvider>>,
    ) -> Result<Self> {
        let hasher = CredentialHasher::new(config.hash_work_factor())
            .context("Invalid password hashing work factor")?;
        let tokens = TokenService::new(jwt_secret, config.token_ttl_seconds())
            .context("Invalid token signing configuration")?;
        let otp = OtpIssuer::new(hasher.clone(), config.otp_ttl_seconds());
        let registry =
            StrategyRegistry::standard(&store, &hasher, &tokens, &otp, identity.is_some());

        Ok(Self {
            config,
            gate: AuthGate::new(registry, tokens, store.clone(), otp, mailer),
            store,
            hasher,
            identity,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn PrincipalStore> {
        &self.store
    }

    #[must_use]
    pub fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }

    #[must_use]
    pub fn identity_provider(&self) -> Option<&Arc<dyn IdentityProvider>> {
        self.identity.as_ref()
    }

    /// Render an infrastructure error, with detail only outside production.
    #[must_use]
    pub fn internal_error(&self, err: &AuthError) -> ApiError {
        ApiError::internal(err).expose_details(!self.config.production())
    }
}
