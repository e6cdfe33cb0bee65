use std::sync::Arc;
use tracing::{debug, instrument};

use super::{Credentials, StrategyName, StrategyResult, mismatch};
use crate::api::handlers::auth::{
    error::AuthFailure, hasher::CredentialHasher, principal::PrincipalKind,
    storage::PrincipalStore, utils::normalize_email,
};

/// Email + password against the stored Argon2id hash.
#[derive(Debug)]
pub struct LocalStrategy {
    kind: PrincipalKind,
    store: Arc<dyn PrincipalStore>,
    hasher: CredentialHasher,
}

impl LocalStrategy {
    #[must_use]
    pub fn new(
        kind: PrincipalKind,
        store: Arc<dyn PrincipalStore>,
        hasher: CredentialHasher,
    ) -> Self {
        Self {
            kind,
            store,
            hasher,
        }
    }

    #[must_use]
    pub fn name(&self) -> StrategyName {
        StrategyName::local(self.kind)
    }

    #[instrument(skip_all, fields(strategy = %self.name()))]
    pub(super) async fn authenticate(&self, credentials: &Credentials) -> StrategyResult {
        let Credentials::Password { email, password } = credentials else {
            return Err(mismatch(self.name(), credentials));
        };

        let email = normalize_email(email);
        let Some(principal) = self.store.find_by_email(self.kind, &email).await? else {
            debug!("No {} registered for the supplied email", self.kind);
            return Ok(Err(AuthFailure::NotFound(self.kind)));
        };

        let Some(password_hash) = principal.password_hash.clone() else {
            return Ok(Err(AuthFailure::NoPasswordSet));
        };

        if !self
            .hasher
            .verify_offload(password.clone(), password_hash)
            .await?
        {
            return Ok(Err(AuthFailure::IncorrectPassword));
        }

        Ok(Ok(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::*;
    use crate::api::handlers::auth::principal::Role;
    use anyhow::Result;

    fn password(email: &str, password: &str) -> Credentials {
        Credentials::Password {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn correct_password_yields_principal() -> Result<()> {
        let fixture = Fixture::new()?;
        let seeded = fixture.seed(Role::SUPER_ADMIN, "a@x.com", Some("secret1")).await?;
        let strategy =
            LocalStrategy::new(PrincipalKind::Admin, fixture.store.clone(), fixture.hasher.clone());

        let principal = strategy.authenticate(&password("a@x.com", "secret1")).await?;
        assert_eq!(principal, Ok(seeded));
        Ok(())
    }

    #[tokio::test]
    async fn email_lookup_is_normalized() -> Result<()> {
        let fixture = Fixture::new()?;
        fixture.seed(Role::SUPER_ADMIN, "a@x.com", Some("secret1")).await?;
        let strategy =
            LocalStrategy::new(PrincipalKind::Admin, fixture.store.clone(), fixture.hasher.clone());

        let principal = strategy.authenticate(&password(" A@X.com ", "secret1")).await?;
        assert!(principal.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn wrong_password_is_incorrect_password() -> Result<()> {
        let fixture = Fixture::new()?;
        fixture.seed(Role::SUPER_ADMIN, "a@x.com", Some("secret1")).await?;
        let strategy =
            LocalStrategy::new(PrincipalKind::Admin, fixture.store.clone(), fixture.hasher.clone());

        let outcome = strategy.authenticate(&password("a@x.com", "wrong")).await?;
        assert_eq!(outcome, Err(AuthFailure::IncorrectPassword));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_email_is_not_found_for_the_kind() -> Result<()> {
        let fixture = Fixture::new()?;
        // Same email exists as a store, not as a user.
        fixture.seed(Role::STORE_ADMIN, "a@x.com", Some("secret1")).await?;
        let strategy =
            LocalStrategy::new(PrincipalKind::User, fixture.store.clone(), fixture.hasher.clone());

        let outcome = strategy.authenticate(&password("a@x.com", "secret1")).await?;
        assert_eq!(outcome, Err(AuthFailure::NotFound(PrincipalKind::User)));
        Ok(())
    }

    #[tokio::test]
    async fn federated_only_account_has_no_password() -> Result<()> {
        let fixture = Fixture::new()?;
        fixture.seed(Role::STORE_ADMIN, "c@x.com", None).await?;
        let strategy =
            LocalStrategy::new(PrincipalKind::Store, fixture.store.clone(), fixture.hasher.clone());

        let outcome = strategy.authenticate(&password("c@x.com", "anything")).await?;
        assert_eq!(outcome, Err(AuthFailure::NoPasswordSet));
        Ok(())
    }
}
