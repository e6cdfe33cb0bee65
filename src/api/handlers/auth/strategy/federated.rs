use anyhow::anyhow;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{Credentials, IdentityAssertion, StrategyName, StrategyResult, mismatch};
use crate::api::handlers::auth::{
    error::AuthFailure,
    principal::{Principal, PrincipalKind},
    storage::{CreateOutcome, NewPrincipal, PrincipalStore, PrincipalUpdate},
    utils::normalize_email,
};

/// Sign-in with a provider-verified email.
///
/// Unknown emails are provisioned with the kind's default role, existing
/// unlinked accounts get the external id attached, and accounts already linked
/// to another external id are refused. Repeating a sign-in is a no-op.
#[derive(Debug)]
pub struct FederatedStrategy {
    kind: PrincipalKind,
    store: Arc<dyn PrincipalStore>,
}

impl FederatedStrategy {
    #[must_use]
    pub fn new(kind: PrincipalKind, store: Arc<dyn PrincipalStore>) -> Self {
        Self { kind, store }
    }

    #[must_use]
    pub fn name(&self) -> StrategyName {
        StrategyName::google(self.kind)
    }

    #[instrument(skip_all, fields(strategy = %self.name()))]
    pub(super) async fn authenticate(&self, credentials: &Credentials) -> StrategyResult {
        let Credentials::Federated(assertion) = credentials else {
            return Err(mismatch(self.name(), credentials));
        };
        let Some(email) = assertion
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|email| !email.is_empty())
        else {
            return Ok(Err(AuthFailure::MissingEmail));
        };

        let existing = match self.store.find_by_email(self.kind, &email).await? {
            Some(existing) => existing,
            None => match self.provision(&email, assertion).await? {
                CreateOutcome::Created(created) => {
                    info!("Provisioned {} from federated sign-in", self.kind);
                    return Ok(Ok(created));
                }
                // Lost a race with a concurrent sign-in (or the external id is
                // already taken by another account); settle on what is stored.
                CreateOutcome::Conflict => {
                    match self.store.find_by_email(self.kind, &email).await? {
                        Some(existing) => existing,
                        None => return Ok(Err(AuthFailure::IdentityMismatch)),
                    }
                }
            },
        };

        self.link(existing, &assertion.external_id).await
    }

    async fn provision(
        &self,
        email: &str,
        assertion: &IdentityAssertion,
    ) -> anyhow::Result<CreateOutcome> {
        let full_name = assertion
            .display_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| email.to_string());
        self.store
            .create(
                self.kind,
                NewPrincipal {
                    email: email.to_string(),
                    full_name,
                    role: self.kind.default_role(),
                    password_hash: None,
                    is_email_verified: true,
                    google_id: Some(assertion.external_id.clone()),
                },
            )
            .await
    }

    async fn link(&self, existing: Principal, external_id: &str) -> StrategyResult {
        match existing.google_id.as_deref() {
            Some(linked) if linked == external_id => Ok(Ok(existing)),
            Some(_) => {
                warn!(
                    "{} is already linked to a different external identity",
                    self.kind
                );
                Ok(Err(AuthFailure::IdentityMismatch))
            }
            None => {
                let owner = self.store.find_by_google_id(self.kind, external_id).await?;
                if owner.is_some_and(|owner| owner.id != existing.id) {
                    warn!("External identity is already linked to another {}", self.kind);
                    return Ok(Err(AuthFailure::IdentityMismatch));
                }
                let updated = self
                    .store
                    .update(
                        self.kind,
                        existing.id,
                        PrincipalUpdate::link_identity(external_id),
                    )
                    .await?
                    .ok_or_else(|| anyhow!("{} vanished while linking identity", self.kind))?;
                Ok(Ok(updated))
            }
        }
    }
}
