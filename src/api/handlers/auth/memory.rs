//! In-process principal store for tests and runs without a database.

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::principal::{Principal, PrincipalKind};
use super::storage::{
    CreateOutcome, NewPrincipal, PrincipalStore, PrincipalUpdate, ensure_role_matches,
};
use super::utils::unix_now;

#[derive(Debug, Default)]
pub struct MemoryPrincipalStore {
    principals: RwLock<HashMap<PrincipalKind, HashMap<Uuid, Principal>>>,
}

impl MemoryPrincipalStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PrincipalStore for MemoryPrincipalStore {
    async fn find_by_email(&self, kind: PrincipalKind, email: &str) -> Result<Option<Principal>> {
        let principals = self.principals.read().await;
        Ok(principals
            .get(&kind)
            .and_then(|by_id| by_id.values().find(|p| p.email == email))
            .cloned())
    }

    async fn find_by_id(&self, kind: PrincipalKind, id: Uuid) -> Result<Option<Principal>> {
        let principals = self.principals.read().await;
        Ok(principals
            .get(&kind)
            .and_then(|by_id| by_id.get(&id))
            .cloned())
    }

    async fn find_by_google_id(
        &self,
        kind: PrincipalKind,
        google_id: &str,
    ) -> Result<Option<Principal>> {
        let principals = self.principals.read().await;
        Ok(principals
            .get(&kind)
            .and_then(|by_id| {
                by_id
                    .values()
                    .find(|p| p.google_id.as_deref() == Some(google_id))
            })
            .cloned())
    }

    async fn create(&self, kind: PrincipalKind, principal: NewPrincipal) -> Result<CreateOutcome> {
        ensure_role_matches(kind, principal.role)?;

        let mut principals = self.principals.write().await;
        let by_id = principals.entry(kind).or_default();

        let taken = by_id.values().any(|existing| {
            existing.email == principal.email
                || (principal.google_id.is_some() && existing.google_id == principal.google_id)
        });
        if taken {
            return Ok(CreateOutcome::Conflict);
        }

        let now = unix_now();
        let created = Principal {
            id: Uuid::new_v4(),
            kind,
            email: principal.email,
            full_name: principal.full_name,
            role: principal.role,
            password_hash: principal.password_hash,
            is_email_verified: principal.is_email_verified,
            google_id: principal.google_id,
            otp: None,
            created_at: now,
            updated_at: now,
        };
        by_id.insert(created.id, created.clone());
        Ok(CreateOutcome::Created(created))
    }

    async fn update(
        &self,
        kind: PrincipalKind,
        id: Uuid,
        update: PrincipalUpdate,
    ) -> Result<Option<Principal>> {
        let mut principals = self.principals.write().await;
        let Some(by_id) = principals.get_mut(&kind) else {
            return Ok(None);
        };
        if let Some(google_id) = update.google_id.as_deref() {
            let taken = by_id
                .values()
                .any(|other| other.id != id && other.google_id.as_deref() == Some(google_id));
            if taken {
                bail!("external identity is already linked to another {kind}");
            }
        }
        let Some(principal) = by_id.get_mut(&id) else {
            return Ok(None);
        };
        update.apply(principal, unix_now());
        Ok(Some(principal.clone()))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
