use anyhow::anyhow;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{Credentials, StrategyName, StrategyResult, mismatch};
use crate::api::handlers::auth::{
    error::AuthFailure,
    otp::OtpIssuer,
    principal::PrincipalKind,
    storage::{PrincipalStore, PrincipalUpdate},
    utils::{normalize_email, unix_now},
};

/// Second step of store sign-in. A code is consumed on the first success.
#[derive(Debug)]
pub struct OtpStrategy {
    store: Arc<dyn PrincipalStore>,
    issuer: OtpIssuer,
}

impl OtpStrategy {
    #[must_use]
    pub fn new(store: Arc<dyn PrincipalStore>, issuer: OtpIssuer) -> Self {
        Self { store, issuer }
    }

    #[instrument(skip_all, fields(strategy = "store-otp"))]
    pub(super) async fn authenticate(&self, credentials: &Credentials) -> StrategyResult {
        let Credentials::Otp { email, code } = credentials else {
            return Err(mismatch(StrategyName::StoreOtp, credentials));
        };

        let email = normalize_email(email);
        let Some(store) = self.store.find_by_email(PrincipalKind::Store, &email).await? else {
            return Ok(Err(AuthFailure::NotFound(PrincipalKind::Store)));
        };

        let Some(record) = store.otp.clone() else {
            debug!("Store has no pending passcode");
            return Ok(Err(AuthFailure::InvalidOrExpiredOtp));
        };

        let now = unix_now();
        if now > record.expires_at {
            debug!("Pending passcode expired, clearing it");
            self.store
                .update(PrincipalKind::Store, store.id, PrincipalUpdate::clear_otp())
                .await?;
            return Ok(Err(AuthFailure::InvalidOrExpiredOtp));
        }

        if !self
            .issuer
            .is_valid_offload(code.clone(), record, now)
            .await?
        {
            return Ok(Err(AuthFailure::InvalidOrExpiredOtp));
        }

        // Persist the cleared state before answering so the code cannot be replayed.
        let cleared = self
            .store
            .update(PrincipalKind::Store, store.id, PrincipalUpdate::clear_otp())
            .await?
            .ok_or_else(|| anyhow!("store vanished while consuming passcode"))?;

        Ok(Ok(cleared))
    }
}
