use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{Credentials, StrategyName, StrategyResult, mismatch};
use crate::api::handlers::auth::{
    error::AuthFailure,
    principal::Role,
    storage::PrincipalStore,
    token::{TokenError, TokenService},
};

/// Session token from the `Authorization` header. No hashing happens here.
#[derive(Debug)]
pub struct BearerStrategy {
    store: Arc<dyn PrincipalStore>,
    tokens: TokenService,
}

impl BearerStrategy {
    #[must_use]
    pub fn new(store: Arc<dyn PrincipalStore>, tokens: TokenService) -> Self {
        Self { store, tokens }
    }

    #[instrument(skip_all, fields(strategy = "jwt"))]
    pub(super) async fn authenticate(&self, credentials: &Credentials) -> StrategyResult {
        let Credentials::Bearer(token) = credentials else {
            return Err(mismatch(StrategyName::Jwt, credentials));
        };
        let Some(token) = token.as_deref() else {
            return Ok(Err(AuthFailure::MissingToken));
        };

        let claims = match self.tokens.verify(token) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => return Ok(Err(AuthFailure::TokenExpired)),
            Err(_) => return Ok(Err(AuthFailure::TokenInvalid)),
        };

        // The role picks the collection, so it is checked before any lookup.
        let Ok(role) = claims.role.parse::<Role>() else {
            debug!("Token carries unknown role {}", claims.role);
            return Ok(Err(AuthFailure::InvalidRoleInClaim));
        };

        let Ok(id) = Uuid::parse_str(&claims.subject_id) else {
            return Ok(Err(AuthFailure::NoEntityFound));
        };

        match self.store.find_by_id(role.kind(), id).await? {
            Some(principal) => Ok(Ok(principal)),
            None => Ok(Err(AuthFailure::NoEntityFound)),
        }
    }
}
