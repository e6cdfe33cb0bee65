//! Named authentication strategies and the registry that holds them.
//!
//! The set of strategy names and the set of credential shapes are both closed.
//! Each strategy answers with `Ok(Ok(principal))`, `Ok(Err(failure))` for an
//! expected credential problem, or `Err(_)` when infrastructure broke.

mod bearer;
mod federated;
mod local;
mod otp;

pub use bearer::BearerStrategy;
pub use federated::FederatedStrategy;
pub use local::LocalStrategy;
pub use otp::OtpStrategy;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::error::{AuthError, AuthFailure};
use super::hasher::CredentialHasher;
use super::otp::OtpIssuer;
use super::principal::{Principal, PrincipalKind};
use super::storage::PrincipalStore;
use super::token::TokenService;

pub type StrategyResult = Result<Result<Principal, AuthFailure>, AuthError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyName {
    AdminLocal,
    UserLocal,
    StoreLocal,
    Jwt,
    AdminGoogle,
    UserGoogle,
    StoreGoogle,
    StoreOtp,
}

impl StrategyName {
    pub const ALL: [Self; 8] = [
        Self::AdminLocal,
        Self::UserLocal,
        Self::StoreLocal,
        Self::Jwt,
        Self::AdminGoogle,
        Self::UserGoogle,
        Self::StoreGoogle,
        Self::StoreOtp,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AdminLocal => "admin-local",
            Self::UserLocal => "user-local",
            Self::StoreLocal => "store-local",
            Self::Jwt => "jwt",
            Self::AdminGoogle => "admin-google",
            Self::UserGoogle => "user-google",
            Self::StoreGoogle => "store-google",
            Self::StoreOtp => "store-otp",
        }
    }

    #[must_use]
    pub const fn local(kind: PrincipalKind) -> Self {
        match kind {
            PrincipalKind::Admin => Self::AdminLocal,
            PrincipalKind::Store => Self::StoreLocal,
            PrincipalKind::User => Self::UserLocal,
        }
    }

    #[must_use]
    pub const fn google(kind: PrincipalKind) -> Self {
        match kind {
            PrincipalKind::Admin => Self::AdminGoogle,
            PrincipalKind::Store => Self::StoreGoogle,
            PrincipalKind::User => Self::UserGoogle,
        }
    }
}

impl fmt::Display for StrategyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An external provider's claim about who the caller is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityAssertion {
    pub email: Option<String>,
    pub external_id: String,
    pub display_name: Option<String>,
}

#[derive(Clone, Debug)]
pub enum Credentials {
    Password { email: String, password: String },
    Bearer(Option<String>),
    Federated(IdentityAssertion),
    Otp { email: String, code: String },
}

impl Credentials {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::Bearer(_) => "bearer",
            Self::Federated(_) => "federated",
            Self::Otp { .. } => "otp",
        }
    }
}

#[derive(Debug)]
pub enum Strategy {
    Local(LocalStrategy),
    Bearer(BearerStrategy),
    Federated(FederatedStrategy),
    Otp(OtpStrategy),
}

impl Strategy {
    #[must_use]
    pub fn name(&self) -> StrategyName {
        match self {
            Self::Local(strategy) => strategy.name(),
            Self::Bearer(_) => StrategyName::Jwt,
            Self::Federated(strategy) => strategy.name(),
            Self::Otp(_) => StrategyName::StoreOtp,
        }
    }

    /// # Errors
    /// Returns an error on credential shape mismatch or infrastructure failure.
    pub async fn authenticate(&self, credentials: &Credentials) -> StrategyResult {
        match self {
            Self::Local(strategy) => strategy.authenticate(credentials).await,
            Self::Bearer(strategy) => strategy.authenticate(credentials).await,
            Self::Federated(strategy) => strategy.authenticate(credentials).await,
            Self::Otp(strategy) => strategy.authenticate(credentials).await,
        }
    }
}

pub(super) fn mismatch(strategy: StrategyName, credentials: &Credentials) -> AuthError {
    AuthError::CredentialMismatch {
        strategy,
        credentials: credentials.label(),
    }
}

/// Read-only map from strategy name to strategy, built once at startup.
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<StrategyName, Strategy>,
}

impl StrategyRegistry {
    #[must_use]
    pub fn builder() -> StrategyRegistryBuilder {
        StrategyRegistryBuilder::default()
    }

    /// Registers the local, bearer and OTP strategies. Federated strategies are
    /// added only when `federated` is set (an identity provider is configured).
    #[must_use]
    pub fn standard(
        store: &Arc<dyn PrincipalStore>,
        hasher: &CredentialHasher,
        tokens: &TokenService,
        otp: &OtpIssuer,
        federated: bool,
    ) -> Self {
        let kinds = [PrincipalKind::Admin, PrincipalKind::Store, PrincipalKind::User];
        let mut builder = Self::builder();
        for kind in kinds {
            builder = builder.register(Strategy::Local(LocalStrategy::new(
                kind,
                store.clone(),
                hasher.clone(),
            )));
        }
        builder = builder
            .register(Strategy::Bearer(BearerStrategy::new(
                store.clone(),
                tokens.clone(),
            )))
            .register(Strategy::Otp(OtpStrategy::new(store.clone(), otp.clone())));
        if federated {
            for kind in kinds {
                builder = builder.register(Strategy::Federated(FederatedStrategy::new(
                    kind,
                    store.clone(),
                )));
            }
        }
        builder.build()
    }

    /// # Errors
    /// Returns [`AuthError::StrategyNotConfigured`] for names never registered.
    pub fn get(&self, name: StrategyName) -> Result<&Strategy, AuthError> {
        self.strategies
            .get(&name)
            .ok_or(AuthError::StrategyNotConfigured(name))
    }

    #[must_use]
    pub fn contains(&self, name: StrategyName) -> bool {
        self.strategies.contains_key(&name)
    }

    pub fn names(&self) -> impl Iterator<Item = StrategyName> + '_ {
        self.strategies.keys().copied()
    }
}

#[derive(Debug, Default)]
pub struct StrategyRegistryBuilder {
    strategies: HashMap<StrategyName, Strategy>,
}

impl StrategyRegistryBuilder {
    /// A later registration under the same name replaces the earlier one.
    #[must_use]
    pub fn register(mut self, strategy: Strategy) -> Self {
        self.strategies.insert(strategy.name(), strategy);
        self
    }

    #[must_use]
    pub fn build(self) -> StrategyRegistry {
        StrategyRegistry {
            strategies: self.strategies,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::Fixture;
    use super::*;
    use anyhow::Result;

    #[test]
    fn names_are_stable() {
        let names: Vec<&str> = StrategyName::ALL.iter().map(|n| n.as_str()).collect();
        assert_eq!(
            names,
            [
                "admin-local",
                "user-local",
                "store-local",
                "jwt",
                "admin-google",
                "user-google",
                "store-google",
                "store-otp"
            ]
        );
    }

    #[test]
    fn standard_registry_without_provider_skips_federated() -> Result<()> {
        let registry = Fixture::new()?.registry(false);
        for name in [
            StrategyName::AdminLocal,
            StrategyName::UserLocal,
            StrategyName::StoreLocal,
            StrategyName::Jwt,
            StrategyName::StoreOtp,
        ] {
            assert_eq!(registry.get(name)?.name(), name);
        }
        assert!(matches!(
            registry.get(StrategyName::UserGoogle),
            Err(AuthError::StrategyNotConfigured(StrategyName::UserGoogle))
        ));
        Ok(())
    }

    #[test]
    fn standard_registry_with_provider_has_every_name() -> Result<()> {
        let registry = Fixture::new()?.registry(true);
        for name in StrategyName::ALL {
            assert!(registry.contains(name), "{name} missing");
        }
        assert_eq!(registry.names().count(), StrategyName::ALL.len());
        Ok(())
    }

    #[test]
    fn empty_registry_reports_not_configured() {
        let registry = StrategyRegistry::builder().build();
        assert!(matches!(
            registry.get(StrategyName::Jwt),
            Err(AuthError::StrategyNotConfigured(StrategyName::Jwt))
        ));
    }

    #[tokio::test]
    async fn wrong_credential_shape_is_an_error() -> Result<()> {
        let registry = Fixture::new()?.registry(false);
        let result = registry
            .get(StrategyName::AdminLocal)?
            .authenticate(&Credentials::Bearer(None))
            .await;
        assert!(matches!(
            result,
            Err(AuthError::CredentialMismatch {
                strategy: StrategyName::AdminLocal,
                credentials: "bearer"
            })
        ));
        Ok(())
    }
}
