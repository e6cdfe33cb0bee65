//! Auth core: strategies, session tokens, passcodes and role gates.
//!
//! ## Strategies
//!
//! Every sign-in path resolves a [`strategy::StrategyName`] through the
//! [`strategy::StrategyRegistry`], which is built once in [`AuthState::new`]
//! and never changes afterwards. Federated (`*-google`) strategies exist only
//! when an identity provider is configured.
//!
//! ## Store sign-in
//!
//! Stores sign in with two steps. `store-local` checks the password and mails a
//! six digit passcode valid for five minutes; `store-otp` consumes it. The code
//! is stored only as an Argon2id hash and is cleared on first use.
//!
//! ## Protected routes
//!
//! [`gate::require_auth`] attaches the [`principal::Principal`] to the request,
//! then [`authorize::require_roles`] checks the route's role policy.

pub mod authorize;
pub(crate) mod error;
pub mod gate;
pub mod google;
pub mod hasher;
pub mod mailer;
pub mod memory;
pub mod otp;
pub mod principal;
mod state;
pub mod storage;
pub mod strategy;
pub mod token;
pub(crate) mod types;
pub(crate) mod utils;

pub use error::{ApiError, AuthError, AuthFailure};
pub use google::{GoogleConfig, GoogleIdentityProvider, IdentityProvider};
pub use mailer::{LogOtpMailer, MemoryOtpMailer, OtpMailer};
pub use memory::MemoryPrincipalStore;
pub use state::{AuthConfig, AuthState};
pub use storage::{PgPrincipalStore, PrincipalStore};
