//! # Portico (Authentication & Authorization Core)
//!
//! `portico` authenticates the three kinds of principals of a multi-tenant store
//! backend (admins, stores and end users), issues signed session tokens, and gates
//! routes by role.
//!
//! ## Strategies
//!
//! Every sign-in path goes through a named strategy held in a registry that is
//! built once at startup and never mutated afterwards:
//!
//! - **Local** (`admin-local`, `user-local`, `store-local`): email + password,
//!   verified against an Argon2id hash.
//! - **Bearer** (`jwt`): a session token from the `Authorization` header.
//! - **Federated** (`admin-google`, `user-google`, `store-google`): a verified email
//!   asserted by Google; unknown emails are provisioned, existing accounts are linked.
//! - **OTP** (`store-otp`): a six digit passcode mailed to stores after a successful
//!   password check. Codes are single use and expire after a short window.
//!
//! ## Roles
//!
//! Roles come from three disjoint sets (admin, store, user). A token whose role is in
//! none of them is rejected before any lookup happens.
//!
//! ## Errors
//!
//! Expected credential failures render as `401` with a presentable `message`;
//! role mismatches render as `403`; infrastructure failures render as `500` and only
//! expose internal detail outside production mode.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
