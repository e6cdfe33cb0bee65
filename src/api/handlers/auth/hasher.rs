//! Argon2id password and passcode hashing.

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{SaltString, rand_core::OsRng},
};
use tracing::warn;

pub const DEFAULT_WORK_FACTOR: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum HashingError {
    #[error("invalid hashing parameters: {0}")]
    Params(String),
    #[error("failed to hash secret: {0}")]
    Hash(String),
    #[error("hashing task failed: {0}")]
    Join(String),
}

/// Hashes and verifies secrets. The work factor is the Argon2 time cost.
#[derive(Clone, Debug)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    /// # Errors
    /// Returns an error if the work factor is rejected by Argon2 (zero).
    pub fn new(work_factor: u32) -> Result<Self, HashingError> {
        let params = Params::new(
            Params::DEFAULT_M_COST,
            work_factor,
            Params::DEFAULT_P_COST,
            None,
        )
        .map_err(|err| HashingError::Params(err.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a secret into a PHC string with a fresh random salt.
    ///
    /// # Errors
    /// Returns an error if Argon2 fails to produce a hash.
    pub fn hash(&self, secret: &str) -> Result<String, HashingError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| HashingError::Hash(err.to_string()))
    }

    /// Compare a secret against a stored PHC string.
    ///
    /// Parameters embedded in the stored hash win over the configured ones, so
    /// hashes made with an older work factor keep verifying.
    #[must_use]
    pub fn verify(&self, secret: &str, hashed: &str) -> bool {
        let parsed = match PasswordHash::new(hashed) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("Stored credential hash is malformed: {err}");
                return false;
            }
        };
        self.argon2()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }

    /// Same as [`Self::hash`], run on the blocking pool.
    ///
    /// # Errors
    /// Returns an error if hashing fails or the blocking task panics.
    pub async fn hash_offload(&self, secret: String) -> Result<String, HashingError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|err| HashingError::Join(err.to_string()))?
    }

    /// Same as [`Self::verify`], run on the blocking pool.
    ///
    /// # Errors
    /// Returns an error if the blocking task panics or is cancelled; that is not
    /// a mismatch.
    pub async fn verify_offload(&self, secret: String, hashed: String) -> Result<bool, HashingError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&secret, &hashed))
            .await
            .map_err(|err| HashingError::Join(err.to_string()))
    }
}
