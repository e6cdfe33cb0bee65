//! One-time passcodes for the second step of store sign-in.

use rand::{Rng, rngs::OsRng};

use super::hasher::{CredentialHasher, HashingError};
use super::principal::OtpRecord;
use super::utils::unix_now;

pub const OTP_LENGTH: usize = 6;
pub const DEFAULT_OTP_TTL_SECONDS: i64 = 5 * 60;

#[derive(Clone, Debug)]
pub struct OtpIssuer {
    hasher: CredentialHasher,
    window_seconds: i64,
}

impl OtpIssuer {
    #[must_use]
    pub fn new(hasher: CredentialHasher, window_seconds: i64) -> Self {
        Self {
            hasher,
            window_seconds,
        }
    }

    /// Six decimal digits from the OS CSPRNG, leading zeros kept.
    #[must_use]
    pub fn generate() -> String {
        let value: u32 = OsRng.gen_range(0..1_000_000);
        format!("{value:06}")
    }

    #[must_use]
    pub fn expiry_from(&self, now: i64) -> i64 {
        now.saturating_add(self.window_seconds)
    }

    /// Expiry is checked before the hash, so an expired code never costs a hash.
    #[must_use]
    pub fn is_valid(&self, code: &str, hashed: &str, expires_at: i64, now: i64) -> bool {
        if now > expires_at {
            return false;
        }
        self.hasher.verify(code, hashed)
    }

    /// [`Self::is_valid`] on the blocking pool.
    ///
    /// # Errors
    /// Returns an error if the blocking task fails; that is not a mismatch.
    pub async fn is_valid_offload(
        &self,
        code: String,
        record: OtpRecord,
        now: i64,
    ) -> Result<bool, HashingError> {
        if now > record.expires_at {
            return Ok(false);
        }
        let issuer = self.clone();
        tokio::task::spawn_blocking(move || {
            issuer.is_valid(&code, &record.code_hash, record.expires_at, now)
        })
        .await
        .map_err(|err| HashingError::Join(err.to_string()))
    }

    /// Generate, hash and stamp a fresh code. The plaintext goes to the mailer only.
    ///
    /// # Errors
    /// Returns an error if the code cannot be hashed.
    pub fn issue(&self) -> Result<(String, OtpRecord), HashingError> {
        self.issue_at(unix_now())
    }

    /// [`Self::issue`] on the blocking pool.
    ///
    /// # Errors
    /// Returns an error if the code cannot be hashed or the blocking task fails.
    pub async fn issue_offload(&self) -> Result<(String, OtpRecord), HashingError> {
        let issuer = self.clone();
        tokio::task::spawn_blocking(move || issuer.issue())
            .await
            .map_err(|err| HashingError::Join(err.to_string()))?
    }

    /// # Errors
    /// Returns an error if the code cannot be hashed.
    pub fn issue_at(&self, now: i64) -> Result<(String, OtpRecord), HashingError> {
        let code = Self::generate();
        let code_hash = self.hasher.hash(&code)?;
        Ok((
            code,
            OtpRecord {
                code_hash,
                expires_at: self.expiry_from(now),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> OtpIssuer {
        let hasher = CredentialHasher::new(1).unwrap_or_else(|err| panic!("hasher: {err}"));
        OtpIssuer::new(hasher, DEFAULT_OTP_TTL_SECONDS)
    }

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..200 {
            let code = OtpIssuer::generate();
            assert_eq!(code.len(), OTP_LENGTH);
            assert!(code.bytes().all(|byte| byte.is_ascii_digit()));
        }
    }

    #[test]
    fn expiry_is_five_minutes_out() {
        assert_eq!(issuer().expiry_from(1_000), 1_300);
    }

    #[test]
    fn code_is_valid_within_window() -> Result<(), HashingError> {
        let issuer = issuer();
        let (code, record) = issuer.issue_at(1_000)?;
        assert!(issuer.is_valid(&code, &record.code_hash, record.expires_at, 1_000));
        assert!(issuer.is_valid(&code, &record.code_hash, record.expires_at, 1_300));
        assert!(!issuer.is_valid("000000x", &record.code_hash, record.expires_at, 1_000));
        Ok(())
    }

    #[test]
    fn expired_code_fails_even_when_it_matches() -> Result<(), HashingError> {
        let issuer = issuer();
        let (code, record) = issuer.issue_at(1_000)?;
        assert!(!issuer.is_valid(&code, &record.code_hash, record.expires_at, 1_301));
        Ok(())
    }

    #[tokio::test]
    async fn offloaded_check_matches_sync_check() -> Result<(), HashingError> {
        let issuer = issuer();
        let (code, record) = issuer.issue_offload().await?;
        let now = record.expires_at - 1;
        assert!(issuer.is_valid_offload(code.clone(), record.clone(), now).await?);
        assert!(!issuer.is_valid_offload("000000x".to_string(), record.clone(), now).await?);
        assert!(!issuer.is_valid_offload(code, record.clone(), record.expires_at + 1).await?);
        Ok(())
    }

    #[test]
    fn plaintext_is_not_stored() -> Result<(), HashingError> {
        let (code, record) = issuer().issue()?;
        assert!(!record.code_hash.contains(&code));
        Ok(())
    }
}
