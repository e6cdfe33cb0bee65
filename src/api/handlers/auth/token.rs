//! Signed session tokens (HS256).
//!
//! Tokens carry `sub`, `email`, `role`, `iat` and `exp`. Expiry is checked by hand
//! against an injectable clock so that `now >= exp` is always treated as expired,
//! with no leeway.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::utils::unix_now;

pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 15 * 60;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signing secret must not be empty")]
    MissingSecret,
    #[error("failed to issue token: {0}")]
    Issuance(String),
    #[error("token has expired")]
    Expired,
    #[error("token is invalid")]
    Invalid,
}

/// What a session token asserts about its bearer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionClaims {
    pub subject_id: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    sub: String,
    email: String,
    role: String,
    iat: i64,
    exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    secret: SecretString,
    ttl_seconds: i64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"***")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl TokenService {
    /// # Errors
    /// Returns [`TokenError::MissingSecret`] if the secret is blank.
    pub fn new(secret: SecretString, ttl_seconds: i64) -> Result<Self, TokenError> {
        if secret.expose_secret().trim().is_empty() {
            return Err(TokenError::MissingSecret);
        }
        Ok(Self {
            secret,
            ttl_seconds,
        })
    }

    /// Sign a token valid for the configured lifetime.
    ///
    /// # Errors
    /// Returns [`TokenError::Issuance`] on empty claims or signing failure.
    pub fn issue(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        self.issue_with_ttl(claims, self.ttl_seconds)
    }

    /// # Errors
    /// Returns [`TokenError::Issuance`] on empty claims or signing failure.
    pub fn issue_with_ttl(
        &self,
        claims: &SessionClaims,
        ttl_seconds: i64,
    ) -> Result<String, TokenError> {
        self.issue_at(claims, ttl_seconds, unix_now())
    }

    fn issue_at(
        &self,
        claims: &SessionClaims,
        ttl_seconds: i64,
        now: i64,
    ) -> Result<String, TokenError> {
        for (field, value) in [
            ("subject_id", &claims.subject_id),
            ("email", &claims.email),
            ("role", &claims.role),
        ] {
            if value.is_empty() {
                return Err(TokenError::Issuance(format!("claim {field} is empty")));
            }
        }

        let token_claims = TokenClaims {
            sub: claims.subject_id.clone(),
            email: claims.email.clone(),
            role: claims.role.clone(),
            iat: now,
            exp: now.saturating_add(ttl_seconds),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &token_claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )
        .map_err(|err| TokenError::Issuance(err.to_string()))
    }

    /// # Errors
    /// Returns [`TokenError::Expired`] or [`TokenError::Invalid`].
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.verify_at(token, unix_now())
    }

    /// Verify against an explicit clock reading (unix seconds).
    ///
    /// # Errors
    /// Returns [`TokenError::Expired`] when `now >= exp`, [`TokenError::Invalid`] for
    /// a bad signature, a foreign algorithm or a malformed token.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<SessionClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;

        let data = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &validation,
        )
        .map_err(|err| {
            debug!("Rejected session token: {err}");
            TokenError::Invalid
        })?;

        if now >= data.claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(SessionClaims {
            subject_id: data.claims.sub,
            email: data.claims.email,
            role: data.claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(SecretString::from(secret.to_string()), DEFAULT_TOKEN_TTL_SECONDS)
            .unwrap_or_else(|err| panic!("token service: {err}"))
    }

    fn claims() -> SessionClaims {
        SessionClaims {
            subject_id: "0b6c2c9e-5d8e-4f57-9a51-0d4b3a0a9b11".to_string(),
            email: "a@x.com".to_string(),
            role: "super-admin".to_string(),
        }
    }

    #[test]
    fn issued_token_round_trips() -> Result<(), TokenError> {
        let tokens = service("signing-key");
        let token = tokens.issue(&claims())?;
        assert_eq!(tokens.verify(&token)?, claims());
        Ok(())
    }

    #[test]
    fn zero_ttl_is_already_expired() -> Result<(), TokenError> {
        let tokens = service("signing-key");
        let token = tokens.issue_at(&claims(), 0, 1_000)?;
        assert_eq!(tokens.verify_at(&token, 1_000), Err(TokenError::Expired));
        Ok(())
    }

    #[test]
    fn token_is_valid_until_exp() -> Result<(), TokenError> {
        let tokens = service("signing-key");
        let token = tokens.issue_at(&claims(), 60, 1_000)?;
        assert!(tokens.verify_at(&token, 1_059).is_ok());
        assert_eq!(tokens.verify_at(&token, 1_060), Err(TokenError::Expired));
        Ok(())
    }

    #[test]
    fn foreign_secret_is_invalid() -> Result<(), TokenError> {
        let token = service("signing-key").issue(&claims())?;
        assert_eq!(service("other-key").verify(&token), Err(TokenError::Invalid));
        Ok(())
    }

    #[test]
    fn tampered_or_garbage_tokens_are_invalid() -> Result<(), TokenError> {
        let tokens = service("signing-key");
        let token = tokens.issue(&claims())?;
        let mut tampered = token.clone();
        tampered.push('x');
        assert_eq!(tokens.verify(&tampered), Err(TokenError::Invalid));
        assert_eq!(tokens.verify("not.a.token"), Err(TokenError::Invalid));
        assert_eq!(tokens.verify(""), Err(TokenError::Invalid));
        Ok(())
    }

    #[test]
    fn other_algorithms_are_invalid() -> Result<(), jsonwebtoken::errors::Error> {
        let tokens = service("signing-key");
        let now = unix_now();
        let token = encode(
            &Header::new(Algorithm::HS512),
            &TokenClaims {
                sub: "id".to_string(),
                email: "a@x.com".to_string(),
                role: "super-admin".to_string(),
                iat: now,
                exp: now + 60,
            },
            &EncodingKey::from_secret(b"signing-key"),
        )?;
        assert_eq!(tokens.verify(&token), Err(TokenError::Invalid));
        Ok(())
    }

    #[test]
    fn empty_claims_are_refused() {
        let tokens = service("signing-key");
        let mut missing_role = claims();
        missing_role.role.clear();
        assert!(matches!(
            tokens.issue(&missing_role),
            Err(TokenError::Issuance(_))
        ));
    }

    #[test]
    fn blank_secret_is_a_configuration_error() {
        assert_eq!(
            TokenService::new(SecretString::from("  ".to_string()), 60).err(),
            Some(TokenError::MissingSecret)
        );
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", service("signing-key"));
        assert!(!rendered.contains("signing-key"));
    }
}
