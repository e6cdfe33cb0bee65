//! Google as the external identity provider for federated sign-in.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::principal::PrincipalKind;
use super::strategy::IdentityAssertion;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The provider refused the authorization code.
    #[error("identity provider rejected the authorization code: {0}")]
    Rejected(String),
    #[error("identity provider is unavailable: {0:#}")]
    Unavailable(anyhow::Error),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    /// Where to send the browser to start sign-in for `kind`.
    ///
    /// # Errors
    /// Returns an error if the URL cannot be built.
    fn authorize_url(&self, kind: PrincipalKind, state: &str) -> Result<Url>;

    /// Trade an authorization code for an identity assertion.
    async fn exchange(
        &self,
        kind: PrincipalKind,
        code: &str,
    ) -> Result<IdentityAssertion, IdentityError>;
}

#[derive(Clone)]
pub struct GoogleConfig {
    client_id: String,
    client_secret: SecretString,
    redirect_base_url: String,
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("redirect_base_url", &self.redirect_base_url)
            .finish()
    }
}

impl GoogleConfig {
    #[must_use]
    pub fn new(client_id: String, client_secret: SecretString, redirect_base_url: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_base_url,
        }
    }

    /// Callback registered with Google for each principal kind.
    #[must_use]
    pub fn redirect_uri(&self, kind: PrincipalKind) -> String {
        let base = self.redirect_base_url.trim_end_matches('/');
        format!("{base}/api/v1/{}s/auth/google/callback", kind.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleProfile {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
}

impl From<GoogleProfile> for IdentityAssertion {
    /// Unverified emails are dropped so they cannot claim an existing account.
    fn from(profile: GoogleProfile) -> Self {
        Self {
            email: profile.email.filter(|_| profile.email_verified),
            external_id: profile.sub,
            display_name: profile.name,
        }
    }
}

#[derive(Debug)]
pub struct GoogleIdentityProvider {
    config: GoogleConfig,
    client: Client,
}

impl GoogleIdentityProvider {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: GoogleConfig) -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("Failed to build Google HTTP client")?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn authorize_url(&self, kind: PrincipalKind, state: &str) -> Result<Url> {
        let redirect_uri = self.config.redirect_uri(kind);
        Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("state", state),
            ],
        )
        .context("Failed to build Google authorization URL")
    }

    #[instrument(skip_all, fields(kind = %kind))]
    async fn exchange(
        &self,
        kind: PrincipalKind,
        code: &str,
    ) -> Result<IdentityAssertion, IdentityError> {
        let redirect_uri = self.config.redirect_uri(kind);
        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.expose_secret()),
                ("redirect_uri", redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|err| IdentityError::Unavailable(err.into()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                let body = response.text().await.unwrap_or_default();
                debug!("Google token endpoint refused the code: {body}");
                return Err(IdentityError::Rejected(body));
            }
            status => {
                return Err(IdentityError::Unavailable(anyhow::anyhow!(
                    "token endpoint returned {status}"
                )));
            }
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| IdentityError::Unavailable(err.into()))?;

        let profile: GoogleProfile = self
            .client
            .get(USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| IdentityError::Unavailable(err.into()))?
            .json()
            .await
            .map_err(|err| IdentityError::Unavailable(err.into()))?;

        Ok(profile.into())
    }
}
