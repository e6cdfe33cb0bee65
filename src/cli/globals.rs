use secrecy::SecretString;

/// Secrets shared across the server wiring. `Debug` never prints them.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub jwt_secret: SecretString,
    pub google_client_secret: SecretString,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(jwt_secret: SecretString) -> Self {
        Self {
            jwt_secret,
            google_client_secret: SecretString::default(),
        }
    }

    pub fn set_google_client_secret(&mut self, secret: SecretString) {
        self.google_client_secret = secret;
    }
}
