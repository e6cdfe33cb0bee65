use anyhow::{Result, bail};
use clap::{Arg, ArgMatches, Command};

pub const ARG_GOOGLE_CLIENT_ID: &str = "google-client-id";
pub const ARG_GOOGLE_CLIENT_SECRET: &str = "google-client-secret";
pub const ARG_GOOGLE_REDIRECT_BASE_URL: &str = "google-redirect-base-url";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_ID)
                .long(ARG_GOOGLE_CLIENT_ID)
                .help("Google OAuth client id; enables the *-google strategies")
                .env("PORTICO_GOOGLE_CLIENT_ID"),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_SECRET)
                .long(ARG_GOOGLE_CLIENT_SECRET)
                .help("Google OAuth client secret")
                .env("PORTICO_GOOGLE_CLIENT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_GOOGLE_REDIRECT_BASE_URL)
                .long(ARG_GOOGLE_REDIRECT_BASE_URL)
                .help("Public base URL Google redirects back to, example: https://api.example.com")
                .env("PORTICO_GOOGLE_REDIRECT_BASE_URL"),
        )
}

#[derive(Debug)]
pub struct Options {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_base_url: String,
}

impl Options {
    /// `None` when Google sign-in is not configured at all.
    ///
    /// # Errors
    /// Returns an error when only some of the Google arguments are set.
    pub fn parse(matches: &ArgMatches) -> Result<Option<Self>> {
        let get = |id: &str| matches.get_one::<String>(id).cloned();
        match (
            get(ARG_GOOGLE_CLIENT_ID),
            get(ARG_GOOGLE_CLIENT_SECRET),
            get(ARG_GOOGLE_REDIRECT_BASE_URL),
        ) {
            (None, None, None) => Ok(None),
            (Some(client_id), Some(client_secret), Some(redirect_base_url)) => Ok(Some(Self {
                client_id,
                client_secret,
                redirect_base_url,
            })),
            _ => bail!(
                "Google sign-in needs --{ARG_GOOGLE_CLIENT_ID}, --{ARG_GOOGLE_CLIENT_SECRET} and --{ARG_GOOGLE_REDIRECT_BASE_URL}"
            ),
        }
    }
}
