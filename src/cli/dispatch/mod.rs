//! Maps validated CLI arguments to the action to run.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{auth, google};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches.get_one::<String>("dsn").cloned();
    let frontend_base_url = matches.get_one::<String>("frontend-base-url").cloned();

    let auth_opts = auth::Options::parse(matches)?;
    let google_opts = google::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        frontend_base_url,
        jwt_secret: auth_opts.jwt_secret,
        token_ttl_seconds: auth_opts.token_ttl_seconds,
        otp_ttl_seconds: auth_opts.otp_ttl_seconds,
        hash_work_factor: auth_opts.hash_work_factor,
        production: auth_opts.production,
        google: google_opts,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn server_action_from_env() {
        temp_env::with_vars(
            [
                ("PORTICO_JWT_SECRET", Some("jwt-secret")),
                ("PORTICO_PORT", Some("9090")),
                ("PORTICO_DSN", None),
                ("PORTICO_FRONTEND_BASE_URL", Some("https://shop.example.com")),
                ("PORTICO_OTP_TTL_SECONDS", Some("120")),
                ("PORTICO_GOOGLE_CLIENT_ID", None),
                ("PORTICO_GOOGLE_CLIENT_SECRET", None),
                ("PORTICO_GOOGLE_REDIRECT_BASE_URL", None),
            ],
            || {
                let matches = commands::new().get_matches_from(vec!["portico"]);
                let action = handler(&matches);
                assert!(action.is_ok());
                if let Ok(Action::Server(args)) = action {
                    assert_eq!(args.port, 9090);
                    assert_eq!(args.dsn, None);
                    assert_eq!(
                        args.frontend_base_url.as_deref(),
                        Some("https://shop.example.com")
                    );
                    assert_eq!(args.otp_ttl_seconds, 120);
                    assert!(args.google.is_none());
                }
            },
        );
    }

    #[test]
    fn partial_google_config_rejected() {
        temp_env::with_vars(
            [
                ("PORTICO_JWT_SECRET", Some("jwt-secret")),
                ("PORTICO_GOOGLE_CLIENT_ID", None),
                ("PORTICO_GOOGLE_CLIENT_SECRET", Some("secret")),
                ("PORTICO_GOOGLE_REDIRECT_BASE_URL", None),
            ],
            || {
                let matches = commands::new().get_matches_from(vec!["portico"]);
                assert!(handler(&matches).is_err());
            },
        );
    }
}
