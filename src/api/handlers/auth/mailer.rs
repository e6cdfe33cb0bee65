//! Passcode delivery.
//!
//! Delivery failures are logged by the caller and never fail the sign-in step,
//! so the response does not reveal whether a mailbox exists or works.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::{info, trace};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtpMessage {
    pub to_email: String,
    pub display_name: String,
    pub code: String,
    pub expires_at: i64,
}

#[async_trait]
pub trait OtpMailer: Send + Sync + std::fmt::Debug {
    async fn send(&self, message: &OtpMessage) -> Result<()>;
}

/// Local dev mailer that logs instead of sending real email.
#[derive(Clone, Debug, Default)]
pub struct LogOtpMailer;

#[async_trait]
impl OtpMailer for LogOtpMailer {
    async fn send(&self, message: &OtpMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            expires_at = message.expires_at,
            "otp mail send stub"
        );
        trace!(code = %message.code, "otp mail payload");
        Ok(())
    }
}

/// Keeps sent messages in memory so callers can read the codes back.
#[derive(Debug, Default)]
pub struct MemoryOtpMailer {
    sent: Mutex<Vec<OtpMessage>>,
}

impl MemoryOtpMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent code sent to `email`.
    #[must_use]
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        let sent = self.sent.lock().ok()?;
        sent.iter()
            .rev()
            .find(|message| message.to_email == email)
            .map(|message| message.code.clone())
    }

    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or_default()
    }
}

#[async_trait]
impl OtpMailer for MemoryOtpMailer {
    async fn send(&self, message: &OtpMessage) -> Result<()> {
        self.sent
            .lock()
            .map_err(|_| anyhow!("otp mailbox lock poisoned"))?
            .push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(email: &str, code: &str) -> OtpMessage {
        OtpMessage {
            to_email: email.to_string(),
            display_name: "Corner Shop".to_string(),
            code: code.to_string(),
            expires_at: 0,
        }
    }

    #[tokio::test]
    async fn memory_mailer_returns_latest_code() -> Result<()> {
        let mailer = MemoryOtpMailer::new();
        mailer.send(&message("c@x.com", "111111")).await?;
        mailer.send(&message("d@x.com", "222222")).await?;
        mailer.send(&message("c@x.com", "333333")).await?;

        assert_eq!(mailer.last_code_for("c@x.com").as_deref(), Some("333333"));
        assert_eq!(mailer.last_code_for("nobody@x.com"), None);
        assert_eq!(mailer.sent_count(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn log_mailer_never_fails() -> Result<()> {
        LogOtpMailer.send(&message("c@x.com", "123456")).await
    }
}
