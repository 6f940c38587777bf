//! Delivery strategies.
//!
//! Exactly one [`EmailSender`] is active per process. It is chosen once at
//! startup by [`crate::factory::create_sender`] and shared behind an `Arc`.

mod api;
mod smtp;

pub use api::{ApiSender, ApiSettings, DEFAULT_API_URL};
pub use smtp::{SmtpEnv, SmtpSender, SmtpSettings};

use crate::error::MailerResult;
use crate::models::SendOutcome;
use async_trait::async_trait;
use std::fmt;

/// Which transport an [`EmailSender`] uses. For logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderKind {
    Smtp,
    Api,
}

impl SenderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderKind::Smtp => "SMTP",
            SenderKind::Api => "API",
        }
    }
}

impl fmt::Display for SenderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// All recipients of a single provider call.
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    /// Plaintext alternative, sent alongside the HTML when present.
    pub text: Option<String>,
}

/// Delivers rendered email.
///
/// Provider-level failures come back as `Ok` with `success: false`.
/// `Err` means the call could not be made at all.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> MailerResult<SendOutcome>;

    fn kind(&self) -> SenderKind;

    /// Best-effort connectivity/configuration check.
    async fn verify(&self) -> MailerResult<()>;
}
