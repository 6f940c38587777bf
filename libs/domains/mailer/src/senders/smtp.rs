//! SMTP delivery using lettre's pooled async transport.
//!
//! Intended for development against Mailpit/MailHog or a relay such as
//! Gmail. Every call submits one message addressed to all recipients.

use super::{EmailSender, OutgoingEmail, SenderKind};
use crate::error::{MailerError, MailerResult};
use crate::models::SendOutcome;
use async_trait::async_trait;
use core_config::{env_optional, parse_flag};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
};
use std::fmt;
use tracing::{debug, error, info};

/// SMTP variables exactly as found in the environment.
///
/// `prefix` is prepended to every key: `DEV_` reads `DEV_EMAIL_HOST` and
/// friends, an empty prefix reads the production-scoped `EMAIL_HOST` set.
#[derive(Clone, Default)]
pub struct SmtpEnv {
    pub prefix: &'static str,
    pub host: Option<String>,
    pub port: Option<String>,
    pub secure: Option<String>,
    pub user: Option<String>,
    pub pass: Option<String>,
}

impl SmtpEnv {
    pub fn read(prefix: &'static str) -> Self {
        let var = |name: &str| env_optional(&format!("{}EMAIL_{}", prefix, name));
        Self {
            prefix,
            host: var("HOST"),
            port: var("PORT"),
            secure: var("SECURE"),
            user: var("USER"),
            pass: var("PASS"),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}EMAIL_{}", self.prefix, name)
    }
}

impl fmt::Debug for SmtpEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpEnv")
            .field("prefix", &self.prefix)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Validated SMTP configuration.
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    /// Implicit TLS from the first byte (port 465 style).
    pub secure: bool,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub from: String,
}

impl SmtpSettings {
    /// Host and port are required. Credentials are kept only when both
    /// user and pass are present.
    pub fn from_env_vars(vars: &SmtpEnv, from: impl Into<String>) -> MailerResult<Self> {
        let host = vars.host.clone().ok_or_else(|| {
            MailerError::Configuration(format!("{} is not set", vars.key("HOST")))
        })?;
        let raw_port = vars.port.as_deref().ok_or_else(|| {
            MailerError::Configuration(format!("{} is not set", vars.key("PORT")))
        })?;
        let port = raw_port.parse::<u16>().map_err(|e| {
            MailerError::Configuration(format!(
                "{} must be a port number, got '{}': {}",
                vars.key("PORT"),
                raw_port,
                e
            ))
        })?;

        let (user, pass) = match (&vars.user, &vars.pass) {
            (Some(user), Some(pass)) => (Some(user.clone()), Some(pass.clone())),
            _ => (None, None),
        };

        Ok(Self {
            host,
            port,
            secure: vars.secure.as_deref().is_some_and(parse_flag),
            user,
            pass,
            from: from.into(),
        })
    }

    /// Reads `{prefix}EMAIL_*` straight from the environment.
    pub fn from_env(prefix: &'static str, from: impl Into<String>) -> MailerResult<Self> {
        Self::from_env_vars(&SmtpEnv::read(prefix), from)
    }

    fn credentials(&self) -> Option<Credentials> {
        match (&self.user, &self.pass) {
            (Some(user), Some(pass)) => Some(Credentials::new(user.clone(), pass.clone())),
            _ => None,
        }
    }
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "[redacted]"))
            .field("from", &self.from)
            .finish()
    }
}

pub struct SmtpSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    host: String,
    port: u16,
}

impl SmtpSender {
    /// Builds the pooled transport. Nothing is sent over the network here.
    pub fn new(settings: SmtpSettings) -> MailerResult<Self> {
        let from: Mailbox = settings.from.parse().map_err(|e| {
            MailerError::Configuration(format!("EMAIL_FROM is not a valid address: {}", e))
        })?;
        let transport = Self::build_transport(&settings)?;

        Ok(Self {
            transport,
            from,
            host: settings.host,
            port: settings.port,
        })
    }

    fn build_transport(settings: &SmtpSettings) -> MailerResult<AsyncSmtpTransport<Tokio1Executor>> {
        let mut builder = if settings.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .map_err(|e| MailerError::Configuration(format!("Failed to create SMTP relay: {}", e)))?
                .port(settings.port)
        } else {
            // STARTTLS when the server offers it, plaintext otherwise
            let tls = TlsParameters::new(settings.host.clone())
                .map_err(|e| MailerError::Configuration(format!("Invalid SMTP TLS parameters: {}", e)))?;
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
                .port(settings.port)
                .tls(Tls::Opportunistic(tls))
        };

        if let Some(credentials) = settings.credentials() {
            builder = builder.credentials(credentials);
        }

        Ok(builder.build())
    }

    /// Returns `Ok(Err(outcome))` for addresses the provider would reject.
    fn build_message(&self, email: &OutgoingEmail) -> MailerResult<Result<Message, SendOutcome>> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(&email.subject)
            .message_id(None);

        for address in &email.to {
            match address.parse::<Mailbox>() {
                Ok(mailbox) => builder = builder.to(mailbox),
                Err(e) => {
                    return Ok(Err(SendOutcome::rejected(
                        format!("Invalid recipient address \"{}\"", address),
                        e.to_string(),
                    )));
                }
            }
        }

        let html = SinglePart::builder()
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone());

        let message = match &email.text {
            Some(text) => builder.multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text.clone()),
                    )
                    .singlepart(html),
            ),
            None => builder.singlepart(html),
        }
        .map_err(|e| MailerError::Unexpected(format!("Failed to build email message: {}", e)))?;

        Ok(Ok(message))
    }
}

#[async_trait]
impl EmailSender for SmtpSender {
    async fn send(&self, email: &OutgoingEmail) -> MailerResult<SendOutcome> {
        debug!(
            recipients = email.to.len(),
            subject = %email.subject,
            host = %self.host,
            port = self.port,
            "Sending email via SMTP"
        );

        let message = match self.build_message(email)? {
            Ok(message) => message,
            Err(rejected) => return Ok(rejected),
        };

        let message_id = message
            .headers()
            .get_raw("Message-ID")
            .map(|id| id.to_string());

        match self.transport.send(message).await {
            Ok(_) => {
                info!(message_id = ?message_id, "Email sent via SMTP");
                Ok(SendOutcome::delivered(message_id))
            }
            Err(e) => {
                error!(host = %self.host, error = %e, "SMTP server rejected the email");
                Ok(SendOutcome::rejected("Failed to send email", e.to_string()))
            }
        }
    }

    fn kind(&self) -> SenderKind {
        SenderKind::Smtp
    }

    async fn verify(&self) -> MailerResult<()> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MailerError::Provider(format!(
                "SMTP server {}:{} did not accept the connection",
                self.host, self.port
            ))),
            Err(e) => Err(MailerError::Provider(format!("SMTP check failed: {}", e))),
        }
    }
}
