//! Startup-time choice of the active sender.

use crate::error::{MailerError, MailerResult};
use crate::senders::{
    ApiSender, ApiSettings, DEFAULT_API_URL, EmailSender, SmtpEnv, SmtpSender, SmtpSettings,
};
use core_config::{Environment, env_optional};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything the factory needs, read from the environment in one place.
#[derive(Clone, Default)]
pub struct SenderSettings {
    /// `EMAIL_FROM`
    pub from: Option<String>,
    /// `DEV_EMAIL_*`
    pub dev_smtp: SmtpEnv,
    /// `EMAIL_API_KEY`
    pub api_key: Option<String>,
    /// `EMAIL_API_URL`
    pub api_url: Option<String>,
}

impl SenderSettings {
    pub fn from_env() -> Self {
        Self {
            from: env_optional("EMAIL_FROM"),
            dev_smtp: SmtpEnv::read("DEV_"),
            api_key: env_optional("EMAIL_API_KEY"),
            api_url: env_optional("EMAIL_API_URL"),
        }
    }
}

impl fmt::Debug for SenderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderSettings")
            .field("from", &self.from)
            .field("dev_smtp", &self.dev_smtp)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Builds the one sender this process will use.
///
/// Development gets SMTP from `DEV_EMAIL_*`; every other environment gets
/// the transactional-email API. Nothing touches the network here.
pub fn create_sender(
    environment: Environment,
    settings: &SenderSettings,
) -> MailerResult<Arc<dyn EmailSender>> {
    let from = settings
        .from
        .clone()
        .ok_or_else(|| MailerError::Configuration("EMAIL_FROM is not set".into()))?;

    let sender: Arc<dyn EmailSender> = if environment.is_development() {
        let smtp = SmtpSettings::from_env_vars(&settings.dev_smtp, from)?;
        info!(host = %smtp.host, port = smtp.port, secure = smtp.secure, "Using SMTP email sender");
        Arc::new(SmtpSender::new(smtp)?)
    } else {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| MailerError::Configuration("EMAIL_API_KEY is not set".into()))?;
        let base_url = settings.api_url.as_deref().unwrap_or(DEFAULT_API_URL);
        info!(environment = %environment, base_url = %base_url, "Using API email sender");
        Arc::new(ApiSender::new(
            ApiSettings::new(api_key, from).with_base_url(base_url),
        ))
    };

    Ok(sender)
}

/// Runs `verify()` in the background. Failures are logged, never fatal.
pub fn spawn_verification(sender: Arc<dyn EmailSender>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match sender.verify().await {
            Ok(()) => info!(kind = %sender.kind(), "Email sender verified"),
            Err(e) => warn!(kind = %sender.kind(), error = %e, "Email sender verification failed"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::senders::SenderKind;

    fn dev_smtp() -> SmtpEnv {
        SmtpEnv {
            prefix: "DEV_",
            host: Some("localhost".into()),
            port: Some("1025".into()),
            ..Default::default()
        }
    }

    fn settings() -> SenderSettings {
        SenderSettings {
            from: Some("noreply@example.com".into()),
            dev_smtp: dev_smtp(),
            api_key: Some("re_test".into()),
            api_url: None,
        }
    }

    #[tokio::test]
    async fn test_development_uses_smtp() {
        let sender = create_sender(Environment::Development, &settings()).unwrap();
        assert_eq!(sender.kind(), SenderKind::Smtp);
    }

    #[tokio::test]
    async fn test_other_environments_use_api() {
        for environment in [Environment::Staging, Environment::Production, Environment::Test] {
            let sender = create_sender(environment, &settings()).unwrap();
            assert_eq!(sender.kind(), SenderKind::Api, "for {}", environment);
        }
    }

    #[tokio::test]
    async fn test_missing_from_fails_before_branching() {
        let mut settings = settings();
        settings.from = None;

        for environment in [Environment::Development, Environment::Production] {
            let err = create_sender(environment, &settings).err().unwrap();
            assert!(matches!(err, MailerError::Configuration(msg) if msg.contains("EMAIL_FROM")));
        }
    }

    #[tokio::test]
    async fn test_development_requires_smtp_host() {
        let mut settings = settings();
        settings.dev_smtp.host = None;
        settings.api_key = None;

        let err = create_sender(Environment::Development, &settings).err().unwrap();
        assert!(matches!(err, MailerError::Configuration(msg) if msg.contains("DEV_EMAIL_HOST")));
    }

    #[tokio::test]
    async fn test_production_requires_api_key() {
        let mut settings = settings();
        settings.api_key = None;

        let err = create_sender(Environment::Production, &settings).err().unwrap();
        assert!(matches!(err, MailerError::Configuration(msg) if msg.contains("EMAIL_API_KEY")));
    }

    #[test]
    fn test_settings_from_env() {
        temp_env::with_vars(
            [
                ("EMAIL_FROM", Some("Mailer <noreply@example.com>")),
                ("EMAIL_API_KEY", Some("re_live")),
                ("EMAIL_API_URL", None),
                ("DEV_EMAIL_HOST", Some("mailpit")),
                ("DEV_EMAIL_PORT", Some("1025")),
                ("DEV_EMAIL_USER", Some("  ")),
            ],
            || {
                let settings = SenderSettings::from_env();
                assert_eq!(settings.from.as_deref(), Some("Mailer <noreply@example.com>"));
                assert_eq!(settings.api_key.as_deref(), Some("re_live"));
                assert!(settings.api_url.is_none());
                assert_eq!(settings.dev_smtp.host.as_deref(), Some("mailpit"));
                assert!(settings.dev_smtp.user.is_none());
                assert!(!format!("{:?}", settings).contains("re_live"));
            },
        );
    }

    #[tokio::test]
    async fn test_verification_failure_is_not_fatal() {
        let mut mock = crate::senders::MockEmailSender::new();
        mock.expect_verify()
            .times(1)
            .returning(|| Err(MailerError::Provider("unreachable".into())));
        mock.expect_kind().returning(|| SenderKind::Smtp);

        spawn_verification(Arc::new(mock)).await.unwrap();
    }
}
