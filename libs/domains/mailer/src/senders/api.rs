//! Transactional-email API delivery (Resend-compatible).

use super::{EmailSender, OutgoingEmail, SenderKind};
use crate::error::{MailerError, MailerResult};
use crate::models::SendOutcome;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info};

pub const DEFAULT_API_URL: &str = "https://api.resend.com";

#[derive(Clone)]
pub struct ApiSettings {
    pub api_key: String,
    /// Base URL without a trailing slash.
    pub base_url: String,
    pub from: String,
}

impl ApiSettings {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_URL.to_string(),
            from: from.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiSettings")
            .field("api_key", &"[redacted]")
            .field("base_url", &self.base_url)
            .field("from", &self.from)
            .finish()
    }
}

pub struct ApiSender {
    settings: ApiSettings,
    client: Client,
}

impl ApiSender {
    pub fn new(settings: ApiSettings) -> Self {
        Self {
            settings,
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url, path)
    }
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)] // statusCode is only logged through Debug
struct ApiErrorBody {
    status_code: Option<u16>,
    message: String,
    name: Option<String>,
}

#[async_trait]
impl EmailSender for ApiSender {
    async fn send(&self, email: &OutgoingEmail) -> MailerResult<SendOutcome> {
        let request = SendEmailRequest {
            from: &self.settings.from,
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
            text: email.text.as_deref(),
        };

        debug!(
            recipients = email.to.len(),
            subject = %email.subject,
            "Sending email via API"
        );

        let response = self
            .client
            .post(self.url("emails"))
            .bearer_auth(&self.settings.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let id = serde_json::from_str::<SendEmailResponse>(&body)
                .ok()
                .and_then(|parsed| parsed.id);
            info!(message_id = ?id, "Email sent via API");
            return Ok(SendOutcome::delivered(id));
        }

        error!(status = %status, body = %body, "Email API rejected the email");

        let outcome = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(api_error) => {
                let detail = api_error
                    .name
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
                SendOutcome::rejected(api_error.message, detail)
            }
            Err(_) => SendOutcome::rejected(
                "Failed to send email",
                format!("HTTP {}: {}", status.as_u16(), body),
            ),
        };
        Ok(outcome)
    }

    fn kind(&self) -> SenderKind {
        SenderKind::Api
    }

    async fn verify(&self) -> MailerResult<()> {
        if self.settings.api_key.trim().is_empty() {
            return Err(MailerError::Configuration("EMAIL_API_KEY is empty".into()));
        }

        let response = self
            .client
            .get(self.url("domains"))
            .bearer_auth(&self.settings.api_key)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(MailerError::Provider(format!(
                "Email API rejected the API key (HTTP {})",
                status.as_u16()
            )));
        }
        Ok(())
    }
}
