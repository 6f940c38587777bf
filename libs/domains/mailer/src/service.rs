use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{MailerError, MailerResult};
use crate::models::{SendRequest, SendResponse, TemplateDescriptor};
use crate::senders::{EmailSender, OutgoingEmail, SenderKind};
use crate::templates::{Renderer, TemplateRegistry};

/// The sender chosen at startup, or why there is none.
#[derive(Clone)]
pub enum SenderState {
    Ready(Arc<dyn EmailSender>),
    /// Construction failed; every send fails fast with this reason.
    Unavailable(String),
}

impl SenderState {
    pub fn from_result(result: MailerResult<Arc<dyn EmailSender>>) -> Self {
        match result {
            Ok(sender) => SenderState::Ready(sender),
            Err(e) => {
                warn!(error = %e, "Email sending is disabled");
                SenderState::Unavailable(e.to_string())
            }
        }
    }

    pub fn kind(&self) -> Option<SenderKind> {
        match self {
            SenderState::Ready(sender) => Some(sender.kind()),
            SenderState::Unavailable(_) => None,
        }
    }
}

/// Where a send request currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SendStage {
    Validated,
    TemplateResolved,
    Rendered,
    Sent,
}

/// Validate → resolve → render → send.
#[derive(Clone)]
pub struct MailerService {
    registry: Arc<TemplateRegistry>,
    renderer: Arc<Renderer>,
    sender: SenderState,
}

impl MailerService {
    pub fn new(registry: TemplateRegistry, renderer: Renderer, sender: SenderState) -> Self {
        Self {
            registry: Arc::new(registry),
            renderer: Arc::new(renderer),
            sender,
        }
    }

    pub fn sender_kind(&self) -> Option<SenderKind> {
        self.sender.kind()
    }

    /// Handles one raw `POST /send` body.
    ///
    /// A missing sender is reported before the body is even parsed.
    #[instrument(skip_all)]
    pub async fn send(&self, body: &[u8]) -> MailerResult<SendResponse> {
        let sender = match &self.sender {
            SenderState::Ready(sender) => sender,
            SenderState::Unavailable(reason) => {
                return Err(MailerError::Configuration(reason.clone()));
            }
        };

        let request = SendRequest::from_slice(body)?;
        trace_stage(SendStage::Validated, &request.template.name);

        let template = self.registry.resolve(&request.template.name).await?;
        trace_stage(SendStage::TemplateResolved, &template.name);

        let html = self.renderer.render(&template, &request.template.data)?;
        trace_stage(SendStage::Rendered, &template.name);

        let email = OutgoingEmail {
            to: request.recipients,
            subject: request.subject,
            html,
            text: request.text,
        };
        let outcome = sender.send(&email).await?;
        trace_stage(SendStage::Sent, &template.name);

        if !outcome.success {
            return Err(MailerError::Rejected {
                message: outcome
                    .message
                    .unwrap_or_else(|| "Failed to send email".to_string()),
                detail: outcome.error,
            });
        }

        info!(
            template = %template.name,
            recipients = email.to.len(),
            kind = %sender.kind(),
            message_id = ?outcome.id,
            "Email sent"
        );

        Ok(SendResponse::sent(outcome.id))
    }

    #[instrument(skip(self))]
    pub async fn list_templates(&self) -> MailerResult<Vec<TemplateDescriptor>> {
        self.registry.list().await
    }
}

fn trace_stage(stage: SendStage, template: &str) {
    debug!(stage = ?stage, template = %template, "Send request advanced");
}
