//! Mailer Domain
//!
//! Renders named Handlebars templates and delivers them through the one
//! sender chosen at startup.
//!
//! # Architecture
//!
//! ```text
//! POST /send ──► MailerService ──► TemplateRegistry ──► Renderer ──► EmailSender
//!                                                                   ├─ SmtpSender (development)
//!                                                                   └─ ApiSender  (everything else)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_mailer::{
//!     MailerService, Renderer, SenderSettings, SenderState, TemplateRegistry, create_sender, handlers,
//! };
//!
//! let registry = TemplateRegistry::scan("templates").await?;
//! let sender = SenderState::from_result(create_sender(environment, &SenderSettings::from_env()));
//! let router = handlers::router(MailerService::new(registry, Renderer::new(), sender));
//! ```

pub mod error;
pub mod factory;
pub mod handlers;
pub mod models;
pub mod senders;
pub mod service;
pub mod templates;

pub use error::{MailerError, MailerResult};
pub use factory::{SenderSettings, create_sender, spawn_verification};
pub use models::{PropInfo, SendOutcome, SendRequest, SendResponse, TemplateDescriptor, TemplateRef};
pub use senders::{
    ApiSender, ApiSettings, EmailSender, OutgoingEmail, SenderKind, SmtpEnv, SmtpSender,
    SmtpSettings,
};
pub use service::{MailerService, SenderState};
pub use templates::{
    DeclaredField, LoadedTemplate, PropsBlockExtractor, Renderer, ShapeExtractor, TemplateRegistry,
    TemplateSource,
};
