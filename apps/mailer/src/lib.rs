//! Mailer Service
//!
//! HTTP front end for the mailer domain.
//!
//! ## Architecture
//!
//! ```text
//! POST /send ─┐
//!             ├─ x-api-key check (when API_KEY is set)
//! GET /templates ┘
//!   ↓
//! MailerService
//!   ↓ (resolves + renders)
//! TemplateRegistry / Renderer (Handlebars)
//!   ↓ (delivers)
//! EmailSender (SMTP in development, transactional API elsewhere)
//! ```
//!
//! `GET /health` is always served without the shared secret.

pub mod config;

use axum::{Router, middleware};
use axum_helpers::{
    SharedSecret, create_app, health_router, require_api_key, with_common_layers,
};
use core_config::AppInfo;
use domain_mailer::{
    MailerService, Renderer, SenderSettings, SenderState, TemplateRegistry, create_sender,
    handlers, spawn_verification,
};
use eyre::{Result, WrapErr};
use tracing::{info, warn};

use config::Config;

/// Assembles the full router: domain routes (behind the shared secret when
/// one is configured), the health endpoint, and the common layers.
pub fn build_router(
    service: MailerService,
    app_info: AppInfo,
    api_key: Option<SharedSecret>,
) -> Router {
    let mut api = handlers::router(service);

    match api_key {
        Some(secret) => {
            api = api.layer(middleware::from_fn_with_state(secret, require_api_key));
        }
        None => warn!("API_KEY is not set; /send and /templates accept unauthenticated requests"),
    }

    with_common_layers(api.merge(health_router(app_info)))
}

/// Loads the templates root, falling back to an empty registry.
///
/// A missing directory should not keep the health endpoint down; sends
/// will answer 404 and listing will report the read failure.
async fn load_registry(config: &Config) -> TemplateRegistry {
    match TemplateRegistry::scan(&config.templates_dir).await {
        Ok(registry) => registry,
        Err(e) => {
            warn!(
                dir = %config.templates_dir.display(),
                error = %e,
                "Could not scan templates directory, starting with no templates"
            );
            TemplateRegistry::new(&config.templates_dir)
        }
    }
}

/// Run the mailer service
///
/// 1. Loads configuration and sets up env-aware logging
/// 2. Registers the templates found in `TEMPLATES_DIR`
/// 3. Builds the one email sender for this environment
/// 4. Serves HTTP until SIGINT/SIGTERM
///
/// # Errors
///
/// Returns an error if the base configuration is invalid or the server
/// cannot bind. A sender that fails to build only disables sending.
pub async fn run() -> Result<()> {
    let config = Config::from_env().wrap_err("Failed to load configuration")?;

    // Initialize tracing (env-aware: JSON for prod, pretty for dev)
    core_config::tracing::init_tracing(&config.environment);

    info!(
        name = %config.app.name,
        version = %config.app.version,
        environment = %config.environment,
        "Starting mailer service"
    );

    let registry = load_registry(&config).await;

    let sender = SenderState::from_result(create_sender(
        config.environment,
        &SenderSettings::from_env(),
    ));
    if let SenderState::Ready(sender) = &sender {
        spawn_verification(sender.clone());
    }

    let service = MailerService::new(registry, Renderer::new(), sender);
    let router = build_router(service, config.app, config.api_key.clone());

    create_app(router, &config.server)
        .await
        .wrap_err("Mailer server failed")?;

    info!("Mailer service stopped");
    Ok(())
}
