use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    routing::{get, post},
};
use std::sync::Arc;

use crate::error::MailerResult;
use crate::models::{SendResponse, TemplateDescriptor};
use crate::service::MailerService;

/// Send an email rendered from a named template.
///
/// The body is taken raw so malformed JSON is answered with the domain's
/// own 400 message rather than axum's rejection text.
pub async fn send_email(
    State(service): State<Arc<MailerService>>,
    body: Bytes,
) -> MailerResult<Json<SendResponse>> {
    let response = service.send(&body).await?;
    Ok(Json(response))
}

/// List templates with their declared props
pub async fn list_templates(
    State(service): State<Arc<MailerService>>,
) -> MailerResult<Json<Vec<TemplateDescriptor>>> {
    let templates = service.list_templates().await?;
    Ok(Json(templates))
}

/// `POST /send` and `GET /templates`
pub fn router(service: MailerService) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/send", post(send_email))
        .route("/templates", get(list_templates))
        .with_state(shared_service)
}
