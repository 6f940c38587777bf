//! Data models for the mailer domain.

use crate::error::{MailerError, MailerResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Send request
// ============================================================================

/// Reference to a template plus the payload to render it with.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRef {
    pub name: String,
    /// Untrusted payload, applied as-is. Absent or null becomes `{}`.
    pub data: Value,
}

/// A validated `POST /send` body.
#[derive(Debug, Clone, PartialEq)]
pub struct SendRequest {
    /// Never empty.
    pub recipients: Vec<String>,
    pub subject: String,
    pub template: TemplateRef,
    /// Optional plaintext alternative sent alongside the HTML.
    pub text: Option<String>,
}

impl SendRequest {
    /// Parses and validates a raw request body.
    ///
    /// Checks run in a fixed order and stop at the first failure:
    /// body, `subject`, `template.name`, `to`.
    pub fn from_slice(body: &[u8]) -> MailerResult<Self> {
        let body: Value = serde_json::from_slice(body)
            .map_err(|_| MailerError::BadRequest("Request body is missing or invalid.".into()))?;
        let Value::Object(fields) = body else {
            return Err(MailerError::BadRequest(
                "Request body is missing or invalid.".into(),
            ));
        };

        let subject = match fields.get("subject") {
            Some(Value::String(subject)) if !subject.trim().is_empty() => subject.clone(),
            _ => {
                return Err(MailerError::BadRequest(
                    "\"subject\" must be a non-empty string.".into(),
                ));
            }
        };

        let template = parse_template_ref(fields.get("template"))?;
        let recipients = normalize_recipients(fields.get("to"))?;
        let text = fields
            .get("text")
            .and_then(Value::as_str)
            .filter(|text| !text.trim().is_empty())
            .map(str::to_string);

        Ok(Self {
            recipients,
            subject,
            template,
            text,
        })
    }
}

fn parse_template_ref(value: Option<&Value>) -> MailerResult<TemplateRef> {
    let invalid = || MailerError::BadRequest("\"template.name\" must be a non-empty string.".into());

    let template = value.and_then(Value::as_object).ok_or_else(invalid)?;
    let name = template
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(invalid)?;

    let data = match template.get("data") {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(data) => data.clone(),
    };

    Ok(TemplateRef {
        name: name.to_string(),
        data,
    })
}

/// Accepts `"a@x.com"` or `["a@x.com", ...]`. Blank entries are dropped.
fn normalize_recipients(value: Option<&Value>) -> MailerResult<Vec<String>> {
    let recipients: Vec<String> = match value {
        Some(Value::String(address)) => vec![address.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    MailerError::BadRequest("\"to\" must contain only strings.".into())
                })
            })
            .collect::<MailerResult<_>>()?,
        _ => {
            return Err(MailerError::BadRequest(
                "\"to\" must be a string or an array of strings.".into(),
            ));
        }
    };

    let recipients: Vec<String> = recipients
        .into_iter()
        .map(|address| address.trim().to_string())
        .filter(|address| !address.is_empty())
        .collect();

    if recipients.is_empty() {
        return Err(MailerError::BadRequest(
            "\"to\" must contain at least one recipient.".into(),
        ));
    }

    Ok(recipients)
}

// ============================================================================
// Outcomes and responses
// ============================================================================

/// Result of one provider call. Never partially successful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    pub success: bool,
    /// Provider-assigned message id.
    pub id: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl SendOutcome {
    pub fn delivered(id: Option<String>) -> Self {
        Self {
            success: true,
            id,
            message: None,
            error: None,
        }
    }

    pub fn rejected(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            id: None,
            message: Some(message.into()),
            error: Some(error.into()),
        }
    }
}

/// Body of a successful `POST /send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl SendResponse {
    pub fn sent(id: Option<String>) -> Self {
        Self {
            status: "Email sent".to_string(),
            id,
        }
    }
}

// ============================================================================
// Template discovery
// ============================================================================

/// A declared input field as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropInfo {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
}

/// Discovery metadata for one template. Not used for validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub props: Option<Vec<PropInfo>>,
}
