//! Handlebars rendering of loaded templates.

use chrono::{DateTime, TimeZone, Utc};
use handlebars::{
    Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderErrorReason,
};
use serde_json::Value;
use tracing::debug;

use super::registry::LoadedTemplate;
use crate::error::{MailerError, MailerResult};

/// Renders loaded templates into HTML.
///
/// The payload is not validated. Declared defaults fill in whatever it
/// leaves out; everything else is up to the template.
pub struct Renderer {
    handlebars: Handlebars<'static>,
}

impl Renderer {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.register_helper("utc_date", Box::new(utc_date_helper));
        handlebars.register_helper("join", Box::new(join_helper));
        Self { handlebars }
    }

    /// Renders `template` with `data` layered over its declared defaults.
    pub fn render(&self, template: &LoadedTemplate, data: &Value) -> MailerResult<String> {
        let context = with_defaults(template, data);

        debug!(template = %template.name, "Rendering email template");

        self.handlebars
            .render_template(&template.body, &context)
            .map_err(|mut e| {
                // render_template compiles the body unnamed
                e.template_name.get_or_insert_with(|| template.name.clone());
                MailerError::Render {
                    name: template.name.clone(),
                    reason: e.to_string(),
                }
            })
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

fn with_defaults(template: &LoadedTemplate, data: &Value) -> Value {
    match data {
        Value::Object(fields) => {
            let mut merged = template.defaults.clone();
            for (key, value) in fields {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        Value::Null => Value::Object(template.defaults.clone()),
        other => other.clone(),
    }
}

/// Formats a timestamp as an RFC 1123 UTC date, e.g. `Tue, 15 Oct 2024 10:00:00 GMT`.
///
/// Accepts RFC 3339 strings or epoch milliseconds.
fn format_utc(value: &Value) -> Option<String> {
    let at: DateTime<Utc> = match value {
        Value::String(text) => DateTime::parse_from_rfc3339(text.trim())
            .ok()?
            .with_timezone(&Utc),
        Value::Number(millis) => Utc.timestamp_millis_opt(millis.as_i64()?).single()?,
        _ => return None,
    };
    Some(at.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}

fn utc_date_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let param = h
        .param(0)
        .ok_or(RenderErrorReason::ParamNotFoundForIndex("utc_date", 0))?;

    let formatted = format_utc(param.value()).ok_or_else(|| {
        RenderErrorReason::Other(format!(
            "utc_date expects an RFC 3339 string or epoch milliseconds, got {}",
            param.value()
        ))
    })?;

    out.write(&formatted)?;
    Ok(())
}

/// `{{join items ", "}}`. Non-string items are written as JSON.
fn join_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let items = h
        .param(0)
        .ok_or(RenderErrorReason::ParamNotFoundForIndex("join", 0))?
        .value();
    let separator = h
        .param(1)
        .and_then(|p| p.value().as_str())
        .unwrap_or(", ");

    let Value::Array(items) = items else {
        return Err(RenderErrorReason::Other(format!("join expects an array, got {}", items)).into());
    };

    let joined = items
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(separator);

    out.write(&handlebars::html_escape(&joined))?;
    Ok(())
}
