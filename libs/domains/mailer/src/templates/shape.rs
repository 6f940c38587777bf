//! Best-effort extraction of a template's declared input shape.
//!
//! Templates open with a Handlebars comment declaring their props:
//!
//! ```text
//! {{!--
//! props OtpEmailProps = {
//!   fullName: string = "User Member";
//!   otpCode: string = "000000";
//!   expirationUtc?: datetime;
//! }
//! --}}
//! ```
//!
//! This is a textual heuristic, not a parser. Anything it cannot make sense
//! of is skipped rather than reported.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::models::PropInfo;

static SHAPE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\b(?:props|type|interface)\s+[A-Za-z_$][\w$]*\s*=?\s*\{(.*?)\}")
        .expect("shape block pattern is valid")
});

/// One field of a declared input shape.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredField {
    pub name: String,
    pub type_hint: Option<String>,
    /// Value used when the payload omits this field.
    pub default: Option<Value>,
}

impl DeclaredField {
    pub fn to_prop_info(&self) -> PropInfo {
        PropInfo {
            name: self.name.clone(),
            type_hint: self.type_hint.clone(),
        }
    }
}

/// Pulls declared fields out of a template source.
///
/// `None` means no declaration was found; a declaration with no usable
/// fields yields `Some(vec![])`.
pub trait ShapeExtractor: Send + Sync {
    fn extract(&self, source: &str) -> Option<Vec<DeclaredField>>;
}

/// Reads the `props Name = { ... }` block inside the leading comment.
#[derive(Debug, Default, Clone, Copy)]
pub struct PropsBlockExtractor;

impl ShapeExtractor for PropsBlockExtractor {
    fn extract(&self, source: &str) -> Option<Vec<DeclaredField>> {
        let (header, _) = split_declaration(source);
        let block = SHAPE_BLOCK.captures(header?)?.get(1)?.as_str();

        let mut fields: Vec<DeclaredField> = Vec::new();
        for field in block.split([';', '\n']).filter_map(parse_field) {
            if !fields.iter().any(|f| f.name == field.name) {
                fields.push(field);
            }
        }
        Some(fields)
    }
}

/// Splits a template source into its leading comment (if any) and the body.
///
/// Only `{{!-- ... --}}` and `{{! ... }}` comments at the very start count.
/// An unterminated comment is left in the body for the compiler to reject.
pub fn split_declaration(source: &str) -> (Option<&str>, &str) {
    let trimmed = source.trim_start();

    if let Some(rest) = trimmed.strip_prefix("{{!--") {
        if let Some(end) = rest.find("--}}") {
            return (Some(&rest[..end]), &rest[end + 4..]);
        }
    } else if let Some(rest) = trimmed.strip_prefix("{{!") {
        if let Some(end) = rest.find("}}") {
            return (Some(&rest[..end]), &rest[end + 2..]);
        }
    }

    (None, source)
}

fn parse_field(segment: &str) -> Option<DeclaredField> {
    let segment = segment.trim();
    if segment.is_empty() || segment.starts_with("//") {
        return None;
    }

    let (raw_name, rest) = match segment.split_once(':') {
        Some((name, rest)) => (name, Some(rest)),
        None => (segment, None),
    };

    let name = raw_name.trim().trim_end_matches('?').trim();
    if !is_identifier(name) {
        return None;
    }

    let (type_hint, default) = match rest {
        Some(rest) => match rest.split_once('=') {
            Some((ty, default)) => (clean_type(ty), parse_default(default)),
            None => (clean_type(rest), None),
        },
        None => (None, None),
    };

    Some(DeclaredField {
        name: name.to_string(),
        type_hint,
        default,
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn clean_type(raw: &str) -> Option<String> {
    let ty = raw.trim().replace('?', "");
    let ty = ty.trim();
    (!ty.is_empty()).then(|| ty.to_string())
}

/// JSON literals are taken as-is, single-quoted text as a string, anything
/// else verbatim as a string.
fn parse_default(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return Some(value);
    }
    let unquoted = raw
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(raw);
    Some(Value::String(unquoted.to_string()))
}
