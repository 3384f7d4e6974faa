//! Inbound payload decoding.
//!
//! ```text
//! multipart/form-data → text fields → Payload
//! anything else       → JSON object? → yes → Payload
//!                                    → no  → form-urlencoded allowed and valid? → Payload
//!                                                                               → PayloadError
//! ```
//!
//! The urlencoded fallback only applies when the caller sent no Content-Type
//! or `application/x-www-form-urlencoded`.

use axum::extract::Multipart;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// Parsed inbound payload: field name to JSON value.
pub type Payload = Map<String, Value>;

/// Body decoding failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("body is neither JSON ({json}) nor form data ({form})")]
    Undecodable { json: String, form: String },

    #[error("body is not JSON ({json}) and a {kind:?} body has no form fallback")]
    NotJson { json: String, kind: BodyKind },

    #[error("malformed multipart body: {0}")]
    Multipart(String),
}

/// Body shape announced by the Content-Type header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// No Content-Type header
    Unspecified,
    /// `application/x-www-form-urlencoded`
    Urlencoded,
    /// `multipart/form-data`
    Multipart,
    /// Anything else, JSON included
    Other,
}

impl BodyKind {
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(raw) = content_type else {
            return BodyKind::Unspecified;
        };
        let essence = raw.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "" => BodyKind::Unspecified,
            "application/x-www-form-urlencoded" => BodyKind::Urlencoded,
            "multipart/form-data" => BodyKind::Multipart,
            _ => BodyKind::Other,
        }
    }

    fn allows_form_fallback(self) -> bool {
        matches!(self, BodyKind::Unspecified | BodyKind::Urlencoded)
    }
}

/// Decode a non-multipart body, trying JSON first and form data second.
pub fn parse_payload(body: &[u8], kind: BodyKind) -> Result<Payload, PayloadError> {
    let json = match parse_json(body) {
        Ok(payload) => return Ok(payload),
        Err(e) => e,
    };

    if !kind.allows_form_fallback() {
        return Err(PayloadError::NotJson { json, kind });
    }
    debug!(error = %json, "payload_json_failed_trying_form");

    parse_form(body).map_err(|form| PayloadError::Undecodable { json, form })
}

/// Collect the text fields of a multipart body. File parts are skipped.
pub async fn parse_multipart(mut multipart: Multipart) -> Result<Payload, PayloadError> {
    let mut payload = Payload::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PayloadError::Multipart(e.to_string()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            return Err(PayloadError::Multipart("part without a name".to_string()));
        };

        if let Some(file_name) = field.file_name() {
            warn!(field = %name, file_name = %file_name, "multipart_file_part_skipped");
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| PayloadError::Multipart(e.to_string()))?;
        // Repeated names keep the last value.
        payload.insert(name, Value::String(value));
    }

    if payload.is_empty() {
        return Err(PayloadError::Multipart("no text fields".to_string()));
    }

    Ok(payload)
}

fn parse_json(body: &[u8]) -> Result<Payload, String> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected an object, got {}", kind_of(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_form(body: &[u8]) -> Result<Payload, String> {
    let text = std::str::from_utf8(body).map_err(|e| e.to_string())?;
    let text = text.trim();
    if text.is_empty() {
        return Err("empty body".to_string());
    }

    for segment in text.split('&').filter(|s| !s.is_empty()) {
        match segment.split_once('=') {
            Some((key, _)) if !key.is_empty() => {}
            _ => return Err(format!("malformed pair {segment:?}")),
        }
    }

    // Repeated keys keep the last value.
    let payload = url::form_urlencoded::parse(text.as_bytes())
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect();
    Ok(payload)
}

/// Flatten a payload into form pairs for an outbound form-encoded body.
///
/// Strings pass through unchanged, other values are rendered as JSON text.
pub fn to_form_pairs(payload: &Payload) -> Vec<(String, String)> {
    payload
        .iter()
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
