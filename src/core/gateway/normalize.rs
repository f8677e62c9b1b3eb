//! Response Normalizer
//!
//! Folds every HTTP outcome into a [`RemoteResult`]:
//!
//! 1. Non-JSON content type: body is read as text. Error statuses become
//!    `"HTTP <status>: <text>"`, anything else is `success` with the text.
//! 2. JSON content type: body is parsed. Error statuses take the body's
//!    `error`, then `message`, then `"HTTP <status>: <statusText>"`.
//! 3. A body that cannot be read or parsed is an error carrying the failure
//!    message (or `"Unknown error occurred"` when there is none).
//!
//! The content-type branch is decided before parsing, so a response that
//! claims JSON and fails to parse still lands in step 3 instead of panicking.

use serde_json::Value;

use super::RemoteResult;

pub const UNKNOWN_ERROR: &str = "Unknown error occurred";

/// Transport-independent view of an HTTP response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub content_type: Option<String>,
    /// Body bytes, or the message of the failure that occurred reading them.
    pub body: Result<Vec<u8>, String>,
}

impl RawResponse {
    pub fn new(status: u16, content_type: Option<&str>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: default_status_text(status),
            content_type: content_type.map(str::to_string),
            body: Ok(body.into()),
        }
    }

    /// JSON response with `application/json` content type.
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, Some("application/json"), body.to_string())
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self::new(status, Some("text/plain"), body)
    }

    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    pub fn with_read_error(mut self, message: impl Into<String>) -> Self {
        self.body = Err(message.into());
        self
    }

    /// Drain a `reqwest` response. Body read failures are captured rather
    /// than returned.
    pub async fn read(response: reqwest::Response) -> Self {
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| e.to_string());

        Self {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            content_type,
            body,
        }
    }

    pub fn is_error_status(&self) -> bool {
        !(200..300).contains(&self.status)
    }

    fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
            .unwrap_or(false)
    }
}

fn default_status_text(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or_default()
        .to_string()
}

/// Normalize a raw response. Never panics, never fails.
pub fn normalize(raw: RawResponse) -> RemoteResult<Value> {
    let status = raw.status;
    let result = if raw.is_json() {
        normalize_json(&raw)
    } else {
        normalize_text(&raw)
    };

    let normalized = match result {
        Ok(normalized) => normalized,
        Err(message) if message.trim().is_empty() => RemoteResult::err(UNKNOWN_ERROR),
        Err(message) => RemoteResult::err(message),
    };
    normalized.with_status(status)
}

fn normalize_text(raw: &RawResponse) -> Result<RemoteResult<Value>, String> {
    let bytes = raw.body.as_ref().map_err(Clone::clone)?;
    let text = String::from_utf8_lossy(bytes).into_owned();

    if raw.is_error_status() {
        return Ok(RemoteResult::err(format!("HTTP {}: {}", raw.status, text)));
    }
    Ok(RemoteResult::ok(Value::String(text)))
}

fn normalize_json(raw: &RawResponse) -> Result<RemoteResult<Value>, String> {
    let bytes = raw.body.as_ref().map_err(Clone::clone)?;
    let body: Value = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;

    if raw.is_error_status() {
        let message = error_field(&body, "error")
            .or_else(|| error_field(&body, "message"))
            .unwrap_or_else(|| format!("HTTP {}: {}", raw.status, raw.status_text));
        return Ok(RemoteResult::err(message));
    }
    Ok(RemoteResult::ok(body))
}

/// String value of an error-ish field. Non-string values are rendered as JSON;
/// null and blank strings count as absent.
fn error_field(body: &Value, field: &str) -> Option<String> {
    match body.get(field)? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
