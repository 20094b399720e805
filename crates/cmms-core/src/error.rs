// ── Core error types ──
//
// User-facing errors from cmms-core. Consumers never match on HTTP status
// codes or raw JSON bodies; the `From<cmms_api::Error>` impl translates
// transport-layer errors into these variants. `CoreError` is `Clone` so a
// failed read can be both published into controller state and handed back
// to the caller.

use serde_json::{Map, Value};
use thiserror::Error;

/// Fallback line shown when a validation failure carries no field detail.
pub const GENERIC_VALIDATION_HINT: &str = "Check the submitted data and try again.";

/// Server- or client-side validation feedback for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub messages: Vec<String>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            messages: vec![message.into()],
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.messages.join(", "))
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach API at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Entity not found: {entity_type} with id {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("Unexpected response shape: {message}")]
    Shape { message: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed {
        message: String,
        fields: Vec<FieldError>,
    },

    #[error("Invalid screen state: {message}")]
    InvalidState { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Build a validation error from per-field messages.
    pub fn validation(fields: Vec<FieldError>) -> Self {
        let message = if fields.is_empty() {
            GENERIC_VALIDATION_HINT.to_owned()
        } else {
            fields
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n")
        };
        Self::ValidationFailed { message, fields }
    }

    /// Text suitable for a form banner or notification.
    ///
    /// Validation failures render one `field: msg1, msg2` line per field;
    /// everything else uses the `Display` form.
    pub fn user_message(&self) -> String {
        match self {
            Self::ValidationFailed { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Per-field details of a validation failure.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::ValidationFailed { fields, .. } => fields,
            _ => &[],
        }
    }

    /// Whether the user has to sign in again.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }
}

/// Parse a DRF-style error map (`{"field": ["msg", ...], ...}`).
///
/// Returns `None` when the body is not an object, or when it only carries
/// the generic `detail` key.
fn field_errors_from_body(body: &Map<String, Value>) -> Option<Vec<FieldError>> {
    if body.is_empty() || (body.len() == 1 && body.contains_key("detail")) {
        return None;
    }
    let fields = body
        .iter()
        .map(|(field, value)| {
            let messages = match value {
                Value::Array(items) => items.iter().map(message_text).collect(),
                other => vec![message_text(other)],
            };
            FieldError {
                field: field.clone(),
                messages,
            }
        })
        .collect();
    Some(fields)
}

fn message_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<cmms_api::Error> for CoreError {
    fn from(err: cmms_api::Error) -> Self {
        match err {
            cmms_api::Error::SessionExpired => CoreError::AuthenticationFailed {
                message: "Session expired -- sign in again".into(),
            },
            cmms_api::Error::InvalidToken(message) => CoreError::AuthenticationFailed { message },
            cmms_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            cmms_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            cmms_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            cmms_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            cmms_api::Error::Api {
                status: 400,
                message,
                body,
            } => match body
                .as_ref()
                .and_then(Value::as_object)
                .and_then(field_errors_from_body)
            {
                Some(fields) => CoreError::validation(fields),
                None => CoreError::ValidationFailed {
                    message,
                    fields: Vec::new(),
                },
            },
            cmms_api::Error::Api {
                status: 403,
                message,
                ..
            } => CoreError::PermissionDenied { message },
            cmms_api::Error::Api {
                status: 404,
                message,
                ..
            } => CoreError::NotFound {
                entity_type: "resource".into(),
                identifier: message,
            },
            cmms_api::Error::Api {
                status, message, ..
            } => CoreError::Api {
                message,
                status: Some(status),
            },
            cmms_api::Error::Deserialization { message, body: _ } => {
                CoreError::Shape { message }
            }
        }
    }
}
