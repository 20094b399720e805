use serde_json::Value;
use thiserror::Error;

/// Failures of the REST transport.
///
/// Non-success statuses keep the decoded body so the layer above can turn
/// field-error maps into validation feedback.
#[derive(Debug, Error)]
pub enum Error {
    // ── Auth ────────────────────────────────────────────────────────
    /// HTTP 401. The client has already forgotten its token.
    #[error("Session expired -- sign in again")]
    SessionExpired,

    /// The token cannot travel in an `Authorization` header.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    // ── Network ─────────────────────────────────────────────────────
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// No response within the client's configured timeout.
    #[error("No response within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// CA file unreadable or client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Responses ───────────────────────────────────────────────────
    /// Any status outside 2xx other than 401. `message` is the `detail`
    /// field when present, else the canonical reason phrase.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
        body: Option<Value>,
    },

    /// A 2xx body that is not JSON, or not the expected shape.
    #[error("Unexpected response body: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Connection trouble, timeouts and 5xx answers.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport(e) => e.is_connect() || e.is_timeout(),
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// The HTTP status behind this error, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::SessionExpired => Some(401),
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Decoded JSON body of an error response.
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Api { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}
