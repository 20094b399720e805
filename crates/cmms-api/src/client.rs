// REST HTTP client
//
// Wraps `reqwest::Client` with base-URL joining, token authentication and
// status mapping. Everything above this layer talks to the narrow
// `Transport` trait so controllers can be driven by any implementation.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

// ── Transport contract ──────────────────────────────────────────────

/// The four verbs the data layer needs from the backend.
///
/// Paths are relative to the API root (`faenas/`, `equipos/12/`). Each call
/// resolves to the decoded JSON body; an empty success body decodes to
/// `Value::Null`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, Error>;
    async fn post(&self, path: &str, body: &Value) -> Result<Value, Error>;
    async fn put(&self, path: &str, body: &Value) -> Result<Value, Error>;
    async fn delete(&self, path: &str) -> Result<Value, Error>;
}

// ── Credentials ─────────────────────────────────────────────────────

/// Prefix used in the `Authorization` header.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AuthScheme {
    /// `Authorization: Token <key>` (DRF token authentication).
    #[default]
    Token,
    /// `Authorization: Bearer <jwt>`.
    Bearer,
}

impl AuthScheme {
    fn header_prefix(self) -> &'static str {
        match self {
            Self::Token => "Token",
            Self::Bearer => "Bearer",
        }
    }
}

/// A token and the scheme it is presented with.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub token: SecretString,
    pub scheme: AuthScheme,
}

impl Credentials {
    pub fn new(token: SecretString, scheme: AuthScheme) -> Self {
        Self { token, scheme }
    }

    fn header_value(&self) -> Result<HeaderValue, Error> {
        let raw = format!("{} {}", self.scheme.header_prefix(), self.token.expose_secret());
        let mut value = HeaderValue::from_str(&raw).map_err(|_| {
            Error::InvalidToken("token contains characters not allowed in a header".into())
        })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

// ── HttpClient ──────────────────────────────────────────────────────

/// HTTP implementation of [`Transport`].
///
/// Credentials live behind an `ArcSwapOption` so a 401 can drop them from
/// any task without locking; later requests then go out anonymously until
/// new credentials are installed.
pub struct HttpClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: ArcSwapOption<Credentials>,
    timeout: Option<Duration>,
}

impl HttpClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the API root, e.g. `https://cmms.example.com/api/`.
    /// A missing trailing slash is added so relative paths nest under it.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let mut client = Self::with_client(http, base_url);
        client.timeout = Some(transport.timeout);
        Ok(client)
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            http,
            base_url,
            credentials: ArcSwapOption::empty(),
            timeout: None,
        }
    }

    /// Install credentials, builder style.
    pub fn with_credentials(self, credentials: Credentials) -> Self {
        self.set_credentials(credentials);
        self
    }

    /// The API root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Replace the current credentials.
    pub fn set_credentials(&self, credentials: Credentials) {
        self.credentials.store(Some(Arc::new(credentials)));
    }

    /// Drop the current credentials (session teardown).
    pub fn clear_credentials(&self) {
        self.credentials.store(None);
    }

    /// Whether requests currently carry an `Authorization` header.
    pub fn is_authenticated(&self) -> bool {
        self.credentials.load().is_some()
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Resolve a path relative to the API root.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn url_with_query(&self, path: &str, query: &[(String, String)]) -> Result<Url, Error> {
        let mut url = self.url(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn authorize(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, Error> {
        match self.credentials.load_full() {
            Some(credentials) => Ok(request.header(AUTHORIZATION, credentials.header_value()?)),
            None => Ok(request),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, Error> {
        let resp = self
            .authorize(request)?
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        self.parse_response(resp).await
    }

    fn send_error(&self, err: reqwest::Error) -> Error {
        match self.timeout {
            Some(timeout) if err.is_timeout() => Error::Timeout {
                timeout_secs: timeout.as_secs(),
            },
            _ => Error::Transport(err),
        }
    }

    /// Decode a response body, mapping non-success statuses to errors.
    ///
    /// A 401 tears the session down before the error is returned.
    async fn parse_response(&self, resp: reqwest::Response) -> Result<Value, Error> {
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED {
            if self.is_authenticated() {
                warn!(url = %resp.url(), "credentials rejected, clearing session");
            }
            self.clear_credentials();
            return Err(Error::SessionExpired);
        }

        let body = resp.text().await.map_err(Error::Transport)?;

        if status.is_success() {
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body,
            });
        }

        let parsed: Option<Value> = serde_json::from_str(&body).ok();
        let message = parsed
            .as_ref()
            .and_then(|v| v.get("detail"))
            .and_then(Value::as_str)
            .map_or_else(
                || status.canonical_reason().unwrap_or("request failed").to_owned(),
                str::to_owned,
            );

        Err(Error::Api {
            status: status.as_u16(),
            message,
            body: parsed,
        })
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, Error> {
        let url = self.url_with_query(path, query)?;
        debug!("GET {}", url);
        self.send(self.http.get(url)).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, Error> {
        let url = self.url(path)?;
        debug!("POST {}", url);
        self.send(self.http.post(url).json(body)).await
    }

    async fn put(&self, path: &str, body: &Value) -> Result<Value, Error> {
        let url = self.url(path)?;
        debug!("PUT {}", url);
        self.send(self.http.put(url).json(body)).await
    }

    async fn delete(&self, path: &str) -> Result<Value, Error> {
        let url = self.url(path)?;
        debug!("DELETE {}", url);
        self.send(self.http.delete(url)).await
    }
}
