// ── Runtime connection configuration ──
//
// These types describe how to reach the CMMS backend and how the data
// layer caches and debounces. They carry credential data and tuning, but
// never touch disk. The CLI builds a `ConsoleConfig` and hands it in.

use std::time::Duration;

use cmms_api::AuthScheme;
use secrecy::SecretString;
use url::Url;

use crate::cache::DEFAULT_TTL;
use crate::fetch::DEFAULT_DEBOUNCE;

/// A token and how to present it.
#[derive(Debug, Clone)]
pub struct AuthToken {
    pub token: SecretString,
    pub scheme: AuthScheme,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed staging servers).
    DangerAcceptInvalid,
}

/// Configuration for one backend.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// API root, e.g. `https://cmms.example.com/api/`.
    pub base_url: Url,
    /// Credentials; `None` sends anonymous requests.
    pub auth: Option<AuthToken>,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Ttl of cached list responses.
    pub cache_ttl: Duration,
    /// Quiet period of debounced reads.
    pub debounce: Duration,
}

impl ConsoleConfig {
    /// Defaults for everything but the URL.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            auth: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            cache_ttl: DEFAULT_TTL,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_token(mut self, token: SecretString, scheme: AuthScheme) -> Self {
        self.auth = Some(AuthToken { token, scheme });
        self
    }
}
