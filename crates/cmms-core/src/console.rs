// ── Console facade ──
//
// Owns the transport and the single response cache, and hands both to every
// controller and screen it creates. Cheaply cloneable via `Arc`.

use std::future::Future;
use std::sync::Arc;

use cmms_api::transport::{TlsMode, TransportConfig};
use cmms_api::{Credentials, HttpClient, Transport};
use tracing::debug;

use crate::cache::{ExpiringCache, FetchKey};
use crate::config::{ConsoleConfig, TlsVerification};
use crate::crud::{CrudScreen, ScreenConfig};
use crate::error::CoreError;
use crate::fetch::{FetchController, FetchOptions};
use crate::model::Entity;
use crate::resource::{ResourceController, ResourceEndpoint};

/// Entry point for consumers of the data layer.
#[derive(Clone)]
pub struct Console {
    inner: Arc<ConsoleInner>,
}

struct ConsoleInner {
    config: ConsoleConfig,
    transport: Arc<dyn Transport>,
    cache: Arc<ExpiringCache>,
}

impl Console {
    /// Build the HTTP transport described by `config`.
    pub fn connect(config: ConsoleConfig) -> Result<Self, CoreError> {
        let client = HttpClient::new(config.base_url.clone(), &build_transport(&config))?;
        if let Some(auth) = &config.auth {
            client.set_credentials(Credentials::new(auth.token.clone(), auth.scheme));
        }
        debug!(url = %config.base_url, authenticated = client.is_authenticated(), "console ready");
        Ok(Self::with_transport(config, Arc::new(client)))
    }

    /// Use any transport (mocks, recorded fixtures, alternative clients).
    pub fn with_transport(config: ConsoleConfig, transport: Arc<dyn Transport>) -> Self {
        let cache = Arc::new(ExpiringCache::with_default_ttl(config.cache_ttl));
        Self {
            inner: Arc::new(ConsoleInner {
                config,
                transport,
                cache,
            }),
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.inner.config
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.inner.transport)
    }

    pub fn cache(&self) -> &Arc<ExpiringCache> {
        &self.inner.cache
    }

    /// Drop every cached response.
    pub fn invalidate_all(&self) {
        self.inner.cache.clear();
    }

    // ── Factories ────────────────────────────────────────────────────

    pub fn resource<T: Entity>(&self, endpoint: ResourceEndpoint) -> ResourceController<T> {
        ResourceController::new(
            endpoint,
            self.transport(),
            Arc::clone(&self.inner.cache),
            Some(self.inner.config.cache_ttl),
        )
    }

    pub fn screen<T: Entity>(&self, config: ScreenConfig<T>) -> CrudScreen<T> {
        CrudScreen::new(
            config,
            self.transport(),
            Arc::clone(&self.inner.cache),
            Some(self.inner.config.cache_ttl),
        )
    }

    /// A coordinated read with this console's cache and debounce settings.
    pub fn fetcher<T, F, Fut>(&self, key: Option<FetchKey>, fetch: F) -> FetchController<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        let options = FetchOptions {
            cache_key: key,
            cache_ttl: Some(self.inner.config.cache_ttl),
            debounce: self.inner.config.debounce,
            enabled: true,
        };
        FetchController::from_fn(fetch, Arc::clone(&self.inner.cache), options)
    }

    /// Debounced, cached read of `endpoint` with query parameters.
    ///
    /// Call [`FetchController::trigger`] whenever the parameters driving it
    /// change; build a new controller when they do.
    pub fn query<T: Entity>(&self, endpoint: &str, params: Vec<(String, String)>) -> FetchController<Vec<T>> {
        let key = FetchKey::with_query(endpoint, params.clone());
        let path = cmms_api::paths::collection_path(endpoint);
        let transport = self.transport();
        self.fetcher(Some(key), move || {
            let transport = Arc::clone(&transport);
            let path = path.clone();
            let params = params.clone();
            async move {
                let payload = transport.get(&path, &params).await?;
                Ok::<_, CoreError>(cmms_api::unwrap_list::<T>(payload)?)
            }
        })
    }
}

fn build_transport(config: &ConsoleConfig) -> TransportConfig {
    TransportConfig::default()
        .with_timeout(config.timeout)
        .with_tls(tls_to_transport(&config.tls))
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
