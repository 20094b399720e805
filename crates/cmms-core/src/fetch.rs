//! Coordinated fetch controller.
//!
//! One controller owns one logical read (typically a list endpoint with a
//! fixed parameter set) and publishes `{data, loading, error}` through a
//! `watch` channel. It coordinates:
//!
//! - **Caching**: a keyed controller answers from the [`ExpiringCache`] when
//!   it can and writes successful results back.
//! - **Debounce**: [`FetchController::trigger`] restarts a quiet-period timer;
//!   the read is issued only once the period elapses without new triggers.
//! - **Supersession**: issuing a read cancels the previous in-flight read.
//!   Results are applied in issuance order; a superseded result is never
//!   published.
//! - **Teardown**: dropping the controller cancels the pending timer and any
//!   in-flight read.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::{ExpiringCache, FetchKey};
use crate::error::CoreError;
use crate::stream::StateStream;

/// Default quiet period before a triggered read is issued.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// The boxed read operation a controller runs.
pub type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, CoreError>> + Send + Sync>;

// ── Options & state ─────────────────────────────────────────────────

/// Per-controller settings.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Cache slot for this read. `None` disables caching.
    pub cache_key: Option<FetchKey>,
    /// Ttl for cached results. `None` uses the cache's default.
    pub cache_ttl: Option<Duration>,
    pub debounce: Duration,
    /// A disabled controller ignores [`FetchController::trigger`].
    pub enabled: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            cache_key: None,
            cache_ttl: None,
            debounce: DEFAULT_DEBOUNCE,
            enabled: true,
        }
    }
}

impl FetchOptions {
    pub fn keyed(key: FetchKey) -> Self {
        Self {
            cache_key: Some(key),
            ..Self::default()
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// What a controller currently shows.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

/// How an individual read ended.
#[derive(Debug, Clone)]
pub enum FetchOutcome<T> {
    /// The network answered and the result was applied.
    Fetched(T),
    /// A live cache entry was applied without a network call.
    Cached(T),
    /// The read failed; the error was published.
    Failed(CoreError),
    /// A newer read (or teardown) took over; nothing was applied.
    Superseded,
}

impl<T> FetchOutcome<T> {
    /// The applied value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Fetched(v) | Self::Cached(v) => Some(v),
            Self::Failed(_) | Self::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }

    /// Collapse into a `Result`; `None` for a superseded read.
    pub fn into_result(self) -> Option<Result<T, CoreError>> {
        match self {
            Self::Fetched(v) | Self::Cached(v) => Some(Ok(v)),
            Self::Failed(e) => Some(Err(e)),
            Self::Superseded => None,
        }
    }
}

// ── Shared internals ────────────────────────────────────────────────

#[derive(Default)]
struct Slots {
    /// Pending debounce timer, tagged with its generation.
    timer: Option<(u64, CancellationToken)>,
    /// Token of the most recently issued read that has not finished.
    inflight: Option<CancellationToken>,
    generation: u64,
}

struct Shared<T> {
    fetcher: Fetcher<T>,
    options: FetchOptions,
    cache: Arc<ExpiringCache>,
    state: watch::Sender<FetchState<T>>,
    slots: Mutex<Slots>,
    root: CancellationToken,
}

impl<T: Clone + Send + Sync + 'static> Shared<T> {
    fn lock_slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cached(&self) -> Option<T> {
        let key = self.options.cache_key.as_ref()?;
        self.cache.get::<T>(key)
    }

    fn cancel_timer(&self) {
        if let Some((_, timer)) = self.lock_slots().timer.take() {
            timer.cancel();
        }
    }

    fn arm_timer(&self) -> (u64, CancellationToken) {
        let mut slots = self.lock_slots();
        slots.generation = slots.generation.wrapping_add(1);
        let generation = slots.generation;
        let timer = self.root.child_token();
        if let Some((_, previous)) = slots.timer.replace((generation, timer.clone())) {
            previous.cancel();
        }
        (generation, timer)
    }

    /// Claim the timer that just elapsed. `false` if it was replaced.
    fn disarm_timer(&self, generation: u64) -> bool {
        let mut slots = self.lock_slots();
        let current = slots.timer.as_ref().map(|(g, _)| *g);
        if current == Some(generation) {
            slots.timer = None;
            true
        } else {
            false
        }
    }

    /// Apply a cached value, cancelling whatever was pending.
    fn apply_cached<F>(&self, value: T, commit: F) -> FetchOutcome<T>
    where
        F: FnOnce(&Result<T, CoreError>),
    {
        let mut slots = self.lock_slots();
        if self.root.is_cancelled() {
            return FetchOutcome::Superseded;
        }
        if let Some((_, timer)) = slots.timer.take() {
            timer.cancel();
        }
        if let Some(inflight) = slots.inflight.take() {
            inflight.cancel();
        }
        commit(&Ok(value.clone()));
        self.state.send_modify(|s| {
            s.data = Some(value.clone());
            s.loading = false;
            s.error = None;
        });
        FetchOutcome::Cached(value)
    }

    /// Register a new read, cancelling the previous one, and publish
    /// `loading` while still holding the lock.
    fn begin(&self) -> Option<CancellationToken> {
        let mut slots = self.lock_slots();
        if self.root.is_cancelled() {
            return None;
        }
        if let Some(previous) = slots.inflight.take() {
            debug!("superseding in-flight read");
            previous.cancel();
        }
        let token = self.root.child_token();
        slots.inflight = Some(token.clone());
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        Some(token)
    }

    /// Cancel the in-flight read and evict the cache entry in one critical
    /// section, so no result read before this call can be cached after it.
    fn invalidate(&self) -> bool {
        let mut slots = self.lock_slots();
        let cancelled = match slots.inflight.take() {
            Some(inflight) => {
                inflight.cancel();
                true
            }
            None => false,
        };
        if let Some(key) = &self.options.cache_key {
            self.cache.delete(key);
        }
        if cancelled {
            debug!(key = ?self.options.cache_key, "in-flight read invalidated");
            self.state.send_modify(|s| s.loading = false);
        }
        cancelled
    }

    /// Apply a finished read unless it has been superseded.
    ///
    /// The supersession check, `commit` and publication happen under the
    /// slots lock, so no newer read can be issued in between.
    fn finish<F>(
        &self,
        token: &CancellationToken,
        result: Result<T, CoreError>,
        commit: F,
    ) -> FetchOutcome<T>
    where
        F: FnOnce(&Result<T, CoreError>),
    {
        let mut slots = self.lock_slots();
        if token.is_cancelled() {
            debug!("discarding superseded read result");
            return FetchOutcome::Superseded;
        }
        slots.inflight = None;
        commit(&result);

        match result {
            Ok(value) => {
                if let Some(key) = &self.options.cache_key {
                    self.cache.set(key, value.clone(), self.options.cache_ttl);
                }
                self.state.send_modify(|s| {
                    s.data = Some(value.clone());
                    s.loading = false;
                    s.error = None;
                });
                FetchOutcome::Fetched(value)
            }
            Err(err) => {
                warn!(error = %err, key = ?self.options.cache_key, "read failed");
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(err.user_message());
                });
                FetchOutcome::Failed(err)
            }
        }
    }

    async fn issue<F>(&self, commit: F) -> FetchOutcome<T>
    where
        F: FnOnce(&Result<T, CoreError>),
    {
        let Some(token) = self.begin() else {
            return FetchOutcome::Superseded;
        };

        let result = tokio::select! {
            biased;
            () = token.cancelled() => return FetchOutcome::Superseded,
            result = (self.fetcher)() => result,
        };

        self.finish(&token, result, commit)
    }
}

// ── FetchController ─────────────────────────────────────────────────

/// Owner of one coordinated read. Not `Clone`: dropping it is teardown.
pub struct FetchController<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone + Send + Sync + 'static> FetchController<T> {
    pub fn new(fetcher: Fetcher<T>, cache: Arc<ExpiringCache>, options: FetchOptions) -> Self {
        let (state, _) = watch::channel(FetchState::default());
        Self {
            shared: Arc::new(Shared {
                fetcher,
                options,
                cache,
                state,
                slots: Mutex::new(Slots::default()),
                root: CancellationToken::new(),
            }),
        }
    }

    /// Build a controller from an async closure.
    pub fn from_fn<F, Fut>(fetch: F, cache: Arc<ExpiringCache>, options: FetchOptions) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        Self::new(Arc::new(move || fetch().boxed()), cache, options)
    }

    pub fn options(&self) -> &FetchOptions {
        &self.shared.options
    }

    /// Snapshot of the published state.
    pub fn state(&self) -> FetchState<T> {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> StateStream<FetchState<T>> {
        StateStream::new(self.shared.state.subscribe())
    }

    /// React to a change of the read's inputs.
    ///
    /// A cache hit is published immediately. Otherwise the debounce timer
    /// is (re)started and the read goes out once it elapses. Must be called
    /// from within a Tokio runtime.
    pub fn trigger(&self) {
        let shared = &self.shared;
        if !shared.options.enabled || shared.root.is_cancelled() {
            return;
        }

        if let Some(value) = shared.cached() {
            shared.apply_cached(value, |_| {});
            return;
        }

        let (generation, timer) = shared.arm_timer();
        let shared = Arc::clone(shared);
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = timer.cancelled() => {}
                () = tokio::time::sleep(shared.options.debounce) => {
                    if shared.disarm_timer(generation) {
                        shared.issue(|_| {}).await;
                    }
                }
            }
        });
    }

    /// Read now, answering from the cache when possible.
    pub async fn load(&self) -> FetchOutcome<T> {
        self.load_with(|_| {}).await
    }

    /// [`load`](Self::load), running `commit` atomically with publication.
    pub async fn load_with<F>(&self, commit: F) -> FetchOutcome<T>
    where
        F: FnOnce(&Result<T, CoreError>),
    {
        if let Some(value) = self.shared.cached() {
            return self.shared.apply_cached(value, commit);
        }
        self.shared.cancel_timer();
        self.shared.issue(commit).await
    }

    /// Evict the cache entry and read from the network immediately.
    pub async fn refetch(&self) -> FetchOutcome<T> {
        self.refetch_with(|_| {}).await
    }

    /// [`refetch`](Self::refetch), running `commit` atomically with publication.
    pub async fn refetch_with<F>(&self, commit: F) -> FetchOutcome<T>
    where
        F: FnOnce(&Result<T, CoreError>),
    {
        self.clear_cache();
        self.shared.cancel_timer();
        self.shared.issue(commit).await
    }

    /// Evict this controller's cache entry without reading.
    pub fn clear_cache(&self) {
        if let Some(key) = &self.shared.options.cache_key {
            self.shared.cache.delete(key);
        }
    }

    /// Drop the cached result and the read in flight, if any.
    ///
    /// Owners call this after a write to the underlying data: a read issued
    /// before the write can no longer publish or cache its result. Returns
    /// whether a read was cancelled. A pending debounce timer is kept; the
    /// read it issues starts after the write.
    pub fn invalidate(&self) -> bool {
        self.shared.invalidate()
    }

    /// Cancel the pending timer and any in-flight read, permanently.
    pub fn dispose(&self) {
        self.shared.root.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.root.is_cancelled()
    }
}

impl<T> Drop for FetchController<T> {
    fn drop(&mut self) {
        self.shared.root.cancel();
    }
}
