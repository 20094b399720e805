//! Expiring response cache.
//!
//! Values are stored type-erased under a [`FetchKey`] together with the
//! instant they were written and their time-to-live. Expiry is lazy: a
//! lookup that finds an entry older than its ttl removes it and reports a
//! miss. There is no background sweep and no size bound.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::trace;

/// Default time-to-live for cached responses.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

// ── FetchKey ────────────────────────────────────────────────────────

/// Cache key for a read: normalised endpoint plus its query parameters.
///
/// Parameters are sorted and form-encoded, so equal parameter sets always
/// produce equal keys regardless of insertion order, and values containing
/// `&` or `=` cannot collide with other parameter sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FetchKey(String);

impl FetchKey {
    /// Key for an unparameterised collection read.
    pub fn new(endpoint: &str) -> Self {
        Self(cmms_api::paths::collection_path(endpoint))
    }

    /// Key for a collection read with query parameters.
    pub fn with_query<I, K, V>(endpoint: &str, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let sorted: BTreeMap<String, String> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let base = cmms_api::paths::collection_path(endpoint);
        if sorted.is_empty() {
            return Self(base);
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(sorted.iter())
            .finish();
        Self(format!("{base}?{query}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The collection path this key belongs to.
    pub fn endpoint(&self) -> &str {
        self.0.split_once('?').map_or(self.0.as_str(), |(path, _)| path)
    }
}

impl fmt::Display for FetchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── ExpiringCache ───────────────────────────────────────────────────

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) > self.ttl
    }
}

/// Process-wide store of recent responses, shared through an `Arc`.
pub struct ExpiringCache {
    entries: DashMap<FetchKey, CacheEntry>,
    default_ttl: Duration,
}

impl ExpiringCache {
    /// A cache using [`DEFAULT_TTL`].
    pub fn new() -> Self {
        Self::with_default_ttl(DEFAULT_TTL)
    }

    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Store `value`, overwriting any previous entry and restarting its clock.
    pub fn set<T>(&self, key: &FetchKey, value: T, ttl: Option<Duration>)
    where
        T: Send + Sync + 'static,
    {
        let entry = CacheEntry {
            value: Arc::new(value),
            stored_at: Instant::now(),
            ttl: ttl.unwrap_or(self.default_ttl),
        };
        self.entries.insert(key.clone(), entry);
        trace!(key = %key, "cache set");
    }

    /// Look up a live entry.
    ///
    /// An expired entry is removed and reported as absent. An entry holding
    /// a different type than `T` is also absent, but left in place.
    pub fn get<T>(&self, key: &FetchKey) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if !entry.is_expired(now) {
                trace!(key = %key, "cache hit");
                return entry.value.downcast_ref::<T>().cloned();
            }
        }
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        trace!(key = %key, "cache entry expired");
        None
    }

    /// Whether a live entry exists (does not remove expired ones).
    pub fn contains(&self, key: &FetchKey) -> bool {
        let now = Instant::now();
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    pub fn delete(&self, key: &FetchKey) {
        self.entries.remove(key);
    }

    /// Remove every key of a collection, with or without query parameters.
    /// Returns how many entries were dropped.
    pub fn invalidate_endpoint(&self, endpoint: &str) -> usize {
        let path = cmms_api::paths::collection_path(endpoint);
        let before = self.entries.len();
        self.entries.retain(|key, _| key.endpoint() != path);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            trace!(endpoint = %path, removed, "cache invalidated");
        }
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ExpiringCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExpiringCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("entries", &self.entries.len())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}
