//! Resource controller: the in-memory collection of one REST endpoint.
//!
//! Reads go through a [`FetchController`] so they share the cache and the
//! supersession rules. Mutations call the transport directly and reconcile
//! the local collection only after the server confirms. Every state change
//! goes through `watch::Sender::send_modify`, so each one applies to the
//! latest snapshot rather than to a copy captured before an `.await`.
//!
//! A confirmed mutation cancels the list read in flight and evicts the cached
//! list before touching the items. The interrupted `load` or `fetch_all`
//! notices the mutation and reads again, so a list fetched before the write
//! is never applied or cached after it.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use cmms_api::Transport;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::cache::{ExpiringCache, FetchKey};
use crate::error::CoreError;
use crate::fetch::{FetchController, FetchOptions, FetchOutcome};
use crate::model::{Entity, PrimaryKey};
use crate::stream::StateStream;

// ── Endpoint ────────────────────────────────────────────────────────

/// Where a collection lives and which attribute identifies its items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEndpoint {
    path: String,
    pk_field: String,
}

impl ResourceEndpoint {
    /// `endpoint` may be spelled `"/faenas/"` or `"faenas"`.
    pub fn new(endpoint: &str, pk_field: impl Into<String>) -> Self {
        Self {
            path: cmms_api::paths::collection_path(endpoint),
            pk_field: pk_field.into(),
        }
    }

    /// Normalised collection path, e.g. `faenas/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn pk_field(&self) -> &str {
        &self.pk_field
    }

    pub fn item_path(&self, key: &PrimaryKey) -> String {
        cmms_api::paths::item_path(&self.path, key)
    }

    pub fn cache_key(&self) -> FetchKey {
        FetchKey::new(&self.path)
    }
}

// ── State ───────────────────────────────────────────────────────────

/// Published state of a resource collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceState<T> {
    /// Items in server order; primary keys are unique.
    pub items: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for ResourceState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: None,
        }
    }
}

impl<T: Entity> ResourceState<T> {
    pub fn find(&self, pk_field: &str, key: &PrimaryKey) -> Option<&T> {
        self.items
            .iter()
            .find(|item| item.primary_key(pk_field).as_ref() == Some(key))
    }
}

fn position<T: Entity>(items: &[T], pk_field: &str, key: &PrimaryKey) -> Option<usize> {
    items
        .iter()
        .position(|item| item.primary_key(pk_field).as_ref() == Some(key))
}

/// Replace the item with `key` in place, or append when absent.
fn upsert<T: Entity>(items: &mut Vec<T>, pk_field: &str, key: Option<&PrimaryKey>, item: T) {
    match key
        .and_then(|k| position(items, pk_field, k))
        .and_then(|i| items.get_mut(i))
    {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}

/// Keep the first occurrence of each primary key.
fn dedupe<T: Entity>(items: Vec<T>, pk_field: &str, endpoint: &str) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| match item.primary_key(pk_field) {
            Some(key) => {
                let fresh = seen.insert(key.clone());
                if !fresh {
                    warn!(endpoint, key = %key, "dropping duplicate primary key from list response");
                }
                fresh
            }
            None => true,
        })
        .collect()
}

fn decode<T: Entity>(value: Value) -> Result<T, CoreError> {
    serde_json::from_value(value).map_err(|e| CoreError::Shape {
        message: e.to_string(),
    })
}

// ── ResourceController ──────────────────────────────────────────────

/// CRUD access to one endpoint with a locally held collection.
pub struct ResourceController<T: Entity> {
    endpoint: ResourceEndpoint,
    transport: Arc<dyn Transport>,
    cache: Arc<ExpiringCache>,
    list: FetchController<Vec<T>>,
    state: watch::Sender<ResourceState<T>>,
    /// Confirmed mutations so far.
    mutations: AtomicU64,
}

impl<T: Entity> ResourceController<T> {
    pub fn new(
        endpoint: ResourceEndpoint,
        transport: Arc<dyn Transport>,
        cache: Arc<ExpiringCache>,
        cache_ttl: Option<Duration>,
    ) -> Self {
        let list_transport = Arc::clone(&transport);
        let path = endpoint.path().to_owned();
        let list = FetchController::from_fn(
            move || {
                let transport = Arc::clone(&list_transport);
                let path = path.clone();
                async move {
                    let payload = transport.get(&path, &[]).await?;
                    Ok::<_, CoreError>(cmms_api::unwrap_list::<T>(payload)?)
                }
            },
            Arc::clone(&cache),
            FetchOptions {
                cache_key: Some(endpoint.cache_key()),
                cache_ttl,
                ..FetchOptions::default()
            },
        );
        let (state, _) = watch::channel(ResourceState::default());

        Self {
            endpoint,
            transport,
            cache,
            list,
            state,
            mutations: AtomicU64::new(0),
        }
    }

    pub fn endpoint(&self) -> &ResourceEndpoint {
        &self.endpoint
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ResourceState<T> {
        self.state.borrow().clone()
    }

    pub fn items(&self) -> Vec<T> {
        self.state.borrow().items.clone()
    }

    /// The current item with primary key `key`.
    pub fn get(&self, key: &PrimaryKey) -> Option<T> {
        self.state.borrow().find(&self.endpoint.pk_field, key).cloned()
    }

    pub fn subscribe(&self) -> StateStream<ResourceState<T>> {
        StateStream::new(self.state.subscribe())
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Populate the collection, answering from the cache when possible.
    pub async fn load(&self) -> Result<(), CoreError> {
        self.read(true).await
    }

    /// Re-read the whole collection from the server.
    ///
    /// Failures are recorded in `error` (items stay untouched) and also
    /// returned. A read superseded by a newer one returns `Ok`.
    pub async fn fetch_all(&self) -> Result<(), CoreError> {
        self.read(false).await
    }

    async fn read(&self, use_cache: bool) -> Result<(), CoreError> {
        loop {
            let seen = self.mutations.load(Ordering::SeqCst);
            self.mark_loading();
            let outcome = if use_cache {
                self.list.load_with(|result| self.reconcile(result)).await
            } else {
                self.list.refetch_with(|result| self.reconcile(result)).await
            };

            if outcome.is_superseded() && self.mutations.load(Ordering::SeqCst) != seen {
                debug!(endpoint = %self.endpoint.path, "list read overtaken by a mutation, reading again");
                continue;
            }
            return Self::settle(outcome);
        }
    }

    fn mark_loading(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
    }

    fn reconcile(&self, result: &Result<Vec<T>, CoreError>) {
        match result {
            Ok(items) => {
                let items = dedupe(items.clone(), &self.endpoint.pk_field, &self.endpoint.path);
                debug!(endpoint = %self.endpoint.path, count = items.len(), "collection loaded");
                self.state.send_modify(|s| {
                    s.items = items;
                    s.loading = false;
                    s.error = None;
                });
            }
            Err(err) => {
                let message = err.user_message();
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(message);
                });
            }
        }
    }

    fn settle(outcome: FetchOutcome<Vec<T>>) -> Result<(), CoreError> {
        match outcome {
            FetchOutcome::Failed(err) => Err(err),
            FetchOutcome::Fetched(_) | FetchOutcome::Cached(_) | FetchOutcome::Superseded => Ok(()),
        }
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Create an item and add the server's representation to the collection.
    pub async fn create(&self, payload: &Value) -> Result<T, CoreError> {
        debug!(endpoint = %self.endpoint.path, "creating item");
        let result = match self.transport.post(&self.endpoint.path, payload).await {
            Ok(value) => decode::<T>(value),
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(item) => {
                let pk_field = &self.endpoint.pk_field;
                let key = item.primary_key(pk_field);
                let stored = item.clone();
                self.apply(|items| upsert(items, pk_field, key.as_ref(), stored));
                Ok(item)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Update the item with `key`, replacing it in place.
    pub async fn update(&self, key: &PrimaryKey, payload: &Value) -> Result<T, CoreError> {
        debug!(endpoint = %self.endpoint.path, key = %key, "updating item");
        let path = self.endpoint.item_path(key);
        let result = match self.transport.put(&path, payload).await {
            Ok(value) => decode::<T>(value),
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(item) => {
                let stored = item.clone();
                self.apply(|items| upsert(items, &self.endpoint.pk_field, Some(key), stored));
                Ok(item)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Delete the item with `key`; it leaves the collection only once the
    /// server has confirmed.
    pub async fn remove(&self, key: &PrimaryKey) -> Result<(), CoreError> {
        debug!(endpoint = %self.endpoint.path, key = %key, "deleting item");
        let path = self.endpoint.item_path(key);

        match self.transport.delete(&path).await {
            Ok(_) => {
                let pk_field = &self.endpoint.pk_field;
                self.apply(|items| items.retain(|item| item.primary_key(pk_field).as_ref() != Some(key)));
                Ok(())
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Record a confirmed mutation: supersede the list read in flight, apply
    /// the change to the items, then drop every cached read of the endpoint.
    fn apply(&self, change: impl FnOnce(&mut Vec<T>)) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        if self.list.invalidate() {
            debug!(endpoint = %self.endpoint.path, "mutation superseded an in-flight list read");
        }
        self.state.send_modify(|s| change(&mut s.items));
        self.invalidate();
    }

    fn fail(&self, err: CoreError) -> CoreError {
        warn!(endpoint = %self.endpoint.path, error = %err, "mutation failed");
        let message = err.user_message();
        self.state.send_modify(|s| s.error = Some(message));
        err
    }

    fn invalidate(&self) {
        self.cache.invalidate_endpoint(&self.endpoint.path);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::Record;

    fn rec(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => Record::new(),
        }
    }

    #[test]
    fn endpoint_paths() {
        let endpoint = ResourceEndpoint::new("/faenas/", "idfaena");
        assert_eq!(endpoint.path(), "faenas/");
        assert_eq!(endpoint.item_path(&PrimaryKey::Int(0)), "faenas/0/");
        assert_eq!(endpoint.cache_key(), FetchKey::new("faenas"));
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let items = vec![
            rec(json!({"id": 1, "v": "a"})),
            rec(json!({"id": 2})),
            rec(json!({"id": 1, "v": "b"})),
            rec(json!({"nokey": true})),
        ];
        let deduped = dedupe(items, "id", "x/");
        assert_eq!(deduped.len(), 3);
        assert_eq!(deduped[0].get("v"), Some(&json!("a")));
    }

    #[test]
    fn upsert_replaces_or_appends() {
        let mut items = vec![rec(json!({"id": 1, "v": "a"}))];
        upsert(&mut items, "id", Some(&PrimaryKey::Int(1)), rec(json!({"id": 1, "v": "b"})));
        upsert(&mut items, "id", Some(&PrimaryKey::Int(2)), rec(json!({"id": 2})));
        upsert(&mut items, "id", None, rec(json!({"other": 1})));
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].get("v"), Some(&json!("b")));
    }
}
