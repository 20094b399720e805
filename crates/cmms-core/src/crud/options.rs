// ── Select options ──
//
// Select fields list rows of another endpoint. Every distinct source
// endpoint is read once per resolution, all of them concurrently, through
// the shared cache. A source that fails leaves its fields with an empty
// option list and never holds up the others.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use cmms_api::Transport;
use futures_util::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::descriptor::{FieldDescriptor, OptionsSource};
use super::render::plain_text;
use crate::cache::{ExpiringCache, FetchKey};
use crate::error::CoreError;
use crate::model::{Entity, Record};

/// One choice of a select field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub value: Value,
    pub label: String,
}

/// Project source rows into options, preserving source order.
///
/// Rows without a usable value are skipped; a missing label falls back to
/// the value's text.
pub fn project_options(records: &[Record], source: &OptionsSource) -> Vec<SelectOption> {
    records
        .iter()
        .filter_map(|record| {
            let value = record.lookup(&source.value_field).filter(|v| !v.is_null())?;
            let label = record
                .lookup(&source.label_field)
                .filter(|v| !v.is_null())
                .map_or_else(|| plain_text(&value), |l| plain_text(&l));
            Some(SelectOption { value, label })
        })
        .collect()
}

/// Resolved options for every select field of a screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionSets {
    sets: HashMap<String, Vec<SelectOption>>,
    errors: HashMap<String, String>,
}

impl OptionSets {
    /// Options of `field`; empty when unknown or when its source failed.
    pub fn get(&self, field: &str) -> &[SelectOption] {
        self.sets.get(field).map_or(&[], Vec::as_slice)
    }

    /// Why `field` has no options, if its source failed.
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Label of the option whose value equals `value`.
    pub fn label_for(&self, field: &str, value: &Value) -> Option<&str> {
        self.get(field)
            .iter()
            .find(|option| option.value == *value)
            .map(|option| option.label.as_str())
    }
}

async fn read_source(
    transport: &dyn Transport,
    cache: &ExpiringCache,
    ttl: Option<Duration>,
    key: FetchKey,
) -> Result<Vec<Record>, CoreError> {
    if let Some(records) = cache.get::<Vec<Record>>(&key) {
        return Ok(records);
    }
    let payload = transport.get(key.endpoint(), &[]).await?;
    let records = cmms_api::unwrap_list::<Record>(payload)?;
    cache.set(&key, records.clone(), ttl);
    Ok(records)
}

/// Resolve the options of every field that declares a source.
pub async fn resolve_options(
    transport: &dyn Transport,
    cache: &ExpiringCache,
    ttl: Option<Duration>,
    fields: &[FieldDescriptor],
) -> OptionSets {
    let mut by_source: BTreeMap<FetchKey, Vec<(&FieldDescriptor, &OptionsSource)>> = BTreeMap::new();
    for field in fields {
        if let Some(source) = &field.options_source {
            by_source
                .entry(FetchKey::new(&source.endpoint))
                .or_default()
                .push((field, source));
        }
    }

    let reads = by_source.into_iter().map(|(key, sourced)| async move {
        let result = read_source(transport, cache, ttl, key).await;
        (sourced, result)
    });

    let mut sets = OptionSets::default();
    for (sourced, result) in join_all(reads).await {
        for (field, source) in sourced {
            match &result {
                Ok(records) => {
                    let options = project_options(records, source);
                    debug!(field = %field.name, count = options.len(), "options resolved");
                    sets.sets.insert(field.name.clone(), options);
                }
                Err(err) => {
                    warn!(field = %field.name, endpoint = %source.endpoint, error = %err, "option source failed");
                    sets.sets.insert(field.name.clone(), Vec::new());
                    sets.errors.insert(field.name.clone(), err.user_message());
                }
            }
        }
    }
    sets
}
