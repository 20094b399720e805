// ── Entities and records ──
//
// Anything a resource controller holds implements `Entity`. Screens driven
// purely by metadata use `Record`, a plain JSON object, so attribute access
// goes through dotted paths instead of struct fields.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::key::PrimaryKey;

/// A dynamic record: one JSON object as returned by the backend.
pub type Record = Map<String, Value>;

/// An item owned by a resource collection.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Read an attribute by dotted path (`faena.nombrefaena`).
    ///
    /// The default goes through `serde_json`; override it for typed structs
    /// on hot paths.
    fn lookup(&self, path: &str) -> Option<Value> {
        let value = serde_json::to_value(self).ok()?;
        lookup_path(&value, path).cloned()
    }

    /// The item's primary key, read from `pk_field`.
    fn primary_key(&self, pk_field: &str) -> Option<PrimaryKey> {
        self.lookup(pk_field).as_ref().and_then(PrimaryKey::from_value)
    }
}

impl Entity for Record {
    fn lookup(&self, path: &str) -> Option<Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.get(first)?;
        for part in parts {
            current = step(current, part)?;
        }
        Some(current.clone())
    }
}

/// Walk a dotted path through nested objects (and arrays, by index).
///
/// Any missing segment yields `None`; a `null` at the end is returned as is.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, step)
}

fn step<'a>(current: &'a Value, part: &str) -> Option<&'a Value> {
    match current {
        Value::Object(map) => map.get(part),
        Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}
