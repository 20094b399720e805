// ── List envelopes ──
//
// Collection endpoints answer either with a bare JSON array or with the
// paginated wrapper `{count, next, previous, results: [...]}`. Callers only
// ever see the item list.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;

/// Pagination metadata of a wrapped list response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageInfo {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
}

/// Extract the item list from a collection response.
///
/// Accepts a bare array or an object carrying a `results` array. Anything
/// else is a shape mismatch reported as [`Error::Deserialization`].
pub fn unwrap_list<T: DeserializeOwned>(payload: Value) -> Result<Vec<T>, Error> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            other => {
                if let Some(results) = other {
                    map.insert("results".into(), results);
                }
                return Err(shape_error(
                    "expected a `results` array in the list envelope",
                    &Value::Object(map),
                ));
            }
        },
        other => {
            return Err(shape_error("expected a JSON array or list envelope", &other));
        }
    };

    items
        .into_iter()
        .map(|item| {
            serde_json::from_value::<T>(item.clone()).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: item.to_string(),
            })
        })
        .collect()
}

/// Read the pagination metadata of a wrapped list, if present.
pub fn page_info(payload: &Value) -> Option<PageInfo> {
    let map = payload.as_object()?;
    if !map.contains_key("results") {
        return None;
    }
    serde_json::from_value(payload.clone()).ok()
}

fn shape_error(message: &str, body: &Value) -> Error {
    Error::Deserialization {
        message: message.to_owned(),
        body: body.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn bare_array_is_returned_as_is() {
        let items: Vec<Value> = unwrap_list(json!([{"id": 1}, {"id": 2}])).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn results_envelope_is_unwrapped() {
        let payload = json!({"count": 2, "next": null, "previous": null, "results": [{"id": 1}]});
        let items: Vec<Value> = unwrap_list(payload.clone()).unwrap();
        assert_eq!(items, vec![json!({"id": 1})]);

        let info = page_info(&payload).unwrap();
        assert_eq!(info.count, Some(2));
        assert!(info.next.is_none());
    }

    #[test]
    fn object_without_results_is_a_shape_error() {
        let err = unwrap_list::<Value>(json!({"detail": "nope"})).unwrap_err();
        assert!(matches!(err, Error::Deserialization { .. }));
        assert!(page_info(&json!({"detail": "nope"})).is_none());
    }

    #[test]
    fn scalar_payload_is_a_shape_error() {
        assert!(unwrap_list::<Value>(json!("oops")).is_err());
    }

    #[test]
    fn typed_items_report_the_offending_element() {
        #[derive(Debug, Deserialize)]
        struct Faena {
            #[allow(dead_code)]
            idfaena: i64,
        }

        let err = unwrap_list::<Faena>(json!([{"idfaena": 1}, {"idfaena": "x"}])).unwrap_err();
        match err {
            Error::Deserialization { body, .. } => assert!(body.contains("\"x\"")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
