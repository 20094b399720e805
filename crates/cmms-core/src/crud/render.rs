// ── Table rendering ──
//
// Turns items plus column descriptors into display strings. Absent values,
// `null` and empty strings show the placeholder; booleans show the
// localised yes/no tokens; `0` and `false` are real values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::descriptor::ColumnDescriptor;
use crate::model::{Entity, PrimaryKey};

/// Words used for booleans and missing values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayTokens {
    pub yes: String,
    pub no: String,
    pub placeholder: String,
}

impl Default for DisplayTokens {
    fn default() -> Self {
        Self {
            yes: "Yes".into(),
            no: "No".into(),
            placeholder: "N/A".into(),
        }
    }
}

impl DisplayTokens {
    /// Tokens used by the Spanish-language console.
    pub fn spanish() -> Self {
        Self {
            yes: "Sí".into(),
            no: "No".into(),
            placeholder: "N/A".into(),
        }
    }

    /// Pick tokens for a locale tag such as `es` or `es-CL`.
    pub fn for_locale(locale: &str) -> Self {
        if locale.to_ascii_lowercase().starts_with("es") {
            Self::spanish()
        } else {
            Self::default()
        }
    }
}

/// Display text of a cell.
pub fn display_value(value: Option<&Value>, tokens: &DisplayTokens) -> String {
    match value {
        None | Some(Value::Null) => tokens.placeholder.clone(),
        Some(Value::Bool(true)) => tokens.yes.clone(),
        Some(Value::Bool(false)) => tokens.no.clone(),
        Some(Value::String(s)) if s.is_empty() => tokens.placeholder.clone(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Array(items)) if items.is_empty() => tokens.placeholder.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| display_value(Some(item), tokens))
            .collect::<Vec<_>>()
            .join(", "),
        Some(object @ Value::Object(_)) => object.to_string(),
    }
}

/// Text of a value without display tokens (strings unquoted).
pub fn plain_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One rendered row, keyed by the item's primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub key: Option<PrimaryKey>,
    pub cells: Vec<String>,
}

/// A fully rendered table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableView {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

pub fn render_table<T: Entity>(
    items: &[T],
    columns: &[ColumnDescriptor<T>],
    pk_field: &str,
    tokens: &DisplayTokens,
) -> TableView {
    let headers = columns.iter().map(|c| c.header.clone()).collect();
    let rows = items
        .iter()
        .map(|item| Row {
            key: item.primary_key(pk_field),
            cells: columns
                .iter()
                .map(|c| display_value(c.accessor.resolve(item).as_ref(), tokens))
                .collect(),
        })
        .collect();
    TableView { headers, rows }
}
