// ── Screen descriptors ──
//
// A screen is described, not coded: which columns the table shows, which
// fields the form edits, and where select fields get their choices.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::Entity;

/// Input kind of a form field.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FieldKind {
    #[default]
    Text,
    Number,
    Select,
    Checkbox,
    Textarea,
    Date,
    /// Write-only text; left out of the payload when blank.
    Password,
}

/// Where a select field's choices come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionsSource {
    pub endpoint: String,
    pub value_field: String,
    pub label_field: String,
}

impl OptionsSource {
    pub fn new(
        endpoint: impl Into<String>,
        value_field: impl Into<String>,
        label_field: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            value_field: value_field.into(),
            label_field: label_field.into(),
        }
    }
}

fn default_required() -> bool {
    true
}

/// One editable field of a screen's form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_source: Option<OptionsSource>,
    #[serde(default = "default_required")]
    pub required: bool,
    /// Initial value in create mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            options_source: None,
            required: true,
            default_value: None,
            placeholder: None,
        }
    }

    pub fn text(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    pub fn select(name: impl Into<String>, label: impl Into<String>, source: OptionsSource) -> Self {
        Self {
            options_source: Some(source),
            ..Self::new(name, label, FieldKind::Select)
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }
}

// ── Columns ─────────────────────────────────────────────────────────

/// Computes a cell value from an item.
pub type Projection<T> = Arc<dyn Fn(&T) -> Value + Send + Sync>;

/// How a column reads its value.
pub enum Accessor<T> {
    /// Dotted attribute path, e.g. `faena.nombrefaena`.
    Field(String),
    /// Arbitrary computation over the item.
    Projection(Projection<T>),
}

impl<T: Entity> Accessor<T> {
    /// The raw value for `item`; `None` when a path segment is missing.
    pub fn resolve(&self, item: &T) -> Option<Value> {
        match self {
            Self::Field(path) => item.lookup(path),
            Self::Projection(project) => Some(project(item)),
        }
    }
}

impl<T> Clone for Accessor<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Field(path) => Self::Field(path.clone()),
            Self::Projection(project) => Self::Projection(Arc::clone(project)),
        }
    }
}

impl<T> fmt::Debug for Accessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(path) => f.debug_tuple("Field").field(path).finish(),
            Self::Projection(_) => f.write_str("Projection(..)"),
        }
    }
}

/// One table column.
#[derive(Debug)]
pub struct ColumnDescriptor<T> {
    pub header: String,
    pub accessor: Accessor<T>,
}

impl<T> ColumnDescriptor<T> {
    pub fn field(header: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            accessor: Accessor::Field(path.into()),
        }
    }

    pub fn computed<F>(header: impl Into<String>, project: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        Self {
            header: header.into(),
            accessor: Accessor::Projection(Arc::new(project)),
        }
    }
}

impl<T> Clone for ColumnDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            header: self.header.clone(),
            accessor: self.accessor.clone(),
        }
    }
}
