// ── Form state ──
//
// Values are held as JSON while the form is open. Opening the form seeds
// them from descriptors (create) or from the selected item (edit); submit
// turns them into a payload containing declared fields only.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Number, Value};

use super::descriptor::{FieldDescriptor, FieldKind};
use crate::error::{CoreError, FieldError};
use crate::model::{Entity, PrimaryKey};

const REQUIRED: &str = "This field is required.";

/// What a submit will do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(PrimaryKey),
}

/// An open form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    pub mode: FormMode,
    pub values: BTreeMap<String, Value>,
    /// Banner text of the last failed submit.
    pub error: Option<String>,
    pub field_errors: Vec<FieldError>,
}

impl FormState {
    /// Empty form seeded from each field's default.
    pub fn for_create(fields: &[FieldDescriptor]) -> Self {
        let values = fields
            .iter()
            .map(|field| {
                let initial = field.default_value.clone().unwrap_or_else(|| match field.kind {
                    FieldKind::Checkbox => Value::Bool(false),
                    _ => Value::String(String::new()),
                });
                (field.name.clone(), initial)
            })
            .collect();
        Self::new(FormMode::Create, values)
    }

    /// Form pre-populated from `item`.
    ///
    /// A select field holding a nested object is reduced to that object's
    /// first `id*` attribute.
    pub fn for_edit<T: Entity>(key: PrimaryKey, item: &T, fields: &[FieldDescriptor]) -> Self {
        let values = fields
            .iter()
            .map(|field| {
                let current = item.lookup(&field.name).unwrap_or(Value::Null);
                let value = match (field.kind, current) {
                    (FieldKind::Select, Value::Object(nested)) => nested
                        .iter()
                        .find(|(name, _)| name.starts_with("id"))
                        .map_or(Value::Null, |(_, id)| id.clone()),
                    (FieldKind::Password, _) => Value::String(String::new()),
                    (_, other) => other,
                };
                (field.name.clone(), value)
            })
            .collect();
        Self::new(FormMode::Edit(key), values)
    }

    fn new(mode: FormMode, values: BTreeMap<String, Value>) -> Self {
        Self {
            mode,
            values,
            error: None,
            field_errors: Vec::new(),
        }
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn is_edit(&self) -> bool {
        matches!(self.mode, FormMode::Edit(_))
    }

    pub(crate) fn record_failure(&mut self, err: &CoreError) {
        self.error = Some(err.user_message());
        self.field_errors = err.field_errors().to_vec();
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Build the request body for a submit.
///
/// Only declared fields are sent. Blank values (`null`, `""`) are dropped,
/// which keeps an untouched password field from overwriting the stored one.
/// Values are coerced to their field's kind; required fields that are blank
/// and values that do not coerce are reported together as one
/// `ValidationFailed` error.
pub fn build_payload(
    fields: &[FieldDescriptor],
    values: &BTreeMap<String, Value>,
    mode: &FormMode,
) -> Result<Map<String, Value>, CoreError> {
    let mut payload = Map::new();
    let mut errors = Vec::new();

    for field in fields {
        let Some(raw) = values.get(&field.name).filter(|v| !is_blank(v)) else {
            let exempt = field.kind == FieldKind::Checkbox
                || (field.kind == FieldKind::Password && matches!(mode, FormMode::Edit(_)));
            if field.required && !exempt {
                errors.push(FieldError::new(&field.name, REQUIRED));
            }
            continue;
        };

        match coerce(field.kind, raw) {
            Ok(value) => {
                payload.insert(field.name.clone(), value);
            }
            Err(message) => errors.push(FieldError::new(&field.name, message)),
        }
    }

    if errors.is_empty() {
        Ok(payload)
    } else {
        Err(CoreError::validation(errors))
    }
}

fn coerce(kind: FieldKind, raw: &Value) -> Result<Value, &'static str> {
    match (kind, raw) {
        (FieldKind::Number, Value::Number(_)) | (FieldKind::Checkbox, Value::Bool(_)) => {
            Ok(raw.clone())
        }
        (FieldKind::Number, Value::String(s)) => parse_number(s).ok_or("Enter a valid number."),
        (FieldKind::Number, _) => Err("Enter a valid number."),
        (FieldKind::Checkbox, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "1" | "yes" | "sí" | "si" => Ok(Value::Bool(true)),
            "false" | "off" | "0" | "no" => Ok(Value::Bool(false)),
            _ => Err("Enter true or false."),
        },
        (FieldKind::Checkbox, _) => Err("Enter true or false."),
        (FieldKind::Select, Value::String(s)) => {
            Ok(s.trim().parse::<i64>().map_or_else(|_| raw.clone(), Value::from))
        }
        (FieldKind::Date, Value::String(s)) => {
            let valid = NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
                || DateTime::parse_from_rfc3339(s).is_ok();
            if valid {
                Ok(raw.clone())
            } else {
                Err("Enter a valid date (YYYY-MM-DD).")
            }
        }
        (FieldKind::Date, _) => Err("Enter a valid date (YYYY-MM-DD)."),
        _ => Ok(raw.clone()),
    }
}

fn parse_number(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::from(i));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::crud::descriptor::OptionsSource;
    use crate::model::Record;

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::text("nombrefaena", "Nombre"),
            FieldDescriptor::text("contacto", "Contacto").optional(),
            FieldDescriptor::new("activa", "Activa", FieldKind::Checkbox).with_default(true),
            FieldDescriptor::new("horometro", "Horómetro", FieldKind::Number).optional(),
            FieldDescriptor::select(
                "idfaena",
                "Faena",
                OptionsSource::new("faenas", "idfaena", "nombrefaena"),
            )
            .optional(),
        ]
    }

    #[test]
    fn create_seeds_defaults() {
        let form = FormState::for_create(&fields());
        assert_eq!(form.mode, FormMode::Create);
        assert_eq!(form.value("nombrefaena"), Some(&json!("")));
        assert_eq!(form.value("activa"), Some(&json!(true)));

        let plain = FormState::for_create(&[FieldDescriptor::new("ok", "Ok", FieldKind::Checkbox)]);
        assert_eq!(plain.value("ok"), Some(&json!(false)));
    }

    #[test]
    fn edit_reduces_nested_select_objects_to_their_id() {
        let item: Record = serde_json::from_value(json!({
            "idequipo": 3,
            "nombrefaena": "Pala",
            "idfaena": { "nombrefaena": "Norte", "idfaena": 9 },
            "clave": "hash",
        }))
        .unwrap();
        let mut with_password = fields();
        with_password.push(FieldDescriptor::new("clave", "Clave", FieldKind::Password));

        let form = FormState::for_edit(PrimaryKey::Int(3), &item, &with_password);

        assert_eq!(form.value("idfaena"), Some(&json!(9)));
        assert_eq!(form.value("nombrefaena"), Some(&json!("Pala")));
        assert_eq!(form.value("contacto"), Some(&Value::Null));
        assert_eq!(form.value("clave"), Some(&json!("")));
        assert!(form.is_edit());
    }

    #[test]
    fn payload_drops_blanks_and_undeclared_fields() {
        let mut form = FormState::for_create(&fields());
        form.set("nombrefaena", json!("Faena Norte"));
        form.set("horometro", json!("1250.5"));
        form.set("idfaena", json!("4"));
        form.set("undeclared", json!("x"));

        let payload = build_payload(&fields(), &form.values, &form.mode).unwrap();

        assert_eq!(
            Value::Object(payload),
            json!({
                "nombrefaena": "Faena Norte",
                "activa": true,
                "horometro": 1250.5,
                "idfaena": 4,
            })
        );
    }

    #[test]
    fn missing_required_and_bad_values_are_reported_per_field() {
        let mut form = FormState::for_create(&fields());
        form.set("horometro", json!("mucho"));

        let err = build_payload(&fields(), &form.values, &form.mode).unwrap_err();

        assert_eq!(
            err.user_message(),
            "nombrefaena: This field is required.\nhorometro: Enter a valid number."
        );
        form.record_failure(&err);
        assert_eq!(form.field_errors.len(), 2);
    }

    #[test]
    fn blank_password_is_only_required_on_create() {
        let fields = vec![FieldDescriptor::new("clave", "Clave", FieldKind::Password)];
        let values = BTreeMap::from([("clave".to_owned(), json!(""))]);

        assert!(build_payload(&fields, &values, &FormMode::Create).is_err());
        let payload = build_payload(&fields, &values, &FormMode::Edit(PrimaryKey::Int(1))).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn dates_and_checkbox_text_are_coerced() {
        assert_eq!(coerce(FieldKind::Date, &json!("2024-03-01")), Ok(json!("2024-03-01")));
        assert!(coerce(FieldKind::Date, &json!("01/03/2024")).is_err());
        assert_eq!(coerce(FieldKind::Checkbox, &json!("on")), Ok(json!(true)));
        assert_eq!(coerce(FieldKind::Select, &json!("abc")), Ok(json!("abc")));
        assert_eq!(coerce(FieldKind::Number, &json!("0")), Ok(json!(0)));
    }
}
