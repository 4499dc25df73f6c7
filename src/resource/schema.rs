//! Declarative per-resource schema.
//!
//! A [`Schema`] is everything the generic service and form controller need to
//! know about a resource type: where it lives, how it sorts, which fields a
//! form edits, which fields hold images, and which lookups get joined in.

use serde_json::Value;

use crate::error::ServiceError;
use crate::gateway::{Record, SortOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Rich text; empty markup such as `<p></p>` counts as blank.
    Html,
    Integer,
    Decimal,
    /// Checkbox.
    Flag,
    /// Date or datetime as entered.
    Date,
    /// Id of a row in another collection.
    Reference,
    /// Embedded JSON document, stored as text.
    Json,
}

impl FieldKind {
    /// Converts a raw form value into the stored representation.
    pub fn coerce(self, name: &str, value: Value) -> Result<Value, ServiceError> {
        match (self, value) {
            (FieldKind::Flag, Value::Bool(b)) => Ok(Value::Bool(b)),
            (FieldKind::Flag, Value::String(s)) => {
                let s = s.trim().to_ascii_lowercase();
                Ok(Value::Bool(matches!(s.as_str(), "true" | "on" | "1" | "yes")))
            }
            (FieldKind::Flag, Value::Number(n)) => Ok(Value::Bool(n.as_f64().unwrap_or_default() != 0.0)),
            (FieldKind::Flag, Value::Null) => Ok(Value::Bool(false)),

            (FieldKind::Integer | FieldKind::Reference, Value::String(s)) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(Value::Null);
                }
                s.parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| ServiceError::validation(name, format!("{:?} is not a whole number", s)))
            }
            (FieldKind::Integer | FieldKind::Reference, Value::Number(n)) => match n.as_i64() {
                Some(i) => Ok(Value::from(i)),
                None => Err(ServiceError::validation(name, format!("{} is not a whole number", n))),
            },

            (FieldKind::Decimal, Value::String(s)) => {
                let s = s.trim().replace(',', ".");
                if s.is_empty() {
                    return Ok(Value::Null);
                }
                s.parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| ServiceError::validation(name, format!("{:?} is not a number", s)))
            }
            (FieldKind::Decimal, Value::Number(n)) => Ok(Value::Number(n)),

            (FieldKind::Date, Value::String(s)) if s.trim().is_empty() => Ok(Value::Null),
            (FieldKind::Text | FieldKind::Html | FieldKind::Date, Value::String(s)) => Ok(Value::String(s)),
            (FieldKind::Text | FieldKind::Html, Value::Number(n)) => Ok(Value::String(n.to_string())),

            (FieldKind::Json, Value::String(s)) => Ok(Value::String(s)),
            (FieldKind::Json, v @ (Value::Object(_) | Value::Array(_))) => Ok(Value::String(v.to_string())),

            (_, Value::Null) => Ok(Value::Null),
            (kind, other) => Err(ServiceError::validation(
                name,
                format!("unexpected value {} for a {:?} field", other, kind),
            )),
        }
    }

    /// Normalizes a stored value for seeding a form.
    pub fn seed(self, value: Option<&Value>) -> Value {
        match (self, value) {
            (FieldKind::Text | FieldKind::Html, None | Some(Value::Null)) => Value::String(String::new()),
            (FieldKind::Flag, None | Some(Value::Null)) => Value::Bool(false),
            (_, None) => Value::Null,
            (_, Some(v)) => v.clone(),
        }
    }

    fn is_blank(self, value: Option<&Value>) -> bool {
        match value {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) if self == FieldKind::Html => strip_markup(s).trim().is_empty(),
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        }
    }
}

fn strip_markup(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.replace("&nbsp;", " ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldDef {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, required: true }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, required: false }
    }
}

/// Lookup row embedded into each listed record: the row of `collection` whose
/// id equals `column` is inserted under `into`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Join {
    pub column: &'static str,
    pub collection: &'static str,
    pub into: &'static str,
}

/// Timestamp columns stamped by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stamps {
    pub on_insert: Option<&'static str>,
    pub on_update: Option<&'static str>,
}

impl Stamps {
    pub const NONE: Stamps = Stamps { on_insert: None, on_update: None };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    /// Singular human name, used in prompts and logs.
    pub label: &'static str,
    pub collection: &'static str,
    pub order: SortOrder,
    /// Form-editable fields, image fields excluded.
    pub fields: &'static [FieldDef],
    pub bucket: Option<&'static str>,
    /// Columns holding image filenames, in display order.
    pub image_fields: &'static [&'static str],
    pub image_required: bool,
    pub joins: &'static [Join],
    pub stamps: Stamps,
    /// Lookup tables the dashboard may list but never change.
    pub read_only: bool,
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fails with `Constraint` for read-only types.
    pub fn check_writable(&self) -> Result<(), ServiceError> {
        if self.read_only {
            return Err(ServiceError::Constraint(format!("{} records are read-only", self.label)));
        }
        Ok(())
    }

    pub fn owns_images(&self) -> bool {
        self.bucket.is_some() && !self.image_fields.is_empty()
    }

    pub fn max_images(&self) -> usize {
        if self.owns_images() {
            self.image_fields.len()
        } else {
            0
        }
    }

    /// Every required field must be present and non-blank.
    pub fn validate_required(&self, record: &Record) -> Result<(), ServiceError> {
        for field in self.fields.iter().filter(|f| f.required) {
            if field.kind.is_blank(record.get(field.name)) {
                return Err(ServiceError::validation(field.name, "is required"));
            }
        }
        Ok(())
    }

    /// Like [`validate_required`](Self::validate_required) but only for the
    /// fields a partial update actually carries.
    pub fn validate_partial(&self, partial: &Record) -> Result<(), ServiceError> {
        for field in self.fields.iter().filter(|f| f.required) {
            if partial.contains_key(field.name) && field.kind.is_blank(partial.get(field.name)) {
                return Err(ServiceError::validation(field.name, "cannot be cleared"));
            }
        }
        Ok(())
    }

    /// Non-empty image filenames stored on `record`, in field order.
    pub fn image_paths(&self, record: &Record) -> Vec<String> {
        self.image_fields
            .iter()
            .filter_map(|f| record.get(*f).and_then(Value::as_str))
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Writes `paths` into the image fields in order; leftover fields become null.
    pub fn assign_images(&self, record: &mut Record, paths: &[String]) {
        for (i, field) in self.image_fields.iter().enumerate() {
            let value = paths.get(i).map_or(Value::Null, |p| Value::String(p.clone()));
            record.insert(field.to_string(), value);
        }
    }

    /// Form values for `record`, restricted to the editable fields.
    pub fn form_values(&self, record: &Record) -> Record {
        self.fields
            .iter()
            .map(|f| (f.name.to_string(), f.kind.seed(record.get(f.name))))
            .collect()
    }
}
