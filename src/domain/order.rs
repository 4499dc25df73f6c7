//! Orders and the customer/line-item documents embedded in them.
//!
//! The backend stores `user` and `products` as JSON text. They are decoded
//! into [`CustomerSnapshot`] and [`OrderLine`] when a row is read; text that
//! does not parse falls back to an empty value and logs a warning, so one bad
//! row never hides the rest of the list.

use std::borrow::Cow;

use chrono::{DateTime, Local, NaiveDate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use super::{parse_moment, Status};
use crate::gateway::SortOrder;
use crate::resource::{nullable, FieldDef, FieldKind, Join, ListItem, Resource, Schema, Stamps};

pub const DEFAULT_CURRENCY: &str = "TRY";
pub const DEFAULT_STATUS_ID: i64 = 1;

pub const ORDER_SCHEMA: Schema = Schema {
    label: "order",
    collection: "orders",
    order: SortOrder::desc("created_at"),
    fields: &[
        FieldDef::optional("user", FieldKind::Json),
        FieldDef::optional("products", FieldKind::Json),
        FieldDef::optional("total", FieldKind::Decimal),
        FieldDef::optional("currency", FieldKind::Text),
        FieldDef::required("status_id", FieldKind::Reference),
        FieldDef::optional("delivery_date", FieldKind::Date),
        FieldDef::optional("delivery_time", FieldKind::Text),
        FieldDef::optional("delivery_notes", FieldKind::Text),
        FieldDef::optional("appointment_date", FieldKind::Date),
    ],
    bucket: None,
    image_fields: &[],
    image_required: false,
    joins: &[Join {
        column: "status_id",
        collection: "status",
        into: "status",
    }],
    stamps: Stamps::NONE,
    read_only: false,
};

/// Address as stored: either one free-form line or a structured object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Address {
    Line(String),
    Structured(StructuredAddress),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Customer details copied into the order at checkout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_text")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl CustomerSnapshot {
    pub fn display_name(&self) -> &str {
        non_empty(&self.name)
            .or_else(|| non_empty(&self.email))
            .unwrap_or("Bilinmiyor")
    }

    /// Key used to count distinct customers: email, else phone, else name.
    pub fn identity(&self) -> Option<String> {
        non_empty(&self.email)
            .or_else(|| non_empty(&self.phone))
            .or_else(|| non_empty(&self.name))
            .map(|key| key.trim().to_lowercase())
    }

    /// Address components in display order, whichever layout was stored.
    pub fn address_parts(&self) -> Vec<&str> {
        let mut parts = Vec::new();
        match &self.address {
            Some(Address::Line(line)) => parts.push(line.as_str()),
            Some(Address::Structured(a)) => {
                for part in [&a.full_address, &a.district, &a.city, &a.postal_code, &a.country] {
                    parts.extend(non_empty(part));
                }
            }
            None => {}
        }
        for part in [&self.district, &self.city, &self.postal_code, &self.country] {
            if let Some(part) = non_empty(part) {
                if !parts.contains(&part) {
                    parts.push(part);
                }
            }
        }
        parts.retain(|p| !p.trim().is_empty());
        parts
    }

    pub fn formatted_address(&self) -> String {
        self.address_parts().join(", ")
    }

    fn search_texts(&self) -> Vec<&str> {
        let mut texts: Vec<&str> = [&self.name, &self.email, &self.phone]
            .into_iter()
            .filter_map(non_empty)
            .collect();
        texts.extend(self.address_parts());
        texts
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(default)]
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_image: Option<String>,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub price: f64,
}

impl OrderLine {
    pub fn subtotal(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    #[serde(default, with = "embedded")]
    pub user: CustomerSnapshot,
    #[serde(default, with = "embedded")]
    pub products: Vec<OrderLine>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub status_id: Option<i64>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub delivery_date: Option<String>,
    #[serde(default)]
    pub delivery_time: Option<String>,
    #[serde(default)]
    pub delivery_notes: Option<String>,
    #[serde(default)]
    pub appointment_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Order {
    pub fn total(&self) -> f64 {
        self.total.unwrap_or_default()
    }

    pub fn status_name(&self) -> Option<&str> {
        self.status.as_ref().map(|s| s.name.as_str())
    }

    /// Local calendar day the order was placed on.
    pub fn created_on(&self) -> Option<NaiveDate> {
        let text = self.created_at.as_deref()?;
        match DateTime::parse_from_rfc3339(text) {
            Ok(dt) => Some(dt.with_timezone(&Local).date_naive()),
            Err(_) => parse_moment(text).map(|dt| dt.date()),
        }
    }
}

impl ListItem for Order {
    type Id = i64;
    const LABEL: &'static str = ORDER_SCHEMA.label;

    fn id(&self) -> &i64 {
        &self.id
    }

    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        let mut fields = vec![Cow::Owned(self.id.to_string())];
        fields.extend(self.user.search_texts().into_iter().map(Cow::Borrowed));
        fields.extend(self.products.iter().map(|line| Cow::Borrowed(line.product_name.as_str())));
        fields
    }
}

impl Resource for Order {
    type Draft = OrderDraft;
    type Patch = OrderPatch;
    const SCHEMA: Schema = ORDER_SCHEMA;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    /// Customer snapshot as JSON text.
    pub user: Option<String>,
    /// Line items as JSON text.
    pub products: Option<String>,
    pub total: Option<f64>,
    pub currency: String,
    pub status_id: Option<i64>,
    pub delivery_date: Option<String>,
    pub delivery_time: Option<String>,
    pub delivery_notes: Option<String>,
    pub appointment_date: Option<String>,
}

impl Default for OrderDraft {
    fn default() -> Self {
        Self {
            user: None,
            products: None,
            total: None,
            currency: DEFAULT_CURRENCY.to_string(),
            status_id: Some(DEFAULT_STATUS_ID),
            delivery_date: None,
            delivery_time: None,
            delivery_notes: None,
            appointment_date: None,
        }
    }
}

impl OrderDraft {
    /// A draft for `customer` buying `lines`, totalled from the lines.
    pub fn for_customer(customer: &CustomerSnapshot, lines: &[OrderLine]) -> Result<Self, serde_json::Error> {
        Ok(Self {
            user: Some(serde_json::to_string(customer)?),
            products: Some(serde_json::to_string(lines)?),
            total: Some(lines.iter().map(OrderLine::subtotal).sum()),
            ..Self::default()
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub delivery_date: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub delivery_time: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub delivery_notes: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub appointment_date: Option<Option<String>>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Accepts strings and numbers (phone numbers and postal codes are stored both ways).
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Decodes an embedded document, which may arrive as JSON text or already
/// parsed. Anything unreadable becomes `T::default()`.
pub fn decode_or_default<T>(raw: Value) -> T
where
    T: DeserializeOwned + Default,
{
    let parsed = match raw {
        Value::Null => return T::default(),
        Value::String(text) if text.trim().is_empty() => return T::default(),
        Value::String(text) => serde_json::from_str(&text),
        other => serde_json::from_value(other),
    };
    parsed.unwrap_or_else(|e| {
        warn!(target_type = std::any::type_name::<T>(), error = %e, "Malformed embedded document, using default");
        T::default()
    })
}

/// Stored as JSON text, read leniently through [`decode_or_default`].
mod embedded {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        let text = serde_json::to_string(value).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: DeserializeOwned + Default,
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(super::decode_or_default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_embedded_text_in_both_address_layouts() {
        let flat: Order = serde_json::from_value(json!({
            "id": 1,
            "user": "{\"name\":\"Ayşe\",\"phone\":5551234567,\"address\":\"Bağdat Cd. 10\",\"district\":\"Kadıköy\",\"city\":\"İstanbul\"}",
            "products": "[{\"product_name\":\"Brake pads\",\"quantity\":2,\"price\":150.0}]",
            "total": 300.0,
            "status_id": 1
        }))
        .unwrap();
        assert_eq!(flat.user.phone.as_deref(), Some("5551234567"));
        assert_eq!(flat.user.formatted_address(), "Bağdat Cd. 10, Kadıköy, İstanbul");
        assert_eq!(flat.products[0].subtotal(), 300.0);
        assert_eq!(flat.currency, "TRY");

        let nested: Order = serde_json::from_value(json!({
            "id": 2,
            "user": {"email": "ali@example.com", "address": {"full_address": "Atatürk Bulv. 5", "city": "Ankara"}},
            "products": []
        }))
        .unwrap();
        assert_eq!(nested.user.display_name(), "ali@example.com");
        assert_eq!(nested.user.address_parts(), vec!["Atatürk Bulv. 5", "Ankara"]);
    }

    #[test]
    fn malformed_documents_fall_back_to_defaults() {
        let order: Order = serde_json::from_value(json!({
            "id": 3,
            "user": "{not json",
            "products": "\"a string, not a list\"",
            "total": null
        }))
        .unwrap();
        assert_eq!(order.user, CustomerSnapshot::default());
        assert!(order.products.is_empty());
        assert_eq!(order.total(), 0.0);
        assert_eq!(order.user.display_name(), "Bilinmiyor");
    }

    #[test]
    fn search_covers_id_customer_and_products() {
        let order: Order = serde_json::from_value(json!({
            "id": 42,
            "user": {"name": "Mehmet", "email": "m@x.com", "district": "Çankaya"},
            "products": [{"product_name": "Wiper blade"}]
        }))
        .unwrap();
        let fields: Vec<String> = order.search_fields().into_iter().map(Cow::into_owned).collect();
        assert_eq!(fields, vec!["42", "Mehmet", "m@x.com", "Çankaya", "Wiper blade"]);
    }

    #[test]
    fn embedded_documents_serialize_back_to_text() {
        let order: Order = serde_json::from_value(json!({"id": 4, "user": {"name": "Can"}})).unwrap();
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["user"], json!("{\"name\":\"Can\"}"));
        assert_eq!(value["products"], json!("[]"));
    }

    #[test]
    fn draft_defaults_and_totals() {
        let draft = OrderDraft::default();
        assert_eq!(draft.currency, DEFAULT_CURRENCY);
        assert_eq!(draft.status_id, Some(DEFAULT_STATUS_ID));

        let lines = vec![
            OrderLine {
                product_name: "Oil".into(),
                quantity: 3,
                price: 10.0,
                ..Default::default()
            },
            OrderLine {
                product_name: "Filter".into(),
                quantity: 1,
                price: 25.5,
                ..Default::default()
            },
        ];
        let draft = OrderDraft::for_customer(&CustomerSnapshot::default(), &lines).unwrap();
        assert_eq!(draft.total, Some(55.5));
        assert_eq!(draft.products.as_deref().map(|p| p.starts_with('[')), Some(true));
    }
}
