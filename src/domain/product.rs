use serde::{Deserialize, Serialize};

use super::NamedRef;
use crate::gateway::SortOrder;
use crate::resource::{null_default, nullable, FieldDef, FieldKind, Join, Schema, Stamps};

pub const MAX_PRODUCT_IMAGES: usize = 4;

pub const PRODUCT_SCHEMA: Schema = Schema {
    label: "product",
    collection: "products",
    order: SortOrder::asc("order_number"),
    fields: &[
        FieldDef::required("name", FieldKind::Text),
        FieldDef::required("category_id", FieldKind::Reference),
        FieldDef::optional("brand_id", FieldKind::Reference),
        FieldDef::required("price", FieldKind::Decimal),
        FieldDef::optional("quantity", FieldKind::Integer),
        FieldDef::optional("description", FieldKind::Html),
        FieldDef::optional("usage_instructions", FieldKind::Html),
        FieldDef::optional("is_featured", FieldKind::Flag),
        FieldDef::optional("order_number", FieldKind::Integer),
    ],
    bucket: Some("products-images"),
    image_fields: &["image1", "image2", "image3", "image4"],
    image_required: false,
    joins: &[
        Join {
            column: "category_id",
            collection: "categories",
            into: "category",
        },
        Join {
            column: "brand_id",
            collection: "brands",
            into: "brand",
        },
    ],
    stamps: Stamps {
        on_insert: None,
        on_update: Some("updated_at"),
    },
    read_only: false,
};

/// Represents a product in the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub brand_id: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub price: f64,
    #[serde(default)]
    pub quantity: Option<i64>,
    /// HTML.
    #[serde(default)]
    pub description: Option<String>,
    /// HTML.
    #[serde(default)]
    pub usage_instructions: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub is_featured: bool,
    #[serde(default)]
    pub order_number: Option<i64>,
    #[serde(default)]
    pub image1: Option<String>,
    #[serde(default)]
    pub image2: Option<String>,
    #[serde(default)]
    pub image3: Option<String>,
    #[serde(default)]
    pub image4: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub category: Option<NamedRef>,
    #[serde(default)]
    pub brand: Option<NamedRef>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

impl Product {
    pub fn category_name(&self) -> Option<&str> {
        self.category.as_ref().map(|c| c.name.as_str())
    }

    pub fn brand_name(&self) -> Option<&str> {
        self.brand.as_ref().map(|b| b.name.as_str())
    }

    pub fn image_count(&self) -> usize {
        [&self.image1, &self.image2, &self.image3, &self.image4]
            .iter()
            .filter(|i| i.as_deref().is_some_and(|p| !p.is_empty()))
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub category_id: Option<i64>,
    pub brand_id: Option<i64>,
    pub price: Option<f64>,
    pub quantity: Option<i64>,
    pub description: String,
    pub usage_instructions: String,
    pub is_featured: bool,
    pub order_number: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub brand_id: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub quantity: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub order_number: Option<Option<i64>>,
}

crate::impl_resource!(Product {
    draft: ProductDraft,
    patch: ProductPatch,
    schema: PRODUCT_SCHEMA,
    search: [name],
});
