use serde::{Deserialize, Serialize};

use crate::gateway::SortOrder;
use crate::resource::{FieldDef, FieldKind, Schema, Stamps};

pub const BRAND_SCHEMA: Schema = Schema {
    label: "brand",
    collection: "brands",
    order: SortOrder::asc("order"),
    fields: &[
        FieldDef::required("name", FieldKind::Text),
        FieldDef::required("order", FieldKind::Integer),
    ],
    bucket: Some("brands-images"),
    image_fields: &["image"],
    image_required: false,
    joins: &[],
    stamps: Stamps {
        on_insert: None,
        on_update: Some("updated_at"),
    },
    read_only: false,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Public URL of `image`, when set.
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandDraft {
    pub name: String,
    pub order: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

crate::impl_resource!(Brand {
    draft: BrandDraft,
    patch: BrandPatch,
    schema: BRAND_SCHEMA,
    search: [name],
});
