use serde::{Deserialize, Serialize};

use crate::gateway::SortOrder;
use crate::resource::{FieldDef, FieldKind, Schema, Stamps};

pub const CATEGORY_SCHEMA: Schema = Schema {
    label: "category",
    collection: "categories",
    order: SortOrder::asc("order"),
    fields: &[
        FieldDef::required("name", FieldKind::Text),
        FieldDef::required("order", FieldKind::Integer),
    ],
    bucket: None,
    image_fields: &[],
    image_required: false,
    joins: &[],
    stamps: Stamps {
        on_insert: None,
        on_update: Some("updated_at"),
    },
    read_only: false,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    pub order: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

crate::impl_resource!(Category {
    draft: CategoryDraft,
    patch: CategoryPatch,
    schema: CATEGORY_SCHEMA,
    search: [name],
});
