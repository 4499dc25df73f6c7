use serde::{Deserialize, Serialize};

use crate::gateway::SortOrder;
use crate::resource::{null_default, nullable, FieldDef, FieldKind, Schema, Stamps};

pub const BLOG_SCHEMA: Schema = Schema {
    label: "blog post",
    collection: "blogs",
    order: SortOrder::asc("order"),
    fields: &[
        FieldDef::required("title", FieldKind::Text),
        FieldDef::optional("sub_title", FieldKind::Text),
        FieldDef::optional("description", FieldKind::Html),
        FieldDef::optional("is_featured", FieldKind::Flag),
        FieldDef::required("order", FieldKind::Integer),
    ],
    bucket: Some("blogs-images"),
    image_fields: &["image"],
    image_required: false,
    joins: &[],
    // the column really is spelled `created_add`
    stamps: Stamps {
        on_insert: Some("created_add"),
        on_update: None,
    },
    read_only: false,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blog {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub sub_title: Option<String>,
    /// HTML.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub is_featured: bool,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub created_add: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlogDraft {
    pub title: String,
    pub sub_title: String,
    pub description: String,
    pub is_featured: bool,
    pub order: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlogPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub sub_title: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

crate::impl_resource!(Blog {
    draft: BlogDraft,
    patch: BlogPatch,
    schema: BLOG_SCHEMA,
    search: [title, sub_title],
});
