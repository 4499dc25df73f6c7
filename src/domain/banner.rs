use chrono::{Days, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::parse_moment;
use crate::gateway::SortOrder;
use crate::resource::{null_default, nullable, FieldDef, FieldKind, Schema, Stamps};

pub const BANNER_SCHEMA: Schema = Schema {
    label: "banner",
    collection: "banners",
    order: SortOrder::desc("created_at"),
    fields: &[
        FieldDef::optional("title", FieldKind::Text),
        FieldDef::optional("sub_title", FieldKind::Text),
        FieldDef::optional("btn_text", FieldKind::Text),
        FieldDef::optional("add_link", FieldKind::Text),
        FieldDef::optional("add_button", FieldKind::Flag),
        FieldDef::required("start_date", FieldKind::Date),
        FieldDef::required("end_date", FieldKind::Date),
    ],
    bucket: Some("banner-images"),
    image_fields: &["image"],
    image_required: true,
    joins: &[],
    stamps: Stamps::NONE,
    read_only: false,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sub_title: Option<String>,
    #[serde(default)]
    pub btn_text: Option<String>,
    #[serde(default)]
    pub add_link: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub add_button: bool,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

impl Banner {
    /// Whether the banner is scheduled at `now`. Both bounds are inclusive;
    /// a bare end date covers that whole day.
    pub fn is_active(&self, now: NaiveDateTime) -> bool {
        let start = self.start_date.as_deref().and_then(parse_moment);
        let end = self.end_date.as_deref().and_then(|text| {
            let end = parse_moment(text)?;
            if text.trim().len() == 10 {
                end.checked_add_days(Days::new(1)).map(|next| next - chrono::Duration::nanoseconds(1))
            } else {
                Some(end)
            }
        });
        match (start, end) {
            (Some(start), Some(end)) => start <= now && now <= end,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BannerDraft {
    pub title: String,
    pub sub_title: String,
    pub btn_text: String,
    pub add_link: String,
    pub add_button: bool,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BannerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub title: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub sub_title: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub btn_text: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub add_link: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_button: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

crate::impl_resource!(Banner {
    draft: BannerDraft,
    patch: BannerPatch,
    schema: BANNER_SCHEMA,
    search: [title, sub_title],
});
