use serde::{Deserialize, Serialize};

use crate::gateway::SortOrder;
use crate::resource::{Schema, Stamps};

/// Order statuses are a fixed lookup table; the dashboard only reads them.
pub const STATUS_SCHEMA: Schema = Schema {
    label: "status",
    collection: "status",
    order: SortOrder::asc("id"),
    fields: &[],
    bucket: None,
    image_fields: &[],
    image_required: false,
    joins: &[],
    stamps: Stamps::NONE,
    read_only: true,
};

pub const PENDING: &str = "Pending";
pub const DELIVERED: &str = "Delivered";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Status {
    /// Stored display name, else the built-in translation, else the raw name.
    pub fn label(&self) -> &str {
        match self.display_name.as_deref() {
            Some(display) if !display.is_empty() => display,
            _ => translate(&self.name),
        }
    }
}

pub fn translate(name: &str) -> &str {
    match name {
        "Pending" => "Beklemede",
        "Processing" => "İşleniyor",
        "Shipped" => "Kargoda",
        "Delivered" => "Teslim Edildi",
        "Cancelled" => "İptal Edildi",
        other => other,
    }
}

/// The five statuses the backend ships with.
pub fn default_statuses() -> Vec<Status> {
    ["Pending", "Processing", "Shipped", "Delivered", "Cancelled"]
        .into_iter()
        .zip(1..)
        .map(|(name, id)| Status {
            id,
            name: name.to_string(),
            display_name: Some(translate(name).to_string()),
        })
        .collect()
}

crate::impl_resource!(Status {
    draft: (),
    patch: (),
    schema: STATUS_SCHEMA,
    search: [name, display_name],
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_fall_back_to_translation() {
        let bare = Status {
            id: 9,
            name: "Shipped".into(),
            display_name: None,
        };
        assert_eq!(bare.label(), "Kargoda");

        let custom = Status {
            display_name: Some("Yolda".into()),
            ..bare
        };
        assert_eq!(custom.label(), "Yolda");

        assert_eq!(translate("Returned"), "Returned");
        assert_eq!(default_statuses()[0].id, 1);
    }
}
