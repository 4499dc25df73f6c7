//! Resource types managed by the dashboard.

pub mod banner;
pub mod blog;
pub mod brand;
pub mod category;
pub mod order;
pub mod product;
pub mod status;
pub mod user;

pub use banner::*;
pub use blog::*;
pub use brand::*;
pub use category::*;
pub use order::*;
pub use product::*;
pub use status::*;
pub use user::*;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// The seven manageable resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Orders,
    Products,
    Categories,
    Brands,
    Blogs,
    Banners,
    Users,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Orders,
        ResourceKind::Products,
        ResourceKind::Categories,
        ResourceKind::Brands,
        ResourceKind::Blogs,
        ResourceKind::Banners,
        ResourceKind::Users,
    ];

    /// Route path of the resource's page.
    pub fn path(self) -> &'static str {
        match self {
            ResourceKind::Orders => "/orders",
            ResourceKind::Products => "/products",
            ResourceKind::Categories => "/categories",
            ResourceKind::Brands => "/brands",
            ResourceKind::Blogs => "/blogs",
            ResourceKind::Banners => "/banners",
            ResourceKind::Users => "/users",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.trim_end_matches('/');
        Self::ALL.into_iter().find(|kind| kind.path() == path)
    }

    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Orders => ORDER_SCHEMA.label,
            ResourceKind::Products => PRODUCT_SCHEMA.label,
            ResourceKind::Categories => CATEGORY_SCHEMA.label,
            ResourceKind::Brands => BRAND_SCHEMA.label,
            ResourceKind::Blogs => BLOG_SCHEMA.label,
            ResourceKind::Banners => BANNER_SCHEMA.label,
            ResourceKind::Users => "user",
        }
    }
}

/// Lookup row embedded by a join (`category`, `brand`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// Parses a timestamp the way the backend and the form inputs write them:
/// RFC 3339, `datetime-local` (`2024-05-01T10:30`), or a bare date.
pub fn parse_moment(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_round_trip() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_path(kind.path()), Some(kind));
        }
        assert_eq!(ResourceKind::from_path("/products/"), Some(ResourceKind::Products));
        assert_eq!(ResourceKind::from_path(LOGIN_PATH), None);
    }

    #[test]
    fn moments_in_every_stored_layout() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(parse_moment("2024-05-01T10:30:00+00:00"), Some(expected));
        assert_eq!(parse_moment("2024-05-01T10:30"), Some(expected));
        assert_eq!(parse_moment("2024-05-01").map(|d| d.date()), Some(expected.date()));
        assert_eq!(parse_moment("soon"), None);
    }
}
