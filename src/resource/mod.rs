//! The generic resource layer.
//!
//! A resource type implements [`Resource`] (usually through
//! [`impl_resource!`](crate::impl_resource)) by pointing at a [`Schema`] and
//! naming its draft and patch payloads. [`ResourceService`] then provides the
//! whole CRUD surface for it.

#[macro_use]
mod macros;
pub mod schema;
mod service;
mod users;

pub use schema::{FieldDef, FieldKind, Join, Schema, Stamps};
pub use service::{ImageEdit, ResourceService};
pub use users::UserDirectory;

use std::borrow::Cow;
use std::fmt::{Debug, Display};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ServiceError;

/// Anything a list view can show: identifiable and searchable.
pub trait ListItem: Clone + Send + Sync + 'static {
    type Id: Clone + PartialEq + Display + Debug + Send + Sync;

    /// Singular human name used in prompts ("product", "order").
    const LABEL: &'static str;

    fn id(&self) -> &Self::Id;

    /// Denormalized text the search box matches against.
    fn search_fields(&self) -> Vec<Cow<'_, str>>;
}

/// A table-backed resource type managed by [`ResourceService`].
pub trait Resource: ListItem<Id = i64> + Serialize + DeserializeOwned {
    /// Payload for create. Its `Default` gives the empty form.
    type Draft: Serialize + DeserializeOwned + Default + Debug + Send + Sync;
    /// Payload for partial update; unset fields are not sent.
    type Patch: Serialize + DeserializeOwned + Debug + Send + Sync;

    const SCHEMA: Schema;
}

/// Result of a list read. Errors never cross the service boundary as panics or
/// `Err`; a failed read is an empty `data` with `error` set.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub data: Vec<T>,
    pub error: Option<ServiceError>,
}

impl<T> Loaded<T> {
    pub fn ok(data: Vec<T>) -> Self {
        Self { data, error: None }
    }

    pub fn failed(error: ServiceError) -> Self {
        Self {
            data: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// What a list controller loads from and deletes through.
#[async_trait]
pub trait ListSource<I: ListItem>: Send + Sync {
    async fn get_all(&self) -> Loaded<I>;

    async fn delete(&self, id: &I::Id) -> Result<(), ServiceError>;
}

/// Field types that can feed [`ListItem::search_fields`].
pub trait SearchText {
    fn search_text(&self) -> Option<&str>;
}

impl SearchText for String {
    fn search_text(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl SearchText for Option<String> {
    fn search_text(&self) -> Option<&str> {
        self.as_deref()
    }
}

/// Deserializer for nullable patch fields: absent stays `None`, an explicit
/// `null` becomes `Some(None)` so a patch can clear a column.
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Deserializer that reads an explicit `null` as the type's default.
pub fn null_default<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: Deserialize<'de> + Default,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
