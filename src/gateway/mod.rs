//! The remote data gateway boundary.
//!
//! Everything the admin core knows about the hosted backend goes through the
//! [`Gateway`] trait: collection-scoped row operations, bucket-scoped object
//! storage, and the two auth lookups the dashboard needs. Rows cross this
//! boundary as untyped JSON objects ([`Record`]); typing happens one layer up in
//! the resource services.
//!
//! [`GatewayActor`] is an in-process implementation: a single task owning all
//! tables and buckets, reached through cloneable [`GatewayClient`] handles.

mod client;
mod error;
pub mod memory;
pub mod messages;

pub use client::GatewayClient;
pub use error::GatewayError;
pub use memory::{GatewayActor, MemoryConfig};
pub use messages::GatewayRequest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A row as stored by the backend.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Sort applied by `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub column: &'static str,
    pub ascending: bool,
}

impl SortOrder {
    pub const fn asc(column: &'static str) -> Self {
        Self { column, ascending: true }
    }

    pub const fn desc(column: &'static str) -> Self {
        Self { column, ascending: false }
    }
}

/// Credentials attached to a gateway handle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    #[default]
    Anonymous,
    /// Elevated key. Required by [`Gateway::list_all_users`].
    ServiceRole(String),
}

/// An account known to the backend's auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: String,
}

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn list(&self, collection: &str, order: SortOrder) -> Result<Vec<Record>, GatewayError>;

    async fn fetch(&self, collection: &str, id: i64) -> Result<Option<Record>, GatewayError>;

    async fn insert(&self, collection: &str, record: Record) -> Result<Record, GatewayError>;

    /// Merge `partial` into the row. Keys absent from `partial` are untouched.
    async fn update(&self, collection: &str, id: i64, partial: Record) -> Result<Record, GatewayError>;

    async fn remove(&self, collection: &str, id: i64) -> Result<(), GatewayError>;

    /// Store `bytes` under `name` and return the stored path.
    async fn upload_object(&self, bucket: &str, name: &str, bytes: Vec<u8>) -> Result<String, GatewayError>;

    /// Release objects. Paths that do not exist are ignored.
    async fn remove_objects(&self, bucket: &str, paths: &[String]) -> Result<(), GatewayError>;

    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>, GatewayError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, GatewayError>;

    /// Privileged: fails with `Unauthorized` unless the handle carries service-role credentials.
    async fn list_all_users(&self) -> Result<Vec<AuthUser>, GatewayError>;
}
