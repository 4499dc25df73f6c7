use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, instrument};

use super::{ListSource, Loaded};
use crate::domain::AdminUser;
use crate::error::ServiceError;
use crate::gateway::Gateway;

/// Read-only view over the auth service's accounts.
///
/// Listing accounts is privileged, so the directory must be built over a
/// gateway handle carrying service-role credentials. With anything else every
/// load reports `Unauthorized`.
pub struct UserDirectory {
    gateway: Arc<dyn Gateway>,
}

impl UserDirectory {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    #[instrument(skip(self))]
    pub async fn get_all(&self) -> Loaded<AdminUser> {
        match self.gateway.list_all_users().await {
            Ok(users) => {
                debug!(count = users.len(), "Users loaded");
                Loaded::ok(users.into_iter().map(AdminUser::from).collect())
            }
            Err(e) => {
                error!(error = %e, "Error fetching users");
                Loaded::failed(e.into())
            }
        }
    }
}

#[async_trait]
impl ListSource<AdminUser> for UserDirectory {
    async fn get_all(&self) -> Loaded<AdminUser> {
        UserDirectory::get_all(self).await
    }

    async fn delete(&self, _id: &String) -> Result<(), ServiceError> {
        Err(ServiceError::Constraint("users are managed by the auth service".to_string()))
    }
}
