use std::sync::Arc;

use tracing::{instrument, warn};

use super::form::FormController;
use super::list::{Confirm, DeleteOutcome, ListController};
use crate::error::{ServiceError, ServiceResult};
use crate::resource::{Resource, ResourceService};
use crate::session::SessionContext;

/// A resource page: one list and one form over the same service.
/// A successful submit reloads the list.
pub struct AdminPage<R: Resource> {
    list: ListController<R, ResourceService<R>>,
    form: FormController<R>,
}

impl<R: Resource> AdminPage<R> {
    pub fn new(service: Arc<ResourceService<R>>, session: &SessionContext) -> Self {
        Self {
            list: ListController::new(Arc::clone(&service), session.subscribe()),
            form: FormController::new(service, session.subscribe()),
        }
    }

    pub fn list(&self) -> &ListController<R, ResourceService<R>> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut ListController<R, ResourceService<R>> {
        &mut self.list
    }

    pub fn form(&self) -> &FormController<R> {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormController<R> {
        &mut self.form
    }

    pub async fn open(&mut self) -> ServiceResult<()> {
        self.list.load().await
    }

    /// Opens the form on a loaded record.
    pub fn edit(&mut self, id: i64) -> ServiceResult<()> {
        let record = self
            .list
            .find(&id)
            .cloned()
            .ok_or_else(|| ServiceError::Constraint(format!("{} {} is not loaded", R::LABEL, id)))?;
        self.form.open_for_edit(record);
        Ok(())
    }

    #[instrument(skip(self), fields(resource = R::LABEL))]
    pub async fn submit(&mut self) -> ServiceResult<R> {
        let saved = self.form.submit().await?;
        if let Err(e) = self.list.load().await {
            warn!(error = %e, "Reload after submit failed");
        }
        Ok(saved)
    }

    pub async fn delete(&mut self, id: i64, confirm: &dyn Confirm) -> ServiceResult<DeleteOutcome> {
        self.list.request_delete(&id, confirm).await
    }

    pub fn teardown(self) {
        self.list.teardown();
        self.form.teardown();
    }
}
