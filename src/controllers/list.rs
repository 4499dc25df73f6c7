use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::error::ServiceError;
use crate::resource::{ListItem, ListSource, Loaded};
use crate::session::SessionSubscription;

/// Interactive confirmation, e.g. a "Delete this product?" dialog.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Issued per load; only the latest ticket may apply its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Cancelled,
    Deleted,
}

/// One collection view: the loaded rows, the loading flag and the last error.
pub struct ListController<I, S>
where
    I: ListItem,
    S: ListSource<I> + ?Sized,
{
    source: Arc<S>,
    session: SessionSubscription,
    items: Vec<I>,
    loading: bool,
    error: Option<ServiceError>,
    latest: u64,
}

impl<I, S> ListController<I, S>
where
    I: ListItem,
    S: ListSource<I> + ?Sized,
{
    pub fn new(source: Arc<S>, session: SessionSubscription) -> Self {
        Self {
            source,
            session,
            items: Vec::new(),
            loading: false,
            error: None,
            latest: 0,
        }
    }

    pub fn source(&self) -> Arc<S> {
        Arc::clone(&self.source)
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.latest += 1;
        self.loading = true;
        LoadTicket(self.latest)
    }

    /// Applies a response. Returns `false` and changes nothing when a newer
    /// load has been started since `ticket` was issued.
    pub fn finish_load(&mut self, ticket: LoadTicket, loaded: Loaded<I>) -> bool {
        if ticket.0 != self.latest {
            debug!(ticket = ticket.0, latest = self.latest, "Discarding stale load");
            return false;
        }
        self.loading = false;
        self.items = loaded.data;
        self.error = loaded.error;
        true
    }

    #[instrument(skip(self), fields(resource = I::LABEL))]
    pub async fn load(&mut self) -> Result<(), ServiceError> {
        if let Err(e) = self.session.require_user() {
            self.error = Some(e.clone());
            return Err(e);
        }
        let ticket = self.begin_load();
        let loaded = self.source.get_all().await;
        self.finish_load(ticket, loaded);
        match &self.error {
            Some(e) => Err(e.clone()),
            None => {
                debug!(count = self.items.len(), "List loaded");
                Ok(())
            }
        }
    }

    /// Case-insensitive substring match over each item's search fields.
    /// An empty term returns everything in loaded order.
    pub fn filter(&self, term: &str) -> Vec<&I> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return self.items.iter().collect();
        }
        self.items
            .iter()
            .filter(|item| {
                item.search_fields()
                    .iter()
                    .any(|field| field.to_lowercase().contains(&term))
            })
            .collect()
    }

    pub fn items(&self) -> &[I] {
        &self.items
    }

    pub fn find(&self, id: &I::Id) -> Option<&I> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&ServiceError> {
        self.error.as_ref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Asks for confirmation, deletes, then reloads. On failure the error is
    /// kept and the collection is left as it was.
    #[instrument(skip(self, confirm), fields(resource = I::LABEL))]
    pub async fn request_delete(&mut self, id: &I::Id, confirm: &dyn Confirm) -> Result<DeleteOutcome, ServiceError> {
        if let Err(e) = self.session.require_user() {
            self.error = Some(e.clone());
            return Err(e);
        }
        let prompt = format!("Are you sure you want to delete this {}?", I::LABEL);
        if !confirm.confirm(&prompt) {
            debug!(%id, "Delete cancelled");
            return Ok(DeleteOutcome::Cancelled);
        }

        if let Err(e) = self.source.delete(id).await {
            warn!(%id, error = %e, "Delete failed");
            self.error = Some(e.clone());
            return Err(e);
        }
        info!(%id, "Deleted, reloading");
        // the row is gone either way; a failed reload is reported through `error()`
        let _ = self.load().await;
        Ok(DeleteOutcome::Deleted)
    }

    pub fn teardown(self) {
        self.session.unsubscribe();
    }
}
