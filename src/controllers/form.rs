use std::mem;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::gateway::Record;
use crate::images::StagedImage;
use crate::resource::{ImageEdit, Resource, ResourceService};
use crate::session::SessionSubscription;

#[derive(Debug, Clone, PartialEq)]
pub enum FormState<R> {
    Create,
    Editing(R),
    Submitting,
}

/// Identifies one image shown in the form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageRef {
    /// Already stored; the value is the stored path.
    Stored(String),
    /// Picked in this session, not uploaded yet.
    Staged(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImagePreview {
    pub reference: ImageRef,
    /// Public URL for stored images, a `data:` URL for staged ones.
    pub url: String,
}

/// One create/edit session for a resource type.
pub struct FormController<R: Resource> {
    service: Arc<ResourceService<R>>,
    session: SessionSubscription,
    state: FormState<R>,
    fields: Record,
    seeded: Record,
    stored: Vec<String>,
    retained: Vec<String>,
    staged: Vec<(u64, StagedImage)>,
    next_staged: u64,
    last_error: Option<ServiceError>,
}

impl<R: Resource> FormController<R> {
    pub fn new(service: Arc<ResourceService<R>>, session: SessionSubscription) -> Self {
        let mut form = Self {
            service,
            session,
            state: FormState::Create,
            fields: Record::new(),
            seeded: Record::new(),
            stored: Vec::new(),
            retained: Vec::new(),
            staged: Vec::new(),
            next_staged: 0,
            last_error: None,
        };
        form.open_for_create();
        form
    }

    pub fn state(&self) -> &FormState<R> {
        &self.state
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.state, FormState::Submitting)
    }

    pub fn fields(&self) -> &Record {
        &self.fields
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn last_error(&self) -> Option<&ServiceError> {
        self.last_error.as_ref()
    }

    pub fn open_for_create(&mut self) {
        let defaults = to_row(&R::Draft::default());
        self.seed(FormState::Create, &defaults);
    }

    /// Seeds the form from `record`. Its stored images are kept unless removed.
    pub fn open_for_edit(&mut self, record: R) {
        let row = to_row(&record);
        debug!(id = %record.id(), "Editing");
        self.seed(FormState::Editing(record), &row);
    }

    pub fn cancel(&mut self) {
        self.open_for_create();
    }

    fn seed(&mut self, state: FormState<R>, row: &Record) {
        let schema = R::SCHEMA;
        self.state = state;
        self.fields = schema.form_values(row);
        self.seeded = self.fields.clone();
        self.stored = schema.image_paths(row);
        self.retained = self.stored.clone();
        self.staged.clear();
        self.last_error = None;
    }

    pub fn field_changed(&mut self, name: &str, value: Value) -> ServiceResult<()> {
        if self.is_submitting() {
            return Err(ServiceError::validation(name, "cannot change while submitting"));
        }
        let Some(field) = R::SCHEMA.field(name) else {
            return Err(ServiceError::validation(name, "unknown field"));
        };
        let value = field.kind.coerce(name, value)?;
        let value = if value.is_null() { field.kind.seed(None) } else { value };
        self.fields.insert(name.to_string(), value);
        Ok(())
    }

    fn image_count(&self) -> usize {
        self.retained.len() + self.staged.len()
    }

    /// `false` once the image limit is reached; the file input is hidden then.
    pub fn can_add_images(&self) -> bool {
        !self.is_submitting() && R::SCHEMA.owns_images() && self.image_count() < R::SCHEMA.max_images()
    }

    pub fn image_added(&mut self, file: StagedImage) -> ServiceResult<ImageRef> {
        let schema = R::SCHEMA;
        if !schema.owns_images() {
            return Err(ServiceError::validation("images", format!("a {} has no images", schema.label)));
        }
        if self.is_submitting() {
            return Err(ServiceError::validation("images", "cannot change while submitting"));
        }
        file.validate()?;
        if self.image_count() >= schema.max_images() {
            return Err(ServiceError::validation(
                "images",
                format!("at most {} images are allowed", schema.max_images()),
            ));
        }
        self.next_staged += 1;
        let id = self.next_staged;
        self.staged.push((id, file));
        Ok(ImageRef::Staged(id))
    }

    /// Stored images are only dropped from the next submit; nothing is deleted now.
    pub fn image_removed(&mut self, image: &ImageRef) -> bool {
        let before = self.image_count();
        match image {
            ImageRef::Stored(path) => self.retained.retain(|p| p != path),
            ImageRef::Staged(id) => self.staged.retain(|(staged, _)| staged != id),
        }
        self.image_count() != before
    }

    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    pub fn image_previews(&self) -> Vec<ImagePreview> {
        let stored = self.retained.iter().map(|path| ImagePreview {
            reference: ImageRef::Stored(path.clone()),
            url: self.service.image_url(path).unwrap_or_else(|| path.clone()),
        });
        let staged = self.staged.iter().map(|(id, file)| ImagePreview {
            reference: ImageRef::Staged(*id),
            url: file.preview_url(),
        });
        stored.chain(staged).collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.fields != self.seeded || self.retained != self.stored || !self.staged.is_empty()
    }

    pub fn validate(&self) -> ServiceResult<()> {
        R::SCHEMA.validate_required(&self.fields)?;
        if R::SCHEMA.image_required && self.image_count() == 0 {
            return Err(ServiceError::validation("image", "an image is required"));
        }
        Ok(())
    }

    /// Creates or updates through the service.
    ///
    /// On success the form returns to an empty `Create` state and the saved
    /// record is returned so the caller can reload its list. On failure the
    /// previous state is restored and the error is kept for display.
    #[instrument(skip(self), fields(resource = R::LABEL))]
    pub async fn submit(&mut self) -> ServiceResult<R> {
        if let Err(e) = self.session.require_user().and_then(|_| self.ready()) {
            self.last_error = Some(e.clone());
            return Err(e);
        }

        let prior = mem::replace(&mut self.state, FormState::Submitting);
        let result = match &prior {
            FormState::Editing(record) => self.submit_update(*record.id()).await,
            _ => self.submit_create().await,
        };

        match result {
            Ok(saved) => {
                info!(id = %saved.id(), "Saved");
                self.open_for_create();
                Ok(saved)
            }
            Err(e) => {
                warn!(error = %e, "Submit failed");
                self.state = prior;
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    fn ready(&self) -> ServiceResult<()> {
        if self.is_submitting() {
            return Err(ServiceError::validation("form", "already submitting"));
        }
        self.validate()
    }

    async fn submit_create(&self) -> ServiceResult<R> {
        let draft: R::Draft = serde_json::from_value(Value::Object(self.fields.clone()))
            .map_err(|e| ServiceError::validation("form", e.to_string()))?;
        let files = self.staged.iter().map(|(_, file)| file.clone()).collect();
        self.service.create(draft, files).await
    }

    async fn submit_update(&self, id: i64) -> ServiceResult<R> {
        let changed: Record = self
            .fields
            .iter()
            .filter(|(name, value)| self.seeded.get(name.as_str()) != Some(value))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        let patch: R::Patch = serde_json::from_value(Value::Object(changed))
            .map_err(|e| ServiceError::validation("form", e.to_string()))?;

        let images = (self.retained != self.stored || !self.staged.is_empty()).then(|| ImageEdit {
            retained: self.retained.clone(),
            staged: self.staged.iter().map(|(_, file)| file.clone()).collect(),
        });
        self.service.update(id, patch, images).await
    }

    pub fn teardown(self) {
        self.session.unsubscribe();
    }
}

fn to_row(value: &impl serde::Serialize) -> Record {
    match serde_json::to_value(value) {
        Ok(Value::Object(row)) => row,
        Ok(_) => Record::new(),
        Err(e) => {
            warn!(error = %e, "Could not read record into the form");
            Record::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Banner, Category, Product};
    use crate::gateway::{Gateway, GatewayActor, GatewayClient, MemoryConfig};
    use crate::images::ImageUrls;
    use crate::mock_framework::create_mock_gateway;
    use crate::session::SessionContext;
    use serde_json::json;

    fn png(name: &str, size: usize) -> StagedImage {
        StagedImage::new(name, "image/png", vec![7; size])
    }

    async fn setup() -> (GatewayClient, SessionContext) {
        let (actor, client) = GatewayActor::new(MemoryConfig::new().account("a@otocap.local", "pw", "A"));
        tokio::spawn(actor.run());
        let session = SessionContext::new(Arc::new(client.clone()));
        session.sign_in("a@otocap.local", "pw").await.unwrap();
        (client, session)
    }

    fn form<R: Resource>(gateway: &GatewayClient, session: &SessionContext) -> FormController<R> {
        let service = Arc::new(ResourceService::new(Arc::new(gateway.clone()), ImageUrls::new("https://cdn.test")));
        FormController::new(service, session.subscribe())
    }

    fn product_with_images(n: usize) -> Product {
        let mut row = json!({"id": 9, "name": "Pads", "category_id": 1, "price": 10.0});
        for i in 1..=n {
            row[format!("image{}", i)] = json!(format!("p{}.png", i));
        }
        serde_json::from_value(row).unwrap()
    }

    #[tokio::test]
    async fn coerces_and_rejects_unknown_fields() {
        let (gateway, session) = setup().await;
        let mut form = form::<Product>(&gateway, &session);

        form.field_changed("is_featured", json!("on")).unwrap();
        form.field_changed("price", json!("12,50")).unwrap();
        form.field_changed("quantity", json!("")).unwrap();
        assert_eq!(form.value("is_featured"), Some(&json!(true)));
        assert_eq!(form.value("price"), Some(&json!(12.5)));
        assert_eq!(form.value("quantity"), Some(&Value::Null));

        let err = form.field_changed("colour", json!("red")).unwrap_err();
        assert_eq!(err.field(), Some("colour"));
        assert!(form.is_dirty());
    }

    #[tokio::test]
    async fn oversized_image_is_not_staged() {
        let (gateway, session) = setup().await;
        let mut form = form::<Product>(&gateway, &session);

        assert!(form.image_added(png("big.png", 6 * 1024 * 1024)).is_err());
        assert_eq!(form.staged_count(), 0);
        assert!(form.image_added(StagedImage::new("a.gif", "image/gif", vec![1])).is_err());
        assert_eq!(form.staged_count(), 0);
    }

    #[tokio::test]
    async fn full_product_cannot_take_a_fifth_image() {
        let (gateway, session) = setup().await;
        let mut form = form::<Product>(&gateway, &session);
        form.open_for_edit(product_with_images(4));

        assert!(!form.can_add_images());
        assert!(form.image_added(png("five.png", 10)).is_err());
        assert_eq!(form.image_previews().len(), 4);
        assert_eq!(form.image_previews()[0].url, "https://cdn.test/products-images/p1.png");

        assert!(form.image_removed(&ImageRef::Stored("p2.png".into())));
        assert!(form.can_add_images());
        let staged = form.image_added(png("five.png", 10)).unwrap();
        assert!(!form.can_add_images());
        assert!(form.image_previews()[3].url.starts_with("data:image/png;base64,"));

        assert!(form.image_removed(&staged));
        assert_eq!(form.staged_count(), 0);
    }

    #[tokio::test]
    async fn banner_without_image_fails_before_any_gateway_call() {
        let (_, session) = setup().await;
        let (mock, mut requests) = create_mock_gateway(4);
        let mut form = form::<Banner>(&mock, &session);

        form.field_changed("title", json!("Sale")).unwrap();
        form.field_changed("start_date", json!("2024-06-01")).unwrap();
        form.field_changed("end_date", json!("2024-06-30")).unwrap();

        let err = form.submit().await.unwrap_err();
        assert_eq!(err.field(), Some("image"));
        assert_eq!(form.state(), &FormState::Create);
        assert_eq!(form.last_error(), Some(&err));

        drop(form);
        drop(mock);
        assert!(requests.recv().await.is_none());
    }

    #[tokio::test]
    async fn create_then_edit_round() {
        let (gateway, session) = setup().await;
        let mut form = form::<Category>(&gateway, &session);

        assert!(form.submit().await.unwrap_err().is_validation());
        form.field_changed("name", json!("Oils")).unwrap();
        form.field_changed("order", json!("3")).unwrap();
        let created = form.submit().await.unwrap();
        assert_eq!(created.name, "Oils");
        assert_eq!(form.state(), &FormState::Create);
        assert!(!form.is_dirty());

        form.open_for_edit(created.clone());
        assert!(!form.is_dirty());
        form.field_changed("name", json!("Engine oils")).unwrap();
        let updated = form.submit().await.unwrap();
        assert_eq!(updated.name, "Engine oils");
        assert_eq!(updated.order, Some(3));
        assert!(updated.updated_at.is_some());

        let stored = gateway.fetch("categories", created.id).await.unwrap().unwrap();
        assert_eq!(stored["order"], json!(3));
    }

    #[tokio::test]
    async fn failed_submit_restores_editing_state() {
        let (gateway, session) = setup().await;
        let mut form = form::<Category>(&gateway, &session);
        let ghost = Category {
            id: 404,
            name: "Ghost".into(),
            order: Some(1),
            created_at: None,
            updated_at: None,
        };

        form.open_for_edit(ghost.clone());
        form.field_changed("name", json!("Still ghost")).unwrap();
        let err = form.submit().await.unwrap_err();
        assert!(matches!(err, ServiceError::Constraint(_)));
        assert_eq!(form.state(), &FormState::Editing(ghost));
        assert_eq!(form.value("name"), Some(&json!("Still ghost")));
        assert!(form.last_error().is_some());

        form.cancel();
        assert_eq!(form.state(), &FormState::Create);
        assert!(form.last_error().is_none());
    }
}
