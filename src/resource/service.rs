use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use super::{ListSource, Loaded, Resource};
use crate::error::{ServiceError, ServiceResult};
use crate::gateway::{Gateway, Record, SortOrder};
use crate::images::{ImageUrls, StagedImage};

/// Image changes carried by an update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageEdit {
    /// Stored paths the caller keeps, in display order.
    pub retained: Vec<String>,
    /// New files to upload after the retained ones.
    pub staged: Vec<StagedImage>,
}

/// CRUD for one resource type over the gateway.
///
/// Shapes rows on the way out (joined lookups, resolved image URLs) and owns
/// the upload/release bookkeeping for image-bearing types.
pub struct ResourceService<R: Resource> {
    gateway: Arc<dyn Gateway>,
    urls: ImageUrls,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> ResourceService<R> {
    pub fn new(gateway: Arc<dyn Gateway>, urls: ImageUrls) -> Self {
        Self {
            gateway,
            urls,
            _resource: PhantomData,
        }
    }

    /// Public URL of a stored image of this type.
    pub fn image_url(&self, path: &str) -> Option<String> {
        R::SCHEMA.bucket.map(|bucket| self.urls.resolve(bucket, path))
    }

    /// All rows in canonical order. Failures are reported in `Loaded::error`.
    #[instrument(skip(self), fields(collection = R::SCHEMA.collection))]
    pub async fn get_all(&self) -> Loaded<R> {
        match self.try_get_all().await {
            Ok(data) => {
                debug!(count = data.len(), "Rows loaded");
                Loaded::ok(data)
            }
            Err(e) => {
                error!(error = %e, "Error fetching rows");
                Loaded::failed(e)
            }
        }
    }

    async fn try_get_all(&self) -> ServiceResult<Vec<R>> {
        let schema = R::SCHEMA;
        let rows = self.gateway.list(schema.collection, schema.order).await?;
        let lookups = self.load_joins().await?;
        Ok(rows.into_iter().filter_map(|row| self.shape(row, &lookups)).collect())
    }

    #[instrument(skip(self), fields(collection = R::SCHEMA.collection))]
    pub async fn get(&self, id: i64) -> ServiceResult<R> {
        let row = self.fetch_existing(id).await?;
        self.shape_fresh(row).await
    }

    /// Validates, uploads staged files, then inserts.
    ///
    /// Nothing reaches the gateway if validation fails. If an upload or the
    /// insert fails, every object uploaded by this call is released again.
    #[instrument(skip(self, draft, files), fields(collection = R::SCHEMA.collection, files = files.len()))]
    pub async fn create(&self, draft: R::Draft, files: Vec<StagedImage>) -> ServiceResult<R> {
        let schema = R::SCHEMA;
        schema.check_writable()?;
        let mut record = to_record("draft", &draft)?;
        schema.validate_required(&record)?;
        check_images::<R>(0, &files)?;

        if let Some(column) = schema.stamps.on_insert {
            record.insert(column.to_string(), Value::String(chrono::Utc::now().to_rfc3339()));
        }

        let uploaded = self.upload_all(&files).await?;
        if schema.owns_images() {
            schema.assign_images(&mut record, &uploaded);
        }

        match self.gateway.insert(schema.collection, record).await {
            Ok(row) => {
                info!(id = ?row.get("id"), "Row created");
                self.shape_fresh(row).await
            }
            Err(e) => {
                error!(error = %e, "Insert failed");
                self.release(&uploaded, "insert failed").await;
                Err(e.into())
            }
        }
    }

    /// Partial update. Fields the patch leaves unset keep their stored value;
    /// `images: None` leaves the image columns alone.
    ///
    /// With an [`ImageEdit`], the stored images become `retained` followed by
    /// as many staged files as still fit. Stored images that were not retained
    /// are released once the update succeeds.
    #[instrument(skip(self, patch, images), fields(collection = R::SCHEMA.collection))]
    pub async fn update(&self, id: i64, patch: R::Patch, images: Option<ImageEdit>) -> ServiceResult<R> {
        let schema = R::SCHEMA;
        schema.check_writable()?;
        let mut partial = to_record("patch", &patch)?;
        partial.remove("id");
        schema.validate_partial(&partial)?;

        let mut uploaded = Vec::new();
        let mut dropped = Vec::new();
        if let Some(edit) = images {
            if !schema.owns_images() {
                return Err(ServiceError::validation("images", format!("a {} has no images", schema.label)));
            }
            for file in &edit.staged {
                file.validate()?;
            }

            let current = schema.image_paths(&self.fetch_existing(id).await?);
            let retained: Vec<String> = edit
                .retained
                .into_iter()
                .filter(|path| {
                    let known = current.contains(path);
                    if !known {
                        warn!(path = %path, "Ignoring retained image not stored on this row");
                    }
                    known
                })
                .collect();

            let capacity = schema.max_images().saturating_sub(retained.len());
            if edit.staged.len() > capacity {
                warn!(staged = edit.staged.len(), capacity, "Dropping staged images beyond the limit");
            }
            let to_upload = &edit.staged[..edit.staged.len().min(capacity)];
            if schema.image_required && retained.is_empty() && to_upload.is_empty() {
                return Err(ServiceError::validation("image", "an image is required"));
            }

            uploaded = self.upload_all(to_upload).await?;
            let mut paths = retained;
            paths.extend(uploaded.iter().cloned());
            paths.truncate(schema.max_images());
            schema.assign_images(&mut partial, &paths);
            dropped = current.into_iter().filter(|p| !paths.contains(p)).collect();
        }

        if let Some(column) = schema.stamps.on_update {
            partial.insert(column.to_string(), Value::String(chrono::Utc::now().to_rfc3339()));
        }

        match self.gateway.update(schema.collection, id, partial).await {
            Ok(row) => {
                info!(id, "Row updated");
                self.release(&dropped, "no longer retained").await;
                self.shape_fresh(row).await
            }
            Err(e) => {
                error!(id, error = %e, "Update failed");
                self.release(&uploaded, "update failed").await;
                Err(e.into())
            }
        }
    }

    /// Deletes a row, then releases the images it held.
    ///
    /// For image-bearing types the row is read before anything else; if that
    /// read fails the delete is aborted. Images are only released once the
    /// row is gone, so a rejected delete leaves the row and its images intact.
    #[instrument(skip(self), fields(collection = R::SCHEMA.collection))]
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        let schema = R::SCHEMA;
        schema.check_writable()?;
        let paths = if schema.owns_images() {
            let current = self.fetch_existing(id).await.map_err(|e| {
                error!(id, error = %e, "Pre-read failed, delete aborted");
                e
            })?;
            schema.image_paths(&current)
        } else {
            Vec::new()
        };

        self.gateway.remove(schema.collection, id).await.map_err(|e| {
            error!(id, error = %e, "Delete failed");
            ServiceError::from(e)
        })?;
        info!(id, "Row deleted");

        if let Some(bucket) = schema.bucket.filter(|_| !paths.is_empty()) {
            match self.gateway.remove_objects(bucket, &paths).await {
                Ok(()) => debug!(count = paths.len(), "Images released"),
                Err(e) => error!(id, count = paths.len(), error = %e, "Could not release images of deleted row"),
            }
        }
        Ok(())
    }

    /// Releases one stored image and clears its column.
    #[instrument(skip(self), fields(collection = R::SCHEMA.collection))]
    pub async fn remove_image(&self, id: i64, field: &str) -> ServiceResult<R> {
        let schema = R::SCHEMA;
        schema.check_writable()?;
        let bucket = match schema.bucket {
            Some(bucket) if schema.image_fields.contains(&field) => bucket,
            _ => return Err(ServiceError::validation(field, "is not an image field")),
        };
        let current = self.fetch_existing(id).await?;
        if let Some(path) = current.get(field).and_then(Value::as_str).filter(|p| !p.is_empty()) {
            self.gateway.remove_objects(bucket, &[path.to_string()]).await?;
        }

        let mut partial = Record::new();
        partial.insert(field.to_string(), Value::Null);
        if let Some(column) = schema.stamps.on_update {
            partial.insert(column.to_string(), Value::String(chrono::Utc::now().to_rfc3339()));
        }
        let row = self.gateway.update(schema.collection, id, partial).await?;
        info!(id, field, "Image removed");
        self.shape_fresh(row).await
    }

    async fn fetch_existing(&self, id: i64) -> ServiceResult<Record> {
        let collection = R::SCHEMA.collection;
        self.gateway
            .fetch(collection, id)
            .await?
            .ok_or_else(|| ServiceError::Constraint(format!("{} {} does not exist", R::SCHEMA.label, id)))
    }

    async fn load_joins(&self) -> ServiceResult<Vec<HashMap<i64, Record>>> {
        let mut lookups = Vec::with_capacity(R::SCHEMA.joins.len());
        for join in R::SCHEMA.joins {
            let rows = self.gateway.list(join.collection, SortOrder::asc("id")).await?;
            let index = rows
                .into_iter()
                .filter_map(|row| row.get("id").and_then(Value::as_i64).map(|id| (id, row)))
                .collect();
            lookups.push(index);
        }
        Ok(lookups)
    }

    /// Shapes a row returned by a mutation. Lookup failures only cost the joined fields.
    async fn shape_fresh(&self, row: Record) -> ServiceResult<R> {
        let lookups = self.load_joins().await.unwrap_or_else(|e| {
            warn!(error = %e, "Lookups unavailable, returning row without them");
            Vec::new()
        });
        self.shape(row, &lookups)
            .ok_or_else(|| ServiceError::Transport(format!("malformed {} row", R::SCHEMA.label)))
    }

    fn shape(&self, mut row: Record, lookups: &[HashMap<i64, Record>]) -> Option<R> {
        let schema = R::SCHEMA;
        for (join, index) in schema.joins.iter().zip(lookups) {
            let target = row
                .get(join.column)
                .and_then(Value::as_i64)
                .and_then(|id| index.get(&id))
                .cloned();
            if let Some(target) = target {
                row.insert(join.into.to_string(), Value::Object(target));
            }
        }
        if let Some(bucket) = schema.bucket {
            let urls = schema
                .image_paths(&row)
                .iter()
                .map(|path| Value::String(self.urls.resolve(bucket, path)))
                .collect();
            row.insert("image_urls".into(), Value::Array(urls));
        }

        match serde_json::from_value(Value::Object(row)) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Skipping malformed row");
                None
            }
        }
    }

    async fn upload_all(&self, files: &[StagedImage]) -> ServiceResult<Vec<String>> {
        let Some(bucket) = R::SCHEMA.bucket else {
            return Ok(Vec::new());
        };
        let mut uploaded = Vec::with_capacity(files.len());
        for file in files {
            match self.gateway.upload_object(bucket, &file.object_name(), file.bytes.clone()).await {
                Ok(path) => uploaded.push(path),
                Err(e) => {
                    error!(file = %file.file_name, error = %e, "Upload failed");
                    self.release(&uploaded, "upload batch failed").await;
                    return Err(e.into());
                }
            }
        }
        Ok(uploaded)
    }

    /// Best-effort release; failures are logged, not returned.
    async fn release(&self, paths: &[String], reason: &str) {
        let Some(bucket) = R::SCHEMA.bucket else {
            return;
        };
        if paths.is_empty() {
            return;
        }
        match self.gateway.remove_objects(bucket, paths).await {
            Ok(()) => warn!(count = paths.len(), reason, "Released images"),
            Err(e) => error!(count = paths.len(), reason, error = %e, "Could not release images"),
        }
    }
}

fn check_images<R: Resource>(existing: usize, files: &[StagedImage]) -> ServiceResult<()> {
    let schema = R::SCHEMA;
    if files.is_empty() && existing == 0 {
        if schema.image_required {
            return Err(ServiceError::validation("image", "an image is required"));
        }
        return Ok(());
    }
    if !schema.owns_images() {
        return Err(ServiceError::validation("images", format!("a {} has no images", schema.label)));
    }
    if existing + files.len() > schema.max_images() {
        return Err(ServiceError::validation(
            "images",
            format!("at most {} images are allowed", schema.max_images()),
        ));
    }
    files.iter().try_for_each(StagedImage::validate)
}

fn to_record(what: &str, payload: &impl Serialize) -> ServiceResult<Record> {
    match serde_json::to_value(payload) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(_) => Err(ServiceError::validation(what, "is not a record")),
        Err(e) => Err(ServiceError::validation(what, e.to_string())),
    }
}

#[async_trait]
impl<R: Resource> ListSource<R> for ResourceService<R> {
    async fn get_all(&self) -> Loaded<R> {
        ResourceService::get_all(self).await
    }

    async fn delete(&self, id: &i64) -> Result<(), ServiceError> {
        ResourceService::delete(self, *id).await
    }
}
